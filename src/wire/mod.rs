//! The line-delimited JSON wire protocol: one request per line, one
//! response per line, matched by an opaque, caller-chosen `id` the
//! dispatcher echoes back untouched (and omits when the caller omitted it).

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

pub fn ok(id: Option<Value>, data: Value) -> Value {
    let mut body = Map::new();
    if let Some(id) = id {
        body.insert("id".to_string(), id);
    }
    body.insert("success".to_string(), Value::Bool(true));
    body.insert("data".to_string(), data);
    Value::Object(body)
}

pub fn err(id: Option<Value>, error: &crate::error::ServiceError) -> Value {
    let mut body = Map::new();
    if let Some(id) = id {
        body.insert("id".to_string(), id);
    }
    body.insert("success".to_string(), Value::Bool(false));
    body.insert("errMsg".to_string(), Value::String(error.to_string()));
    Value::Object(body)
}

#[derive(Deserialize)]
pub struct EchoParams {
    #[serde(default)]
    pub data: Value,
    #[serde(rename = "sleepTime")]
    pub sleep_time: Option<f64>,
}

#[derive(Deserialize)]
pub struct AddGameParams {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
pub struct RemoveGameParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
}

#[derive(Deserialize)]
pub struct AddStateParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    pub data: Option<Value>,
}

#[derive(Deserialize)]
pub struct RemoveStateParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
}

#[derive(Deserialize)]
pub struct AddPlayerParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
pub struct RemovePlayerParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "playerID")]
    pub player_id: u32,
}

#[derive(Deserialize)]
pub struct AddActionGeneratorParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
pub struct RemoveActionGeneratorParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "actionGeneratorID")]
    pub action_generator_id: u32,
}

#[derive(Deserialize)]
pub struct GenerateActionsParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "actionGeneratorID")]
    pub action_generator_id: u32,
}

#[derive(Deserialize)]
pub struct TakeActionParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    pub action: Value,
}

#[derive(Deserialize)]
pub struct PlayerIdParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "playerID")]
    pub player_id: u32,
}

#[derive(Deserialize)]
pub struct GetBestActionParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "playerID")]
    pub player_id: u32,
    #[serde(rename = "maxThinkTime")]
    pub max_think_time: Option<f64>,
}

#[derive(Deserialize)]
pub struct QueryDetailsParams {
    #[serde(rename = "gameID")]
    pub game_id: u32,
    #[serde(rename = "stateID")]
    pub state_id: u32,
    #[serde(rename = "playerID")]
    pub player_id: u32,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
pub struct RunGamesParams {
    pub rounds: usize,
    #[serde(default)]
    pub parallel: bool,
    pub game: TypedSpec,
    pub players: Vec<RunGamesPlayerSpec>,
}

#[derive(Deserialize)]
pub struct TypedSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
pub struct RunGamesPlayerSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, rename = "allowBackgroundThinking")]
    pub allow_background_thinking: bool,
    #[serde(rename = "maxThinkTime")]
    pub max_think_time: Option<f64>,
}
