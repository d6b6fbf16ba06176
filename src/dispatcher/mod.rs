//! The request dispatcher: reads one JSON request per line, runs it,
//! and writes one JSON response per line. The reader loop is `tokio`
//! because it is pure I/O; each request's actual work (registry mutation,
//! an MCTS `get_best_action`, a batch of games) is synchronous CPU-bound
//! code run via `spawn_blocking`, so a long search never stalls the line
//! reader or other in-flight requests.

use crate::error::{Result, ServiceError};
use crate::registry::Registry;
use crate::runner;
use crate::schema::SchemaCache;
use crate::wire::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;

/// Everything a single connection's request stream needs, bundled so the
/// reader loop only has to clone one `Arc` per request.
pub struct Host {
    pub registry: Registry,
    pub schema: SchemaCache,
}

pub async fn serve<R, W>(reader: R, writer: W, host: Arc<Host>) -> anyhow::Result<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(AsyncMutex::new(writer));
    let mut lines = tokio::io::BufReader::new(reader).lines();
    let mut tasks = tokio::task::JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let host = host.clone();
        let writer = writer.clone();
        tasks.spawn(async move {
            let response = handle_line(&host, line).await;
            let mut body = serde_json::to_vec(&response).unwrap_or_else(|_| b"{}".to_vec());
            body.push(b'\n');
            let mut guard = writer.lock().await;
            let _ = guard.write_all(&body).await;
            let _ = guard.flush().await;
        });
    }
    while tasks.join_next().await.is_some() {}
    Ok(())
}

async fn handle_line(host: &Arc<Host>, line: String) -> Value {
    let envelope: Envelope = match serde_json::from_str(&line) {
        Ok(envelope) => envelope,
        Err(e) => {
            let id = serde_json::from_str::<Value>(&line)
                .ok()
                .and_then(|v| v.get("id").cloned());
            return err(id, &ServiceError::Schema(e.to_string()));
        }
    };
    let id = envelope.id.clone();
    let host = host.clone();
    match tokio::task::spawn_blocking(move || dispatch(&host, &envelope.kind, envelope.data)).await {
        Ok(Ok(data)) => ok(id, data),
        Ok(Err(e)) => err(id, &e),
        Err(join_err) => err(id, &ServiceError::Internal(anyhow::anyhow!(join_err))),
    }
}

fn think_time(seconds: Option<f64>) -> Option<Duration> {
    seconds.map(Duration::from_secs_f64)
}

/// Runs `kind` and checks the response against its loaded schema document
/// before handing it back to the caller, so a handler that drifts out of
/// sync with its own documented shape is caught here rather than shipped.
fn dispatch(host: &Host, kind: &str, data: Value) -> Result<Value> {
    let response = dispatch_inner(host, kind, data)?;
    host.schema
        .validate_response(kind, &response)
        .map_err(ServiceError::Schema)?;
    Ok(response)
}

fn dispatch_inner(host: &Host, kind: &str, data: Value) -> Result<Value> {
    let registry = &host.registry;
    match kind {
        "echo" => {
            let p: EchoParams = serde_json::from_value(data)?;
            if let Some(seconds) = p.sleep_time {
                std::thread::sleep(Duration::from_secs_f64(seconds));
            }
            Ok(p.data)
        }
        "add_game" => {
            let p: AddGameParams = serde_json::from_value(data)?;
            let id = registry.create_game(&p.type_tag, &p.data)?;
            Ok(serde_json::json!({ "gameID": id }))
        }
        "remove_game" => {
            let p: RemoveGameParams = serde_json::from_value(data)?;
            registry.delete_game(p.game_id)?;
            Ok(serde_json::json!({}))
        }
        "add_state" => {
            let p: AddStateParams = serde_json::from_value(data)?;
            let state_id = registry.create_state(p.game_id, p.data.as_ref())?;
            let (state_json, next_player) =
                registry.with_state(p.game_id, state_id, |game, entry| (entry.state().to_json(), game.next_player(entry.state())))?;
            Ok(serde_json::json!({ "stateID": state_id, "state": state_json, "nextPlayer": next_player }))
        }
        "remove_state" => {
            let p: RemoveStateParams = serde_json::from_value(data)?;
            registry.delete_state(p.game_id, p.state_id)?;
            Ok(serde_json::json!({}))
        }
        "add_player" => {
            let p: AddPlayerParams = serde_json::from_value(data)?;
            let id = registry.create_player(p.game_id, p.state_id, &p.type_tag, &p.data)?;
            Ok(serde_json::json!({ "playerID": id }))
        }
        "remove_player" => {
            let p: RemovePlayerParams = serde_json::from_value(data)?;
            registry.delete_player(p.game_id, p.state_id, p.player_id)?;
            Ok(serde_json::json!({}))
        }
        "add_action_generator" => {
            let p: AddActionGeneratorParams = serde_json::from_value(data)?;
            let id = registry.create_action_generator(p.game_id, p.state_id, &p.type_tag, &p.data)?;
            Ok(serde_json::json!({ "actionGeneratorID": id }))
        }
        "remove_action_generator" => {
            let p: RemoveActionGeneratorParams = serde_json::from_value(data)?;
            registry.delete_action_generator(p.game_id, p.state_id, p.action_generator_id)?;
            Ok(serde_json::json!({}))
        }
        "generate_actions" => {
            let p: GenerateActionsParams = serde_json::from_value(data)?;
            let actions = registry.with_action_generator(
                p.game_id,
                p.state_id,
                p.action_generator_id,
                |game, state, generator, ag_data| generator.enumerate(game, state, ag_data),
            )?;
            Ok(serde_json::json!({
                "actions": actions.into_iter().map(|a| a.to_json()).collect::<Vec<_>>(),
            }))
        }
        "take_action" => {
            let p: TakeActionParams = serde_json::from_value(data)?;
            let game = registry.game(p.game_id)?;
            let action = game.create_action(&p.action)?;
            let outcome = registry.take_action(p.game_id, p.state_id, action.as_ref())?;
            let finished = outcome.result.is_some();
            let mut body = serde_json::json!({
                "finished": finished,
                "state": outcome.state_json,
            });
            let map = body.as_object_mut().expect("constructed as object");
            if finished {
                map.insert("result".to_string(), serde_json::to_value(outcome.result).expect("vec serializes"));
            } else {
                map.insert("nextPlayer".to_string(), serde_json::json!(outcome.next_player));
            }
            Ok(body)
        }
        "start_thinking" => {
            let p: PlayerIdParams = serde_json::from_value(data)?;
            registry.with_player(p.game_id, p.state_id, p.player_id, |_, _, player| player.start_thinking())?;
            Ok(serde_json::json!({}))
        }
        "stop_thinking" => {
            let p: PlayerIdParams = serde_json::from_value(data)?;
            registry.with_player(p.game_id, p.state_id, p.player_id, |_, _, player| player.stop_thinking())?;
            Ok(serde_json::json!({}))
        }
        "get_best_action" => {
            let p: GetBestActionParams = serde_json::from_value(data)?;
            let action = registry.with_player(p.game_id, p.state_id, p.player_id, |_, _, player| {
                player.get_best_action(think_time(p.max_think_time))
            })?;
            Ok(serde_json::json!({ "action": action.map(|a| a.to_json()) }))
        }
        "query_details" => {
            let p: QueryDetailsParams = serde_json::from_value(data)?;
            registry.with_player(p.game_id, p.state_id, p.player_id, |_, _, player| player.query_details(&p.data))
        }
        "run_games" => {
            let p: RunGamesParams = serde_json::from_value(data)?;
            let specs: Vec<runner::PlayerSpec> = p
                .players
                .into_iter()
                .map(|spec| runner::PlayerSpec {
                    type_tag: spec.type_tag,
                    data: spec.data,
                    allow_background_thinking: spec.allow_background_thinking,
                    max_think_time: think_time(spec.max_think_time),
                })
                .collect();
            let report = runner::run_games(&p.game.type_tag, &p.game.data, &specs, p.rounds, p.parallel)?;
            Ok(serde_json::json!({
                "results": report.results,
                "finalResult": report.final_result,
            }))
        }
        other => Err(ServiceError::UnknownType(other.to_string())),
    }
}
