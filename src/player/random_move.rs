//! A uniform-random mover, grounded on the rollout policy MCTS falls back
//! to past its tree: reservoir-sample one legal action and play it. Useful
//! as a standalone opponent and as the default rollout policy.

use crate::actiongen::{self, ActionGenerator, AgData};
use crate::error::Result;
use crate::game::{Action, Game, State};
use crate::player::Player;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct RandomPlayer {
    game: Arc<dyn Game>,
    state: Mutex<Box<dyn State>>,
    generator: Box<dyn ActionGenerator>,
    ag_data: Mutex<Box<dyn AgData>>,
}

impl RandomPlayer {
    pub fn new(game: Arc<dyn Game>, state: &dyn State, data: &Value) -> Result<Self> {
        #[derive(Deserialize)]
        struct AgSpec {
            #[serde(rename = "type")]
            type_tag: String,
            #[serde(default)]
            data: Value,
        }
        #[derive(Deserialize, Default)]
        struct Wire {
            #[serde(rename = "actionGenerator")]
            action_generator: Option<AgSpec>,
        }
        let wire: Wire = if data.is_null() { Wire::default() } else { serde_json::from_value(data.clone())? };
        let generator = match wire.action_generator {
            Some(spec) => actiongen::create(&spec.type_tag, &spec.data)?,
            None => actiongen::create("default", &Value::Null)?,
        };
        let ag_data = generator.create_data(game.as_ref(), state);
        Ok(Self {
            game,
            state: Mutex::new(state.clone_box()),
            generator,
            ag_data: Mutex::new(ag_data),
        })
    }
}

impl Player for RandomPlayer {
    fn type_tag(&self) -> &'static str {
        "random_move"
    }

    fn get_best_action(&self, _max_think_time: Option<Duration>) -> Option<Box<dyn Action>> {
        let state = self.state.lock().expect("player lock poisoned");
        let data = self.ag_data.lock().expect("player lock poisoned");
        self.generator.sample(self.game.as_ref(), state.as_ref(), data.as_ref())
    }

    fn update(&self, action: &dyn Action) {
        let mut state = self.state.lock().expect("player lock poisoned");
        self.game.take_action(state.as_mut(), action);
        let mut data = self.ag_data.lock().expect("player lock poisoned");
        self.generator.update(data.as_mut(), action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game;

    #[test]
    fn always_picks_a_legal_action_until_terminal() {
        let game = game::create("tic_tac_toe", &Value::Null).unwrap();
        let start = game.create_default_state();
        let player = RandomPlayer::new(game.clone(), start.as_ref(), &Value::Null).unwrap();
        let mut state = game.create_default_state();
        for _ in 0..9 {
            let Some(action) = player.get_best_action(None) else {
                break;
            };
            assert!(game.is_valid_action(state.as_ref(), action.as_ref()));
            let finished = game.take_action(state.as_mut(), action.as_ref()).is_some();
            player.update(action.as_ref());
            if finished {
                break;
            }
        }
    }
}
