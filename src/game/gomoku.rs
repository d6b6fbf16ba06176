//! Five-in-a-row on a configurable board, default 15x15.

use crate::error::Result;
use crate::game::mnk::MnkGame;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_SIZE: usize = 15;
const RENJU: usize = 5;

pub fn from_json(data: &Value) -> Result<MnkGame> {
    #[derive(Deserialize, Default)]
    struct Wire {
        rows: Option<usize>,
        cols: Option<usize>,
    }
    let wire: Wire = if data.is_null() {
        Wire::default()
    } else {
        serde_json::from_value(data.clone())?
    };
    Ok(MnkGame::new(
        "gomoku",
        wire.rows.unwrap_or(DEFAULT_SIZE),
        wire.cols.unwrap_or(DEFAULT_SIZE),
        RENJU,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;

    #[test]
    fn five_in_a_row_wins_on_default_board() {
        let game = from_json(&Value::Null).unwrap();
        let mut state = game.create_default_state();
        let mut result = None;
        for row in 0..5 {
            let action = game
                .create_action(&serde_json::json!({ "row": row, "col": 0 }))
                .unwrap();
            result = game.take_action(state.as_mut(), action.as_ref());
            if result.is_some() {
                break;
            }
            if row < 4 {
                let blocker = game
                    .create_action(&serde_json::json!({ "row": row, "col": 1 }))
                    .unwrap();
                game.take_action(state.as_mut(), blocker.as_ref());
            }
        }
        assert_eq!(result, Some(vec![1.0, 0.0]));
    }
}
