//! The 3x3, three-in-a-row special case of the M-N-K family.

use crate::error::Result;
use crate::game::mnk::MnkGame;
use serde_json::Value;

pub fn from_json(_data: &Value) -> Result<MnkGame> {
    Ok(MnkGame::new("tic_tac_toe", 3, 3, 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;

    #[test]
    fn three_in_a_row_wins() {
        let game = from_json(&serde_json::json!({})).unwrap();
        let mut state = game.create_default_state();
        let moves = [(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)];
        let mut result = None;
        for (row, col) in moves {
            let action = game
                .create_action(&serde_json::json!({ "row": row, "col": col }))
                .unwrap();
            result = game.take_action(state.as_mut(), action.as_ref());
        }
        assert_eq!(result, Some(vec![1.0, 0.0]));
    }

    #[test]
    fn full_board_with_no_winner_draws() {
        let game = from_json(&serde_json::json!({})).unwrap();
        let mut state = game.create_default_state();
        // X O X / X O O / O X X  -- no three in a row, board fills.
        let moves = [
            (0, 0),
            (0, 1),
            (0, 2),
            (1, 1),
            (1, 0),
            (1, 2),
            (2, 1),
            (2, 0),
            (2, 2),
        ];
        let mut result = None;
        for (row, col) in moves {
            let action = game
                .create_action(&serde_json::json!({ "row": row, "col": col }))
                .unwrap();
            result = game.take_action(state.as_mut(), action.as_ref());
        }
        assert_eq!(result, Some(vec![0.5, 0.5]));
    }
}
