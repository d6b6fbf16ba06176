//! Restricts candidates to empty cells within a Chebyshev distance of any
//! occupied cell, the way a human Gomoku player only ever considers moves
//! near the existing stones. On an empty board nothing is occupied yet, so
//! only the board centre seeds the candidate set — mirroring `CreateData`
//! seeding `InRange[center]` before replaying the board's stones.
//!
//! `NeighborData` tracks every cell ever brought into range by an occupied
//! neighbor, updated incrementally as actions commit; `enumerate`/`sample`
//! filter that set against the live board so an in-range cell that has
//! since been played on is never offered back as a candidate.

use crate::actiongen::{ActionGenerator, AgData};
use crate::error::Result;
use crate::game::{Action, Game, MnkAction, MnkState, State};
use crate::rand_engine;
use serde::Deserialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashSet;

const DEFAULT_RANGE: i64 = 2;

pub struct NeighborActionGenerator {
    range: i64,
}

pub struct NeighborData {
    rows: usize,
    cols: usize,
    in_range: HashSet<(usize, usize)>,
}

impl AgData for NeighborData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn AgData> {
        Box::new(NeighborData {
            rows: self.rows,
            cols: self.cols,
            in_range: self.in_range.clone(),
        })
    }
}

fn mark_range(in_range: &mut HashSet<(usize, usize)>, rows: usize, cols: usize, row: usize, col: usize, range: i64) {
    for dr in -range..=range {
        for dc in -range..=range {
            let r = row as i64 + dr;
            let c = col as i64 + dc;
            if r < 0 || c < 0 || r as usize >= rows || c as usize >= cols {
                continue;
            }
            in_range.insert((r as usize, c as usize));
        }
    }
}

impl NeighborActionGenerator {
    pub fn from_json(data: &Value) -> Result<Self> {
        #[derive(Deserialize, Default)]
        struct Wire {
            range: Option<i64>,
        }
        let wire: Wire = if data.is_null() {
            Wire::default()
        } else {
            serde_json::from_value(data.clone())?
        };
        Ok(Self {
            range: wire.range.unwrap_or(DEFAULT_RANGE),
        })
    }

    fn downcast_data<'a>(&self, data: &'a dyn AgData) -> &'a NeighborData {
        data.as_any()
            .downcast_ref::<NeighborData>()
            .expect("neighbor action generator requires NeighborData")
    }
}

impl ActionGenerator for NeighborActionGenerator {
    fn type_tag(&self) -> &'static str {
        "neighbor"
    }

    /// Seeds the board centre, then replays every already-occupied cell so
    /// data seeded from a mid-game state (e.g. a re-rooted tree) starts with
    /// the same candidate set a cell-by-cell incremental build would reach.
    fn create_data(&self, _game: &dyn Game, state: &dyn State) -> Box<dyn AgData> {
        let state = state
            .as_any()
            .downcast_ref::<MnkState>()
            .expect("neighbor action generator requires an M-N-K state");
        let mut in_range = HashSet::new();
        in_range.insert((state.rows() / 2, state.cols() / 2));
        for row in 0..state.rows() {
            for col in 0..state.cols() {
                if state.cell(row, col) != 0 {
                    mark_range(&mut in_range, state.rows(), state.cols(), row, col, self.range);
                }
            }
        }
        Box::new(NeighborData {
            rows: state.rows(),
            cols: state.cols(),
            in_range,
        })
    }

    fn enumerate(&self, _game: &dyn Game, state: &dyn State, data: &dyn AgData) -> Vec<Box<dyn Action>> {
        let state = state
            .as_any()
            .downcast_ref::<MnkState>()
            .expect("neighbor action generator requires an M-N-K state");
        let data = self.downcast_data(data);
        data.in_range
            .iter()
            .filter(|&&(row, col)| state.cell(row, col) == 0)
            .map(|&(row, col)| Box::new(MnkAction { row, col }) as Box<dyn Action>)
            .collect()
    }

    fn sample(&self, _game: &dyn Game, state: &dyn State, data: &dyn AgData) -> Option<Box<dyn Action>> {
        let state = state
            .as_any()
            .downcast_ref::<MnkState>()
            .expect("neighbor action generator requires an M-N-K state");
        let data = self.downcast_data(data);
        rand_engine::reservoir_pick(data.in_range.iter().copied().filter(|&(row, col)| state.cell(row, col) == 0))
            .map(|(row, col)| Box::new(MnkAction { row, col }) as Box<dyn Action>)
    }

    fn update(&self, data: &mut dyn AgData, action: &dyn Action) {
        let action = action
            .as_any()
            .downcast_ref::<MnkAction>()
            .expect("neighbor action generator requires an M-N-K action");
        let data = data
            .as_any_mut()
            .downcast_mut::<NeighborData>()
            .expect("neighbor action generator requires NeighborData");
        mark_range(&mut data.in_range, data.rows, data.cols, action.row, action.col, self.range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game;

    #[test]
    fn restricts_to_cells_near_existing_stones() {
        let game = game::create("gomoku", &Value::Null).unwrap();
        let mut state = game.create_default_state();
        let action = game.create_action(&serde_json::json!({ "row": 7, "col": 7 })).unwrap();
        game.take_action(state.as_mut(), action.as_ref());

        let ag = NeighborActionGenerator::from_json(&Value::Null).unwrap();
        let data = ag.create_data(game.as_ref(), state.as_ref());
        let candidates = ag.enumerate(game.as_ref(), state.as_ref(), data.as_ref());
        assert!(candidates.len() < 225 - 1);
        assert!(!candidates.is_empty());
    }

    #[test]
    fn seeds_only_the_board_centre_on_an_empty_board() {
        let game = game::create("tic_tac_toe", &Value::Null).unwrap();
        let state = game.create_default_state();
        let ag = NeighborActionGenerator::from_json(&Value::Null).unwrap();
        let data = ag.create_data(game.as_ref(), state.as_ref());
        let candidates = ag.enumerate(game.as_ref(), state.as_ref(), data.as_ref());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].to_json(), serde_json::json!({ "row": 1, "col": 1 }));
    }

    #[test]
    fn update_folds_a_committed_action_into_the_candidate_set_without_rescanning() {
        let game = game::create("gomoku", &Value::Null).unwrap();
        let mut state = game.create_default_state();
        let ag = NeighborActionGenerator::from_json(&Value::Null).unwrap();
        let mut data = ag.create_data(game.as_ref(), state.as_ref());

        let center = game.create_action(&serde_json::json!({ "row": 7, "col": 7 })).unwrap();
        game.take_action(state.as_mut(), center.as_ref());
        ag.update(data.as_mut(), center.as_ref());

        let candidates = ag.enumerate(game.as_ref(), state.as_ref(), data.as_ref());
        assert!(candidates.iter().any(|a| a.to_json() == serde_json::json!({ "row": 6, "col": 6 })));
        assert!(!candidates.iter().any(|a| a.to_json() == serde_json::json!({ "row": 7, "col": 7 })));
    }
}
