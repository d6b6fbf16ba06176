//! Enumerates every empty cell of an M-N-K board, in row-major order.
//! Carries no incremental data of its own; every call rescans `state`.

use crate::actiongen::{ActionGenerator, AgData};
use crate::error::Result;
use crate::game::{Action, Game, MnkAction, MnkState, State};
use crate::rand_engine;
use serde_json::Value;

pub struct DefaultActionGenerator;

impl DefaultActionGenerator {
    pub fn from_json(_data: &Value) -> Result<Self> {
        Ok(Self)
    }

    fn empty_cells<'a>(state: &'a MnkState) -> impl Iterator<Item = (usize, usize)> + 'a {
        (0..state.rows()).flat_map(move |row| {
            (0..state.cols()).filter_map(move |col| {
                if state.cell(row, col) == 0 {
                    Some((row, col))
                } else {
                    None
                }
            })
        })
    }
}

impl ActionGenerator for DefaultActionGenerator {
    fn type_tag(&self) -> &'static str {
        "default"
    }

    fn create_data(&self, _game: &dyn Game, _state: &dyn State) -> Box<dyn AgData> {
        Box::new(())
    }

    fn enumerate(&self, _game: &dyn Game, state: &dyn State, _data: &dyn AgData) -> Vec<Box<dyn Action>> {
        let state = state
            .as_any()
            .downcast_ref::<MnkState>()
            .expect("default action generator requires an M-N-K state");
        Self::empty_cells(state)
            .map(|(row, col)| Box::new(MnkAction { row, col }) as Box<dyn Action>)
            .collect()
    }

    fn sample(&self, _game: &dyn Game, state: &dyn State, _data: &dyn AgData) -> Option<Box<dyn Action>> {
        let state = state
            .as_any()
            .downcast_ref::<MnkState>()
            .expect("default action generator requires an M-N-K state");
        rand_engine::reservoir_pick(Self::empty_cells(state))
            .map(|(row, col)| Box::new(MnkAction { row, col }) as Box<dyn Action>)
    }

    fn update(&self, _data: &mut dyn AgData, _action: &dyn Action) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game;

    #[test]
    fn enumerates_every_empty_cell_on_a_fresh_board() {
        let game = game::create("tic_tac_toe", &Value::Null).unwrap();
        let state = game.create_default_state();
        let ag = DefaultActionGenerator::from_json(&Value::Null).unwrap();
        let data = ag.create_data(game.as_ref(), state.as_ref());
        assert_eq!(ag.enumerate(game.as_ref(), state.as_ref(), data.as_ref()).len(), 9);
    }
}
