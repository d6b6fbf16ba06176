//! Shared base for M-N-K games (generalized Tic-Tac-Toe / Gomoku): a
//! `rows x cols` grid where the first player to place `renju` marks in a row
//! (any of the four directional runs through the just-played cell) wins.
//!
//! Uses a flat `Vec<u8>` board (0 = empty, else `1 + player_index`) rather
//! than one bitboard per player: Gomoku's 15x15 board does not fit in a
//! single machine word the way Tic-Tac-Toe's 3x3 does, and a generic `rows x
//! cols` size is easier to reason about as a plain array.

use crate::error::{Result, ServiceError};
use crate::game::{Action, Game, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;

const PLAYERS: usize = 2;
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

pub struct MnkGame {
    tag: &'static str,
    rows: usize,
    cols: usize,
    renju: usize,
}

impl MnkGame {
    pub fn new(tag: &'static str, rows: usize, cols: usize, renju: usize) -> Self {
        Self {
            tag,
            rows,
            cols,
            renju,
        }
    }

    fn in_bounds(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    fn run_length(&self, board: &[u8], row: usize, col: usize, dr: isize, dc: isize) -> usize {
        let mark = board[row * self.cols + col];
        let mut len = 1;
        for sign in [1isize, -1isize] {
            let (mut r, mut c) = (row as isize, col as isize);
            loop {
                r += dr * sign;
                c += dc * sign;
                if !self.in_bounds(r, c) || board[r as usize * self.cols + c as usize] != mark {
                    break;
                }
                len += 1;
            }
        }
        len
    }
}

impl Game for MnkGame {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn player_count(&self) -> usize {
        PLAYERS
    }

    fn create_default_state(&self) -> Box<dyn State> {
        Box::new(MnkState {
            rows: self.rows,
            cols: self.cols,
            board: vec![0; self.rows * self.cols],
            moves: 0,
            finished: false,
        })
    }

    fn create_state(&self, data: &Value) -> Result<Box<dyn State>> {
        #[derive(Deserialize)]
        struct Wire {
            board: Vec<Vec<u8>>,
        }
        let wire: Wire = serde_json::from_value(data.clone())?;
        if wire.board.len() != self.rows || wire.board.iter().any(|row| row.len() != self.cols) {
            return Err(ServiceError::Schema(format!(
                "expected a {}x{} board",
                self.rows, self.cols
            )));
        }
        let mut board = vec![0u8; self.rows * self.cols];
        let mut moves = 0usize;
        for (r, row) in wire.board.iter().enumerate() {
            for (c, &mark) in row.iter().enumerate() {
                if mark as usize > PLAYERS {
                    return Err(ServiceError::Schema(format!("invalid mark {mark}")));
                }
                if mark != 0 {
                    moves += 1;
                }
                board[r * self.cols + c] = mark;
            }
        }
        let finished = moves == self.rows * self.cols || self.winner(&board).is_some();
        Ok(Box::new(MnkState {
            rows: self.rows,
            cols: self.cols,
            board,
            moves,
            finished,
        }))
    }

    fn create_action(&self, data: &Value) -> Result<Box<dyn Action>> {
        #[derive(Deserialize)]
        struct Wire {
            row: usize,
            col: usize,
        }
        let wire: Wire = serde_json::from_value(data.clone())?;
        Ok(Box::new(MnkAction {
            row: wire.row,
            col: wire.col,
        }))
    }

    fn is_valid_action(&self, state: &dyn State, action: &dyn Action) -> bool {
        let state = downcast_state(state);
        let action = downcast_action(action);
        !state.finished
            && action.row < self.rows
            && action.col < self.cols
            && state.board[action.row * self.cols + action.col] == 0
    }

    fn next_player(&self, state: &dyn State) -> u8 {
        (downcast_state(state).moves % PLAYERS) as u8
    }

    fn take_action(&self, state: &mut dyn State, action: &dyn Action) -> Option<Vec<f32>> {
        let player = self.next_player(state);
        let action = downcast_action(action);
        let state = state
            .as_any_mut()
            .downcast_mut::<MnkState>()
            .expect("state must belong to an M-N-K game");
        state.board[action.row * self.cols + action.col] = player + 1;
        state.moves += 1;

        if self.run_length(&state.board, action.row, action.col, 0, 1) >= self.renju
            || self.run_length(&state.board, action.row, action.col, 1, 0) >= self.renju
            || self.run_length(&state.board, action.row, action.col, 1, 1) >= self.renju
            || self.run_length(&state.board, action.row, action.col, 1, -1) >= self.renju
        {
            state.finished = true;
            let mut result = vec![0.0; PLAYERS];
            result[player as usize] = 1.0;
            return Some(result);
        }

        if state.moves == self.rows * self.cols {
            state.finished = true;
            return Some(vec![0.5; PLAYERS]);
        }

        None
    }

    fn terminal_result(&self, state: &dyn State) -> Option<Vec<f32>> {
        let state = downcast_state(state);
        if !state.finished {
            return None;
        }
        match self.winner(&state.board) {
            Some(winner) => {
                let mut result = vec![0.0; PLAYERS];
                result[winner as usize] = 1.0;
                Some(result)
            }
            None => Some(vec![0.5; PLAYERS]),
        }
    }
}

fn downcast_state(state: &dyn State) -> &MnkState {
    state
        .as_any()
        .downcast_ref::<MnkState>()
        .expect("state must belong to an M-N-K game")
}

fn downcast_action(action: &dyn Action) -> &MnkAction {
    action
        .as_any()
        .downcast_ref::<MnkAction>()
        .expect("action must belong to an M-N-K game")
}

impl MnkGame {
    fn winner(&self, board: &[u8]) -> Option<u8> {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let mark = board[row * self.cols + col];
                if mark == 0 {
                    continue;
                }
                for (dr, dc) in DIRECTIONS {
                    if self.run_length(board, row, col, dr, dc) >= self.renju {
                        return Some(mark - 1);
                    }
                }
            }
        }
        None
    }
}

#[derive(Clone)]
pub struct MnkState {
    rows: usize,
    cols: usize,
    board: Vec<u8>,
    moves: usize,
    finished: bool,
}

impl MnkState {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.board[row * self.cols + col]
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl State for MnkState {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn State> {
        Box::new(self.clone())
    }

    fn eq_box(&self, other: &dyn State) -> bool {
        other
            .as_any()
            .downcast_ref::<MnkState>()
            .is_some_and(|o| o.board == self.board && o.finished == self.finished)
    }

    fn to_json(&self) -> Value {
        let rows: Vec<Vec<u8>> = self
            .board
            .chunks(self.cols)
            .map(|row| row.to_vec())
            .collect();
        serde_json::json!({ "board": rows })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MnkAction {
    pub row: usize,
    pub col: usize,
}

impl Action for MnkAction {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Action> {
        Box::new(self.clone())
    }

    fn eq_box(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<MnkAction>() == Some(self)
    }

    fn to_json(&self) -> Value {
        serde_json::json!({ "row": self.row, "col": self.col })
    }
}
