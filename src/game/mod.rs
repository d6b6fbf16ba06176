//! Game / State / Action abstraction. Concrete games are registered by
//! type tag through [`create`]; the rest of the service only ever sees the
//! trait objects, never a concrete board game.

mod gomoku;
mod mnk;
mod tic_tac_toe;

use crate::error::{Result, ServiceError};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

pub trait State: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn State>;
    fn eq_box(&self, other: &dyn State) -> bool;
    fn to_json(&self) -> Value;
}

impl Clone for Box<dyn State> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub trait Action: Send + Sync + std::fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn Action>;
    fn eq_box(&self, other: &dyn Action) -> bool;
    fn to_json(&self) -> Value;
}

impl Clone for Box<dyn Action> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn Action {
    fn eq(&self, other: &Self) -> bool {
        self.eq_box(other)
    }
}

/// Immutable once constructed: no interior mutability, so a `Game` can be
/// shared across every state and player that reference it.
pub trait Game: Send + Sync {
    fn type_tag(&self) -> &'static str;
    fn player_count(&self) -> usize;
    fn create_default_state(&self) -> Box<dyn State>;
    fn create_state(&self, data: &Value) -> Result<Box<dyn State>>;
    fn create_action(&self, data: &Value) -> Result<Box<dyn Action>>;
    fn is_valid_action(&self, state: &dyn State, action: &dyn Action) -> bool;
    fn next_player(&self, state: &dyn State) -> u8;
    /// Precondition: `is_valid_action(state, action)`. `Some(result)` marks a
    /// terminal state; `result[i]` is player `i`'s raw score.
    fn take_action(&self, state: &mut dyn State, action: &dyn Action) -> Option<Vec<f32>>;
    /// `Some(result)` if `state` is already terminal, independent of how it
    /// was reached. Lets a node seeded directly from a caller-supplied state
    /// (rather than via `take_action`) resolve to `Terminal` immediately.
    fn terminal_result(&self, state: &dyn State) -> Option<Vec<f32>>;
}

/// Central type→factory table, keyed by tag.
pub fn create(type_tag: &str, data: &Value) -> Result<Arc<dyn Game>> {
    match type_tag {
        "tic_tac_toe" => Ok(Arc::new(tic_tac_toe::from_json(data)?)),
        "gomoku" => Ok(Arc::new(gomoku::from_json(data)?)),
        other => Err(ServiceError::UnknownType(other.to_string())),
    }
}

pub use mnk::{MnkAction, MnkGame, MnkState};
