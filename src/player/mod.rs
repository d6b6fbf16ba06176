//! Players: the unified policy interface used both by the runner (to
//! complete a game move by move) and by the registry (as a long-lived,
//! addressable entity a caller can query repeatedly against the same
//! state). A player is bound to one `Game` and observes one `State`,
//! kept in sync by `update` as moves commit.
//!
//! The lifecycle every player honors: `start_thinking -> (zero or more
//! get_best_action / update pairs) -> stop_thinking`. Only the MCTS
//! player gives `start_thinking`/`stop_thinking` real meaning (spinning
//! up or pausing a background worker pool); a random mover has nothing
//! to pause, so it takes the default no-op.

mod mcts_player;
mod random_move;

use crate::error::{Result, ServiceError};
use crate::game::{Action, Game, State};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub trait Player: Send + Sync {
    fn type_tag(&self) -> &'static str;

    /// Begins any background work this player does between calls.
    /// Default: nothing to start.
    fn start_thinking(&self) {}

    /// Pauses background work started by `start_thinking`. Default:
    /// nothing to stop.
    fn stop_thinking(&self) {}

    /// The player's current choice for its bound state. `max_think_time`,
    /// when given, bounds how long the caller is willing to wait; it does
    /// not stop any background thinking already underway.
    fn get_best_action(&self, max_think_time: Option<Duration>) -> Option<Box<dyn Action>>;

    /// Called after an action commits, on every player bound to that
    /// state, so each can advance its own mirrored state/search tree.
    fn update(&self, action: &dyn Action);

    /// Implementation-defined introspection; an MCTS player reports
    /// rollout statistics here. Default: nothing to report.
    fn query_details(&self, _data: &Value) -> Value {
        serde_json::json!({})
    }
}

/// Constructs a player bound to `game` and observing `state` as it stands
/// right now. `state` is cloned into the player's own mirror; the
/// registry's copy and the player's copy diverge only if the registry's
/// state changes without a matching `update` call, which the dispatcher
/// never lets happen.
pub fn create(game: Arc<dyn Game>, state: &dyn State, type_tag: &str, data: &Value) -> Result<Box<dyn Player>> {
    match type_tag {
        "random_move" => Ok(Box::new(random_move::RandomPlayer::new(game, state, data)?)),
        "mcts" => Ok(Box::new(mcts_player::MctsPlayer::new(game, state, data)?)),
        other => Err(ServiceError::UnknownType(other.to_string())),
    }
}
