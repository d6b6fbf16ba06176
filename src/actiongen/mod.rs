//! Action generators: policies for proposing actions to expand or
//! roll out with, decoupled from the game rules themselves so the same
//! `Game` can be explored exhaustively or with a pruned/seeded subset.

mod default;
mod neighbor;

use crate::error::{Result, ServiceError};
use crate::game::{Action, Game, State};
use serde_json::Value;
use std::any::Any;

/// Per-state incremental data a generator maintains across a sequence of
/// committed actions, downcast by the concrete generator that produced it.
/// A generator that always recomputes from `state` carries `()`.
pub trait AgData: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn AgData>;
}

impl AgData for () {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn AgData> {
        Box::new(())
    }
}

impl Clone for Box<dyn AgData> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub trait ActionGenerator: Send + Sync {
    fn type_tag(&self) -> &'static str;

    /// Seeds this generator's incremental data from `state` as it stands
    /// (which may already have moves played on it, e.g. a tree re-rooted
    /// mid-game). Called once per node that ever needs its own data.
    fn create_data(&self, game: &dyn Game, state: &dyn State) -> Box<dyn AgData>;

    /// Every legal action from `state`. Used for full expansion of a node.
    fn enumerate(&self, game: &dyn Game, state: &dyn State, data: &dyn AgData) -> Vec<Box<dyn Action>>;

    /// One action picked uniformly at random from the legal set, via
    /// reservoir sampling so callers never materialize the full list.
    fn sample(&self, game: &dyn Game, state: &dyn State, data: &dyn AgData) -> Option<Box<dyn Action>>;

    /// Folds a committed action into `data` incrementally, so the next
    /// `enumerate`/`sample` call never has to rescan `state` from scratch.
    fn update(&self, data: &mut dyn AgData, action: &dyn Action);
}

pub fn create(type_tag: &str, data: &Value) -> Result<Box<dyn ActionGenerator>> {
    match type_tag {
        "default" => Ok(Box::new(default::DefaultActionGenerator::from_json(data)?)),
        "neighbor" => Ok(Box::new(neighbor::NeighborActionGenerator::from_json(data)?)),
        other => Err(ServiceError::UnknownType(other.to_string())),
    }
}
