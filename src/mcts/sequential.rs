//! The sequential driver: builds a fresh tree rooted at the given state for
//! every call and runs a fixed iteration budget on the calling thread. No
//! state survives between calls, so callers get the same answer (up to the
//! rollout RNG) regardless of what ran before.

use crate::actiongen::{self, ActionGenerator};
use crate::error::Result;
use crate::game::{Action, Game, State};
use crate::mcts::MctsConfig;
use crate::mcts::tree::Tree;
use serde_json::Value;
use std::sync::Arc;

pub struct SearchReport {
    pub best_action: Option<Box<dyn Action>>,
    pub iterations: u64,
    pub nodes: usize,
    pub stats: Vec<(Box<dyn Action>, u64, f64)>,
}

pub fn search(
    game: Arc<dyn Game>,
    generator: Box<dyn ActionGenerator>,
    root_state: Box<dyn State>,
    config: &MctsConfig,
) -> Result<SearchReport> {
    let rollout_generator = actiongen::create(generator.type_tag(), &Value::Null)?;
    let tree = Tree::new(
        game,
        generator,
        rollout_generator,
        root_state,
        config.exploration_constant,
        config.goal_matrix.clone(),
    );
    for _ in 0..config.iterations {
        let (path, result) = tree.simulate_one(0);
        tree.backprop(&path, &result, 0);
    }
    Ok(SearchReport {
        best_action: tree.best_action(),
        iterations: tree.root_visits(),
        nodes: tree.node_count(),
        stats: tree.action_stats(),
    })
}
