//! The parallel driver: one tree shared by a fixed worker pool of genuine
//! OS threads (CPU-bound playouts, not async tasks), synchronized through
//! the tree's own per-node locks/atomics plus virtual loss so workers
//! diverge across the tree instead of repeatedly searching the same path.
//! A shutdown flag stops every worker once the iteration budget is spent,
//! rather than routing a sentinel message through the work queue.
//!
//! This is the one-shot, run-to-completion form. [`crate::player`]'s MCTS
//! player runs the same `simulate_one`/`backprop` pair from persistent
//! background threads instead, so it can pause and resume across calls.

use crate::actiongen::{self, ActionGenerator};
use crate::error::Result;
use crate::game::{Game, State};
use crate::mcts::MctsConfig;
use crate::mcts::sequential::SearchReport;
use crate::mcts::tree::Tree;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub(crate) const VIRTUAL_LOSS: i64 = 3;

pub fn search(
    game: Arc<dyn Game>,
    generator: Box<dyn ActionGenerator>,
    root_state: Box<dyn State>,
    config: &MctsConfig,
) -> Result<SearchReport> {
    let rollout_generator = actiongen::create(generator.type_tag(), &Value::Null)?;
    let tree = Arc::new(Tree::new(
        game,
        generator,
        rollout_generator,
        root_state,
        config.exploration_constant,
        config.goal_matrix.clone(),
    ));
    let completed = Arc::new(AtomicU64::new(0));
    let shutdown = Arc::new(AtomicBool::new(false));
    let target = config.iterations;
    let workers = config.workers.max(1);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tree = tree.clone();
            let completed = completed.clone();
            let shutdown = shutdown.clone();
            scope.spawn(move || {
                while !shutdown.load(Ordering::Relaxed) {
                    if completed.fetch_add(1, Ordering::Relaxed) >= target {
                        shutdown.store(true, Ordering::Relaxed);
                        break;
                    }
                    let (path, result) = tree.simulate_one(VIRTUAL_LOSS);
                    tree.backprop(&path, &result, VIRTUAL_LOSS);
                }
            });
        }
    });

    Ok(SearchReport {
        best_action: tree.best_action(),
        iterations: tree.root_visits(),
        nodes: tree.node_count(),
        stats: tree.action_stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Action;
    use crate::{actiongen, game};
    use serde_json::Value;

    #[test]
    fn finds_an_immediate_winning_move() {
        let game: Arc<dyn Game> = game::create("tic_tac_toe", &Value::Null).unwrap();
        let mut state = game.create_default_state();
        // X has two in a row at (0,0),(0,1); (0,2) wins outright.
        for (row, col) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let action = game.create_action(&serde_json::json!({ "row": row, "col": col })).unwrap();
            game.take_action(state.as_mut(), action.as_ref());
        }
        let generator = actiongen::create("default", &Value::Null).unwrap();
        let config = MctsConfig {
            iterations: 2_000,
            workers: 4,
            exploration_constant: std::f64::consts::SQRT_2,
            goal_matrix: None,
        };
        let report = search(game, generator, state, &config).unwrap();
        let chosen = report.best_action.expect("a move should be found");
        assert_eq!(chosen.to_json(), serde_json::json!({ "row": 0, "col": 2 }));
    }
}
