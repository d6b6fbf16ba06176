//! Monte Carlo Tree Search: a node arena shared by both the
//! sequential driver (fresh tree per call) and the parallel worker-pool
//! driver (shared tree, virtual loss). [`crate::player`]'s MCTS player
//! wraps a persistent [`tree::Tree`] with the start/stop/update lifecycle;
//! the standalone `sequential`/`parallel` search functions here are the
//! one-shot building block it (and the benchmarks) drive.

pub mod node;
pub mod parallel;
pub mod sequential;
pub mod tree;

pub use sequential::SearchReport;

const DEFAULT_ITERATIONS: u64 = 1_000;
const DEFAULT_EXPLORATION: f64 = std::f64::consts::SQRT_2;

#[derive(Clone, Debug)]
pub struct MctsConfig {
    pub iterations: u64,
    pub workers: usize,
    pub exploration_constant: f64,
    pub goal_matrix: Option<Vec<Vec<f64>>>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            workers: 1,
            exploration_constant: DEFAULT_EXPLORATION,
            goal_matrix: None,
        }
    }
}
