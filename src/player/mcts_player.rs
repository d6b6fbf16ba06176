//! The persistent MCTS player: a registrable entity wrapping a shared
//! search tree with the base player's start/stop/get-best-action/update
//! lifecycle. Parallel configurations run a real background worker pool
//! that keeps searching between calls; sequential configurations run their
//! iteration budget synchronously inside `get_best_action`. Either way,
//! `update` re-roots the tree to the matching child when the opponent's
//! move was one the tree had already considered, and rebuilds from
//! scratch otherwise.

use crate::actiongen::{self, ActionGenerator};
use crate::error::Result;
use crate::game::{Action, Game, State};
use crate::mcts::parallel::VIRTUAL_LOSS;
use crate::mcts::tree::Tree;
use crate::player::Player;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

const DEFAULT_EXPLORATION: f64 = std::f64::consts::SQRT_2;
const PARK_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Deserialize)]
struct TypedSpec {
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct ConfigWire {
    #[serde(rename = "explorationFactor")]
    exploration_factor: Option<f64>,
    #[serde(rename = "goalMatrix")]
    goal_matrix: Option<Vec<Vec<f64>>>,
    #[serde(rename = "actionGenerator")]
    action_generator: TypedSpec,
    #[serde(rename = "rolloutPlayer")]
    rollout_player: TypedSpec,
    #[serde(default)]
    parallel: bool,
    iterations: Option<u64>,
    workers: Option<u32>,
}

struct Config {
    exploration_constant: f64,
    goal_matrix: Option<Vec<Vec<f64>>>,
    ag_tag: String,
    rollout_ag_tag: String,
    parallel: bool,
    iterations: u64,
    workers: usize,
}

impl Config {
    fn from_json(data: &Value) -> Result<Self> {
        let wire: ConfigWire = serde_json::from_value(data.clone())?;
        let rollout_ag_tag = rollout_action_generator_tag(&wire.rollout_player);
        Ok(Self {
            exploration_constant: wire.exploration_factor.unwrap_or(DEFAULT_EXPLORATION),
            goal_matrix: wire.goal_matrix,
            ag_tag: wire.action_generator.type_tag,
            rollout_ag_tag,
            parallel: wire.parallel,
            iterations: wire.iterations.unwrap_or(1_000),
            workers: wire
                .workers
                .map(|w| w as usize)
                .filter(|&w| w != 0)
                .unwrap_or_else(num_cpus::get),
        })
    }
}

/// `rolloutPlayer` names a full player, most commonly `random_move`; its
/// rollout behavior reduces to whichever action generator that player uses,
/// so the tree drives rollouts directly off that generator rather than
/// constructing and re-binding a fresh `Player` on every single playout.
fn rollout_action_generator_tag(spec: &TypedSpec) -> String {
    #[derive(Deserialize, Default)]
    struct Nested {
        #[serde(rename = "actionGenerator")]
        action_generator: Option<TypedSpec>,
    }
    let nested: Nested = serde_json::from_value(spec.data.clone()).unwrap_or_default();
    nested.action_generator.map(|s| s.type_tag).unwrap_or_else(|| "default".to_string())
}

fn build_tree(game: Arc<dyn Game>, state: Box<dyn State>, config: &Config) -> Result<Tree> {
    let generator = actiongen::create(&config.ag_tag, &Value::Null)?;
    let rollout_generator = actiongen::create(&config.rollout_ag_tag, &Value::Null)?;
    Ok(Tree::new(
        game,
        generator,
        rollout_generator,
        state,
        config.exploration_constant,
        config.goal_matrix.clone(),
    ))
}

/// The pieces a background worker thread needs, held behind their own `Arc`
/// so spawning a worker never requires an `Arc<MctsPlayer>` of the player
/// itself — only `&self` is needed anywhere in the `Player` trait.
struct Shared {
    tree: RwLock<Arc<Tree>>,
    thinking: AtomicBool,
    shutdown: AtomicBool,
}

fn worker_loop(shared: Arc<Shared>) {
    while !shared.shutdown.load(Ordering::Acquire) {
        if !shared.thinking.load(Ordering::Acquire) {
            std::thread::sleep(PARK_INTERVAL);
            continue;
        }
        let tree = shared.tree.read().expect("player lock poisoned").clone();
        let (path, result) = tree.simulate_one(VIRTUAL_LOSS);
        tree.backprop(&path, &result, VIRTUAL_LOSS);
    }
}

pub struct MctsPlayer {
    game: Arc<dyn Game>,
    state: Mutex<Box<dyn State>>,
    shared: Arc<Shared>,
    config: Config,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MctsPlayer {
    pub fn new(game: Arc<dyn Game>, state: &dyn State, data: &Value) -> Result<Self> {
        let config = Config::from_json(data)?;
        let tree = build_tree(game.clone(), state.clone_box(), &config)?;
        Ok(Self {
            game,
            state: Mutex::new(state.clone_box()),
            shared: Arc::new(Shared {
                tree: RwLock::new(Arc::new(tree)),
                thinking: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
            }),
            config,
            workers: Mutex::new(Vec::new()),
        })
    }

    fn current_tree(&self) -> Arc<Tree> {
        self.shared.tree.read().expect("player lock poisoned").clone()
    }

    fn spawn_workers(&self) {
        let mut workers = self.workers.lock().expect("player lock poisoned");
        if !workers.is_empty() {
            return;
        }
        for _ in 0..self.config.workers {
            let shared = self.shared.clone();
            workers.push(std::thread::spawn(move || worker_loop(shared)));
        }
    }
}

impl Player for MctsPlayer {
    fn type_tag(&self) -> &'static str {
        "mcts"
    }

    fn start_thinking(&self) {
        if self.config.parallel {
            self.spawn_workers();
        }
        self.shared.thinking.store(true, Ordering::Release);
    }

    fn stop_thinking(&self) {
        self.shared.thinking.store(false, Ordering::Release);
    }

    fn get_best_action(&self, max_think_time: Option<Duration>) -> Option<Box<dyn Action>> {
        if self.config.parallel {
            if self.workers.lock().expect("player lock poisoned").is_empty() {
                // No background pool yet (`StartThinking` was never
                // called): run a bounded burst synchronously so a bare
                // `GetBestAction` still does real work.
                run_synchronous_burst(&self.current_tree(), max_think_time, self.config.iterations);
            } else if let Some(duration) = max_think_time {
                std::thread::sleep(duration);
            }
        } else {
            let tree = self.current_tree();
            for _ in 0..self.config.iterations {
                let (path, result) = tree.simulate_one(0);
                tree.backprop(&path, &result, 0);
            }
        }
        self.current_tree().best_action()
    }

    fn update(&self, action: &dyn Action) {
        {
            let mut state = self.state.lock().expect("player lock poisoned");
            self.game.take_action(state.as_mut(), action);
        }
        let reused = self.current_tree().reroot(action);
        if !reused {
            let state = self.state.lock().expect("player lock poisoned");
            if let Ok(fresh) = build_tree(self.game.clone(), state.clone_box(), &self.config) {
                *self.shared.tree.write().expect("player lock poisoned") = Arc::new(fresh);
            }
        }
    }

    fn query_details(&self, _data: &Value) -> Value {
        let tree = self.current_tree();
        let stats: Vec<Value> = tree
            .action_stats()
            .into_iter()
            .map(|(action, visits, score)| {
                serde_json::json!({ "action": action.to_json(), "rollouts": visits, "score": score })
            })
            .collect();
        serde_json::json!({ "totalRollouts": tree.root_visits(), "actions": stats })
    }
}

/// Runs iterations on the calling thread for up to `max_think_time` (or
/// `iterations` worth of work if no duration was given), used the one time
/// a parallel player is asked for a move before `StartThinking` ever spun
/// up its background pool.
fn run_synchronous_burst(tree: &Tree, max_think_time: Option<Duration>, iterations: u64) {
    match max_think_time {
        Some(duration) => {
            let deadline = std::time::Instant::now() + duration;
            while std::time::Instant::now() < deadline {
                let (path, result) = tree.simulate_one(0);
                tree.backprop(&path, &result, 0);
            }
        }
        None => {
            for _ in 0..iterations {
                let (path, result) = tree.simulate_one(0);
                tree.backprop(&path, &result, 0);
            }
        }
    }
}

impl Drop for MctsPlayer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.thinking.store(true, Ordering::Release);
        for handle in self.workers.lock().expect("player lock poisoned").drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game;

    #[test]
    fn sequential_player_finds_an_immediate_winning_move() {
        let game = game::create("tic_tac_toe", &Value::Null).unwrap();
        let mut state = game.create_default_state();
        for (row, col) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let action = game.create_action(&serde_json::json!({ "row": row, "col": col })).unwrap();
            game.take_action(state.as_mut(), action.as_ref());
        }
        let data = serde_json::json!({
            "parallel": false,
            "iterations": 2000,
            "explorationFactor": std::f64::consts::SQRT_2,
            "actionGenerator": { "type": "default", "data": {} },
            "rolloutPlayer": { "type": "random_move", "data": { "actionGenerator": { "type": "default", "data": {} } } },
        });
        let player = MctsPlayer::new(game, state.as_ref(), &data).unwrap();
        let chosen = player.get_best_action(None).expect("a move should be found");
        assert_eq!(chosen.to_json(), serde_json::json!({ "row": 0, "col": 2 }));
    }

    #[test]
    fn update_with_an_unrecognized_move_rebuilds_from_scratch() {
        let game = game::create("tic_tac_toe", &Value::Null).unwrap();
        let state = game.create_default_state();
        let data = serde_json::json!({
            "parallel": false,
            "iterations": 50,
            "actionGenerator": { "type": "default", "data": {} },
            "rolloutPlayer": { "type": "random_move", "data": {} },
        });
        let player = MctsPlayer::new(game, state.as_ref(), &data).unwrap();
        player.get_best_action(None);
        assert!(player.current_tree().root_visits() > 0);

        let action = serde_json::json!({ "row": 0, "col": 0 });
        player.update(
            player
                .game
                .create_action(&action)
                .unwrap()
                .as_ref(),
        );
        assert_eq!(player.current_tree().root_visits(), 0);
    }
}
