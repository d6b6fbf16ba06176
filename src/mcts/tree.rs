//! The Select/Expand/Rollout/Backpropagate core, shared between the
//! sequential (fresh tree per call) and parallel (shared tree, virtual
//! loss) drivers. Select only ever descends through `FullyExpanded` nodes;
//! the first node it stops at is this pass's Expand target, realized or
//! advanced by exactly one step before Rollout runs from whatever leaf that
//! step produced. A node spawned fresh this same pass is rolled out from a
//! transiently-derived state that is never stored in the arena, so a node
//! visited only once never materializes a `State`/`AgData` at all.

use crate::actiongen::{ActionGenerator, AgData};
use crate::game::{Action, Game, State};
use crate::mcts::node::{Arena, Node, NodeId, NodeStage, StageKind};
use crate::rand_engine;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const ROLLOUT_DEPTH_CAP: usize = 10_000;

pub struct Tree {
    arena: Arena,
    /// The arena node currently treated as the search root. Re-rooting on
    /// an opponent move just moves this pointer to the matching child,
    /// keeping that subtree's accumulated statistics; the nodes outside it
    /// stay in the arena unreachable but harmless, since the whole arena
    /// is dropped with the tree anyway.
    root: AtomicUsize,
    game: Arc<dyn Game>,
    generator: Box<dyn ActionGenerator>,
    rollout_generator: Box<dyn ActionGenerator>,
    player_count: usize,
    exploration_constant: f64,
    goal_matrix: Option<Vec<Vec<f64>>>,
}

/// Standard UCB1, adjusted for in-flight virtual loss: a child another
/// worker is mid-descent through is treated as if it had already lost
/// those simulations, so concurrent workers spread out across the tree
/// instead of piling onto the same leaf.
fn ucb_score(parent_visits: u64, child_visits: u64, child_working: i64, child_value: f64, c: f64) -> f64 {
    let effective_visits = child_visits as f64 + child_working.max(0) as f64;
    if effective_visits == 0.0 {
        return f64::INFINITY;
    }
    let exploitation = child_value / effective_visits;
    let exploration = c * ((parent_visits.max(1) as f64).ln() / effective_visits).sqrt();
    exploitation + exploration
}

/// Classifies a realized `(state, ag_data)` into `Terminal`/`FullyExpanded`
/// (no legal actions)/`Unexpanded` (state known, own first visit pending).
fn classify_unexpanded(
    game: &dyn Game,
    generator: &dyn ActionGenerator,
    state: Box<dyn State>,
    ag_data: Box<dyn AgData>,
    player_to_move: u8,
    terminal: Option<Vec<f32>>,
) -> NodeStage {
    match terminal {
        Some(result) => NodeStage::Terminal { result },
        None => {
            let untried = generator.enumerate(game, state.as_ref(), ag_data.as_ref());
            if untried.is_empty() {
                NodeStage::FullyExpanded { player_to_move }
            } else {
                NodeStage::Unexpanded { state, ag_data, player_to_move, untried }
            }
        }
    }
}

/// Same classification, but straight to `PartiallyExpanded`: used when a
/// node is realized on its own first visit, which counts as that visit's
/// expansion step rather than leaving an extra promotion for later.
fn classify_partially_expanded(
    game: &dyn Game,
    generator: &dyn ActionGenerator,
    state: Box<dyn State>,
    ag_data: Box<dyn AgData>,
    player_to_move: u8,
    terminal: Option<Vec<f32>>,
) -> NodeStage {
    match classify_unexpanded(game, generator, state, ag_data, player_to_move, terminal) {
        NodeStage::Unexpanded { state, ag_data, player_to_move, untried } => {
            NodeStage::PartiallyExpanded { state, ag_data, player_to_move, untried }
        }
        other => other,
    }
}

enum Leaf {
    /// The leaf node itself carries (or just realized) a stored state.
    Stored(NodeId),
    /// The leaf is a brand new `New` child; `state` was derived just for
    /// this rollout and is discarded afterward, never stored in the arena.
    Transient(Box<dyn State>),
}

impl Tree {
    pub fn new(
        game: Arc<dyn Game>,
        generator: Box<dyn ActionGenerator>,
        rollout_generator: Box<dyn ActionGenerator>,
        root_state: Box<dyn State>,
        exploration_constant: f64,
        goal_matrix: Option<Vec<Vec<f64>>>,
    ) -> Self {
        let player_count = game.player_count();
        let player_to_move = game.next_player(root_state.as_ref());
        let ag_data = generator.create_data(game.as_ref(), root_state.as_ref());
        let terminal = game.terminal_result(root_state.as_ref());
        // The root is never reached via Select, so it is realized directly
        // to PartiallyExpanded rather than sitting at Unexpanded.
        let stage = classify_partially_expanded(game.as_ref(), generator.as_ref(), root_state, ag_data, player_to_move, terminal);
        let root = Node::new_realized(None, None, stage, player_count);
        Self {
            arena: Arena::new(root),
            root: AtomicUsize::new(0),
            game,
            generator,
            rollout_generator,
            player_count,
            exploration_constant,
            goal_matrix,
        }
    }

    fn root_id(&self) -> NodeId {
        self.root.load(Ordering::Acquire)
    }

    pub fn root_visits(&self) -> u64 {
        self.arena.get(self.root_id()).visits()
    }

    /// Re-roots the search to the child reached by `action`, preserving its
    /// subtree's accumulated statistics. Returns `false` (and leaves the
    /// tree untouched) if `action` never produced a child of the current
    /// root — an opponent move this tree never considered — in which case
    /// the caller should discard the tree and build a fresh one instead.
    pub fn reroot(&self, action: &dyn Action) -> bool {
        let current = self.arena.get(self.root_id());
        let Some(child_id) = current.child_for(action) else {
            return false;
        };
        // The new root may never have been independently visited. If it is
        // still `New`, realize it now, using the OLD root's state — once
        // the pointer swaps below, that state is no longer reachable.
        let child = self.arena.get(child_id);
        if child.stage_kind() == StageKind::New {
            if let Some((mut state, mut ag_data)) = current.clone_state_and_data() {
                let incoming = child.incoming.as_ref().expect("non-root child carries its incoming action").as_ref();
                self.generator.update(ag_data.as_mut(), incoming);
                let result = self.game.take_action(state.as_mut(), incoming);
                let next_player = self.game.next_player(state.as_ref());
                let stage = classify_partially_expanded(self.game.as_ref(), self.generator.as_ref(), state, ag_data, next_player, result);
                child.try_realize_new(stage);
            }
            // If the old root had already released its state, every still-
            // `New` child was swept to `Unexpanded` when that happened, so
            // `child` can't still be `New` here.
        }
        self.root.store(child_id, Ordering::Release);
        true
    }

    /// Runs one Select-Expand-Rollout pass and returns the path touched
    /// (root to the newly expanded or terminal leaf) along with the
    /// simulation's raw per-player result, for the caller to backpropagate.
    /// `virtual_loss` is added to every node on the path while selecting,
    /// for the caller to subtract again after backprop; pass 0 to disable.
    pub fn simulate_one(&self, virtual_loss: i64) -> (Vec<NodeId>, Vec<f32>) {
        let root = self.root_id();
        let mut path = vec![root];
        let mut current = root;

        let leaf = loop {
            let node = self.arena.get(current);
            match node.stage_kind() {
                StageKind::Terminal => break Leaf::Stored(current),

                StageKind::FullyExpanded => {
                    let children = node.children();
                    if children.is_empty() {
                        // No legal actions and yet not terminal: treat as a
                        // draw-like dead end rather than looping forever.
                        break Leaf::Stored(current);
                    }
                    let parent_visits = node.visits();
                    let selecting_player = node.player_to_move();
                    let scores: Vec<f64> = children
                        .iter()
                        .map(|(_, id)| {
                            let child = self.arena.get(*id);
                            ucb_score(
                                parent_visits,
                                child.visits(),
                                child.working(),
                                child.value_for(selecting_player),
                                self.exploration_constant,
                            )
                        })
                        .collect();
                    let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let best = rand_engine::reservoir_pick_indices(
                        scores.iter().enumerate().filter(|(_, &s)| s == max_score).map(|(i, _)| i),
                    )
                    .expect("node reported children but none scored");
                    if virtual_loss != 0 {
                        node.add_working(virtual_loss);
                    }
                    current = children[best].1;
                    path.push(current);
                }

                StageKind::New => {
                    let parent_id = node.parent.expect("non-root node must have a parent");
                    let parent = self.arena.get(parent_id);
                    let Some((mut state, mut ag_data)) = parent.clone_state_and_data() else {
                        // Parent already released its state; this child must
                        // have been swept to Unexpanded concurrently. Re-read.
                        continue;
                    };
                    let action = node.incoming.as_ref().expect("non-root node carries its incoming action").as_ref();
                    self.generator.update(ag_data.as_mut(), action);
                    let result = self.game.take_action(state.as_mut(), action);
                    let next_player = self.game.next_player(state.as_ref());
                    let stage = classify_partially_expanded(self.game.as_ref(), self.generator.as_ref(), state, ag_data, next_player, result);
                    if node.try_realize_new(stage) {
                        break Leaf::Stored(current);
                    }
                    // Lost the race to an eager sibling sweep; re-read.
                }

                StageKind::Unexpanded => {
                    if node.try_promote_unexpanded() {
                        break Leaf::Stored(current);
                    }
                    // Raced with another promotion; re-read.
                }

                StageKind::PartiallyExpanded => {
                    let Some((state0, ag0)) = node.clone_state_and_data() else {
                        continue;
                    };
                    let Some((action, drained)) = node.pop_untried() else {
                        continue;
                    };
                    let child = Node::new_child(current, action.clone_box(), self.player_count);
                    let child_id = self.arena.push(child);
                    node.register_child(action.clone_box(), child_id);
                    path.push(child_id);

                    if drained {
                        // This node just became FullyExpanded: every still-
                        // New child (including the one just spawned) would
                        // otherwise have no way to derive its state, since
                        // this node's own (state, ag_data) is about to be
                        // unreachable. Realize them all now.
                        for (sibling_action, sibling_id) in node.children() {
                            let sibling = self.arena.get(sibling_id);
                            if sibling.stage_kind() != StageKind::New {
                                continue;
                            }
                            let mut st = state0.clone_box();
                            let mut ag = ag0.clone_box();
                            self.generator.update(ag.as_mut(), sibling_action.as_ref());
                            let result = self.game.take_action(st.as_mut(), sibling_action.as_ref());
                            let next_player = self.game.next_player(st.as_ref());
                            let stage = classify_unexpanded(self.game.as_ref(), self.generator.as_ref(), st, ag, next_player, result);
                            sibling.force_realize_if_new(stage);
                        }
                        break Leaf::Stored(child_id);
                    }

                    let mut transient = state0;
                    let mut ag_transient = ag0;
                    self.generator.update(ag_transient.as_mut(), action.as_ref());
                    self.game.take_action(transient.as_mut(), action.as_ref());
                    break Leaf::Transient(transient);
                }
            }
        };

        let result = match leaf {
            Leaf::Stored(id) => self.rollout_stored(id),
            Leaf::Transient(state) => self.rollout_from(state),
        };
        (path, result)
    }

    pub fn backprop(&self, path: &[NodeId], result: &[f32], virtual_loss: i64) {
        let goal = self.apply_goal(result);
        for &id in path {
            let node = self.arena.get(id);
            node.backprop(&goal);
            if virtual_loss != 0 {
                node.add_working(-virtual_loss);
            }
        }
    }

    /// `goal = goalMatrix . result`, decoupling each player's backprop
    /// target from the game's raw per-player score. No matrix configured
    /// means every player optimizes its own raw result, the identity case.
    fn apply_goal(&self, result: &[f32]) -> Vec<f32> {
        match &self.goal_matrix {
            None => result.to_vec(),
            Some(matrix) => matrix
                .iter()
                .map(|row| row.iter().zip(result).map(|(&c, &r)| c as f32 * r).sum())
                .collect(),
        }
    }

    fn rollout_stored(&self, id: NodeId) -> Vec<f32> {
        let node = self.arena.get(id);
        if let Some(result) = node.terminal_result() {
            return result;
        }
        match node.clone_state_and_data() {
            Some((state, _ag_data)) => self.rollout_from(state),
            // FullyExpanded with no children: not terminal, no legal moves.
            None => vec![0.5; self.player_count],
        }
    }

    /// Rolls out from `state` using a fresh `AgData` for the rollout
    /// generator, not the expansion generator's — the two generators are
    /// not guaranteed to share a concrete `AgData` type.
    fn rollout_from(&self, mut state: Box<dyn State>) -> Vec<f32> {
        let mut ag_data = self.rollout_generator.create_data(self.game.as_ref(), state.as_ref());
        for _ in 0..ROLLOUT_DEPTH_CAP {
            let Some(action) = self.rollout_generator.sample(self.game.as_ref(), state.as_ref(), ag_data.as_ref()) else {
                break;
            };
            self.rollout_generator.update(ag_data.as_mut(), action.as_ref());
            if let Some(result) = self.game.take_action(state.as_mut(), action.as_ref()) {
                return result;
            }
        }
        vec![0.5; self.player_count]
    }

    /// The child with the most visits, the "robust child" choice: the move
    /// actually searched the most, rather than the one with the highest
    /// (noisier, for a low-visit child) average value.
    pub fn best_action(&self) -> Option<Box<dyn Action>> {
        let root = self.arena.get(self.root_id());
        let children = root.children();
        if children.is_empty() {
            return None;
        }
        let visits: Vec<u64> = children.iter().map(|(_, id)| self.arena.get(*id).visits()).collect();
        let max_visits = *visits.iter().max().expect("non-empty children");
        let best = rand_engine::reservoir_pick_indices(
            visits.iter().enumerate().filter(|(_, &v)| v == max_visits).map(|(i, _)| i),
        )?;
        Some(children[best].0.clone_box())
    }

    /// Per-action (visits, mean value from the root player's perspective),
    /// for reporting search statistics back to the caller.
    pub fn action_stats(&self) -> Vec<(Box<dyn Action>, u64, f64)> {
        let root = self.arena.get(self.root_id());
        let player = root.player_to_move();
        root.children()
            .into_iter()
            .map(|(action, id)| {
                let child = self.arena.get(id);
                let visits = child.visits();
                let value = if visits == 0 { 0.0 } else { child.value_for(player) / visits as f64 };
                (action, visits, value)
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }
}
