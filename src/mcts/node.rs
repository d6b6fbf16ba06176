//! The node lifecycle: every node is created `New`, and from there moves
//! one way down the ladder as the search touches it — `New -> Terminal` or
//! `New -> Unexpanded -> PartiallyExpanded -> FullyExpanded`. Nothing ever
//! moves back up a stage.
//!
//! Memory compactness falls straight out of this ladder: a `New` node holds
//! only the action that would produce it, not a `State` or `AgData` — most
//! nodes are visited exactly once and never need either. A node only
//! materializes its own `(State, AgData)` on its first real visit, and a
//! `PartiallyExpanded` node releases its own copy the instant its last
//! untried action spawns a child and it becomes `FullyExpanded` — at which
//! point any of its children still sitting `New` are eagerly realized into
//! `Unexpanded` first, since they can never again derive their state from a
//! parent that no longer has one.

use crate::actiongen::AgData;
use crate::game::{Action, State};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

pub type NodeId = usize;

pub enum NodeStage {
    /// Just allocated; no state has ever been derived for this node.
    New,
    /// The game ended in this state; no children are ever created.
    Terminal { result: Vec<f32> },
    /// State and legal moves are known, but this node has not yet had its
    /// own first visit as a search leaf.
    Unexpanded {
        state: Box<dyn State>,
        ag_data: Box<dyn AgData>,
        player_to_move: u8,
        untried: Vec<Box<dyn Action>>,
    },
    /// Visited at least once; some moves have children, at least one
    /// remains untried.
    PartiallyExpanded {
        state: Box<dyn State>,
        ag_data: Box<dyn AgData>,
        player_to_move: u8,
        untried: Vec<Box<dyn Action>>,
    },
    /// Every legal move has a child; selection never needs this node's own
    /// state again, so it was released when the last child was spawned.
    FullyExpanded { player_to_move: u8 },
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    New,
    Terminal,
    Unexpanded,
    PartiallyExpanded,
    FullyExpanded,
}

pub struct Node {
    pub parent: Option<NodeId>,
    /// The action that produced this node from its parent, for lookup.
    pub incoming: Option<Box<dyn Action>>,
    stage: Mutex<NodeStage>,
    /// (action, child) pairs, populated as children are expanded. Guarded
    /// by its own lock since it grows independently of `stage`.
    children: Mutex<Vec<(Box<dyn Action>, NodeId)>>,
    pub visits: AtomicU64,
    /// Virtual loss: incremented on descent, decremented on backprop, so
    /// concurrent workers diverge rather than piling onto the same path.
    pub working: AtomicI64,
    value_sum: Mutex<Vec<f64>>,
}

impl Node {
    /// A brand new child: carries only the action that would produce it.
    pub fn new_child(parent: NodeId, incoming: Box<dyn Action>, player_count: usize) -> Self {
        Self {
            parent: Some(parent),
            incoming: Some(incoming),
            stage: Mutex::new(NodeStage::New),
            children: Mutex::new(Vec::new()),
            visits: AtomicU64::new(0),
            working: AtomicI64::new(0),
            value_sum: Mutex::new(vec![0.0; player_count]),
        }
    }

    /// A node constructed with its stage already known, used for the root
    /// (always realized up front, since it is never reached via Select).
    pub fn new_realized(parent: Option<NodeId>, incoming: Option<Box<dyn Action>>, stage: NodeStage, player_count: usize) -> Self {
        Self {
            parent,
            incoming,
            stage: Mutex::new(stage),
            children: Mutex::new(Vec::new()),
            visits: AtomicU64::new(0),
            working: AtomicI64::new(0),
            value_sum: Mutex::new(vec![0.0; player_count]),
        }
    }

    pub fn visits(&self) -> u64 {
        self.visits.load(Ordering::Relaxed)
    }

    pub fn working(&self) -> i64 {
        self.working.load(Ordering::Relaxed)
    }

    pub fn add_working(&self, delta: i64) {
        self.working.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn value_for(&self, player: u8) -> f64 {
        self.value_sum.lock().expect("node lock poisoned")[player as usize]
    }

    pub fn children(&self) -> Vec<(Box<dyn Action>, NodeId)> {
        self.children
            .lock()
            .expect("node lock poisoned")
            .iter()
            .map(|(action, id)| (action.clone_box(), *id))
            .collect()
    }

    pub fn child_for(&self, action: &dyn Action) -> Option<NodeId> {
        self.children
            .lock()
            .expect("node lock poisoned")
            .iter()
            .find(|(a, _)| a.as_ref() == action)
            .map(|(_, id)| *id)
    }

    pub fn register_child(&self, action: Box<dyn Action>, child: NodeId) {
        self.children.lock().expect("node lock poisoned").push((action, child));
    }

    pub fn stage_kind(&self) -> StageKind {
        match &*self.stage.lock().expect("node lock poisoned") {
            NodeStage::New => StageKind::New,
            NodeStage::Terminal { .. } => StageKind::Terminal,
            NodeStage::Unexpanded { .. } => StageKind::Unexpanded,
            NodeStage::PartiallyExpanded { .. } => StageKind::PartiallyExpanded,
            NodeStage::FullyExpanded { .. } => StageKind::FullyExpanded,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(&*self.stage.lock().expect("node lock poisoned"), NodeStage::Terminal { .. })
    }

    pub fn terminal_result(&self) -> Option<Vec<f32>> {
        match &*self.stage.lock().expect("node lock poisoned") {
            NodeStage::Terminal { result } => Some(result.clone()),
            _ => None,
        }
    }

    /// The player about to move, for nodes that carry a realized stage.
    /// Never called on `New`/`Terminal` nodes, which Select never treats as
    /// an intermediate hop.
    pub fn player_to_move(&self) -> u8 {
        match &*self.stage.lock().expect("node lock poisoned") {
            NodeStage::Unexpanded { player_to_move, .. }
            | NodeStage::PartiallyExpanded { player_to_move, .. }
            | NodeStage::FullyExpanded { player_to_move } => *player_to_move,
            NodeStage::New | NodeStage::Terminal { .. } => {
                panic!("player_to_move queried on a node with no realized stage")
            }
        }
    }

    /// A clone of this node's own `(State, AgData)`, if it currently carries
    /// one. `None` once `FullyExpanded` has released it.
    pub fn clone_state_and_data(&self) -> Option<(Box<dyn State>, Box<dyn AgData>)> {
        match &*self.stage.lock().expect("node lock poisoned") {
            NodeStage::Unexpanded { state, ag_data, .. } | NodeStage::PartiallyExpanded { state, ag_data, .. } => {
                Some((state.clone_box(), ag_data.clone_box()))
            }
            _ => None,
        }
    }

    /// Moves a `New` node onto the ladder for the first time. Returns
    /// `false` (leaving the node untouched) if it was realized by a racing
    /// caller first, so the caller can re-read the now-current stage.
    pub fn try_realize_new(&self, stage: NodeStage) -> bool {
        let mut guard = self.stage.lock().expect("node lock poisoned");
        if matches!(*guard, NodeStage::New) {
            *guard = stage;
            true
        } else {
            false
        }
    }

    /// Eagerly realizes a still-`New` node into `Unexpanded`. A no-op if it
    /// was already realized, used when sweeping a parent's children before
    /// the parent releases its own state.
    pub fn force_realize_if_new(&self, stage: NodeStage) {
        let mut guard = self.stage.lock().expect("node lock poisoned");
        if matches!(*guard, NodeStage::New) {
            *guard = stage;
        }
    }

    /// `Unexpanded -> PartiallyExpanded`, a pure relabel since both carry
    /// the same fields. Returns `false` if the node wasn't `Unexpanded`
    /// (raced with another promotion), leaving it untouched.
    pub fn try_promote_unexpanded(&self) -> bool {
        let mut guard = self.stage.lock().expect("node lock poisoned");
        let taken = std::mem::replace(&mut *guard, NodeStage::New);
        match taken {
            NodeStage::Unexpanded { state, ag_data, player_to_move, untried } => {
                *guard = NodeStage::PartiallyExpanded { state, ag_data, player_to_move, untried };
                true
            }
            other => {
                *guard = other;
                false
            }
        }
    }

    /// Pops one untried action for the caller to spawn a child with.
    /// Returns `(action, drained)`, `drained` true if this pop emptied the
    /// untried list and moved this node to `FullyExpanded`, releasing its
    /// `(state, ag_data)` to the caller for the eager-sibling sweep.
    /// Returns `None` if the node wasn't `PartiallyExpanded` (raced).
    pub fn pop_untried(&self) -> Option<(Box<dyn Action>, bool)> {
        let mut guard = self.stage.lock().expect("node lock poisoned");
        let taken = std::mem::replace(&mut *guard, NodeStage::New);
        let (state, ag_data, player_to_move, mut untried) = match taken {
            NodeStage::PartiallyExpanded { state, ag_data, player_to_move, untried } => (state, ag_data, player_to_move, untried),
            other => {
                *guard = other;
                return None;
            }
        };
        let Some(action) = untried.pop() else {
            *guard = NodeStage::FullyExpanded { player_to_move };
            return None;
        };
        let drained = untried.is_empty();
        *guard = if drained {
            NodeStage::FullyExpanded { player_to_move }
        } else {
            NodeStage::PartiallyExpanded { state, ag_data, player_to_move, untried }
        };
        Some((action, drained))
    }

    /// Adds `result[p]` to player `p`'s running total and increments the
    /// visit count. Called once per simulation, for every node on the path
    /// from the expanded leaf back to the root.
    pub fn backprop(&self, result: &[f32]) {
        let mut sum = self.value_sum.lock().expect("node lock poisoned");
        for (total, &r) in sum.iter_mut().zip(result) {
            *total += r as f64;
        }
        drop(sum);
        self.visits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Nodes grow the tree but are never removed or moved, so reads never wait
/// on each other; only concurrent `push`es briefly contend on the write
/// lock while the `Vec` grows.
pub struct Arena {
    nodes: std::sync::RwLock<Vec<std::sync::Arc<Node>>>,
}

impl Arena {
    pub fn new(root: Node) -> Self {
        Self {
            nodes: std::sync::RwLock::new(vec![std::sync::Arc::new(root)]),
        }
    }

    pub fn get(&self, id: NodeId) -> std::sync::Arc<Node> {
        self.nodes.read().expect("arena lock poisoned")[id].clone()
    }

    pub fn push(&self, node: Node) -> NodeId {
        let mut nodes = self.nodes.write().expect("arena lock poisoned");
        nodes.push(std::sync::Arc::new(node));
        nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.read().expect("arena lock poisoned").len()
    }
}
