//! Tree node representation.

use crate::search::{Action, Aggregation, NodeStats};
use crate::world::ReasoningState;
use serde::{Deserialize, Serialize};

/// Index of a node in a [`SearchTree`](super::SearchTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Root node ID.
    pub const ROOT: NodeId = NodeId(0);

    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the search tree.
///
/// Nodes are created from a proposed action before its transition has been
/// sampled. Such a node is *unmaterialised*: it has no state yet and only
/// the action's estimated reward. Materialising runs the world model and
/// fills in `state`, `reward` and `confidence` exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node identifier.
    pub id: NodeId,
    /// Parent node (None for root).
    pub parent: Option<NodeId>,
    /// Action that led here (None for root).
    pub action: Option<Action>,
    /// State after the action, once materialised.
    pub state: Option<ReasoningState>,
    /// Children, once the node has been expanded.
    pub children: Option<Vec<NodeId>>,
    /// Number of steps from the root.
    pub depth: usize,
    /// Step reward, once materialised.
    pub reward: f64,
    /// Self-consistency confidence of the step, once materialised.
    pub confidence: Option<f64>,
    /// Backpropagated values.
    pub stats: NodeStats,
    /// Whether no further step may be taken from this node.
    pub is_terminal: bool,
}

impl TreeNode {
    /// Create the root node.
    pub fn root(state: ReasoningState) -> Self {
        Self {
            id: NodeId::ROOT,
            parent: None,
            action: None,
            state: Some(state),
            children: None,
            depth: 0,
            reward: 0.0,
            confidence: None,
            stats: NodeStats::new(),
            is_terminal: false,
        }
    }

    /// Create an unmaterialised child node.
    pub fn child(id: NodeId, parent: NodeId, action: Action, depth: usize) -> Self {
        Self {
            id,
            parent: Some(parent),
            action: Some(action),
            state: None,
            children: None,
            depth,
            reward: 0.0,
            confidence: None,
            stats: NodeStats::new(),
            is_terminal: false,
        }
    }

    /// Whether the transition into this node has been sampled.
    pub fn is_materialized(&self) -> bool {
        self.state.is_some()
    }

    /// Whether actions have been proposed from this node.
    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// Children, empty if not expanded.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Number of backpropagated values.
    pub fn visits(&self) -> usize {
        self.stats.visits()
    }

    /// Value estimate under `calc_q`.
    pub fn q(&self, calc_q: Aggregation) -> f64 {
        self.stats.q(calc_q)
    }

    /// Reward estimated when the action was proposed.
    pub fn estimated_reward(&self) -> f64 {
        self.action.as_ref().map_or(0.0, |a| a.estimated_reward)
    }
}
