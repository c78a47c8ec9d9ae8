//! Arena holding every node of one search.

use super::{NodeId, TreeNode};
use crate::search::Action;
use crate::world::ReasoningState;
use serde::{Deserialize, Serialize};

/// All nodes of one search, indexed by [`NodeId`].
///
/// Nodes are only ever appended, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTree {
    nodes: Vec<TreeNode>,
}

impl SearchTree {
    /// Create a tree holding only the root.
    pub fn new(root_state: ReasoningState) -> Self {
        Self {
            nodes: vec![TreeNode::root(root_state)],
        }
    }

    /// The root node.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Get a node.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    /// Node by ID.
    ///
    /// IDs are only handed out by this tree, so lookups cannot miss.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    /// Mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    /// Record `actions` as the children of `parent`.
    ///
    /// Returns the new node IDs in proposal order.
    pub fn expand(&mut self, parent: NodeId, actions: Vec<Action>) -> Vec<NodeId> {
        let depth = self.node(parent).depth + 1;
        let mut ids = Vec::with_capacity(actions.len());
        for action in actions {
            let id = NodeId(self.nodes.len());
            self.nodes.push(TreeNode::child(id, parent, action, depth));
            ids.push(id);
        }
        self.node_mut(parent).children = Some(ids.clone());
        ids
    }

    /// Append one more child to `parent`, expanding it if needed.
    pub fn add_child(&mut self, parent: NodeId, action: Action) -> NodeId {
        let depth = self.node(parent).depth + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode::child(id, parent, action, depth));
        self.node_mut(parent).children.get_or_insert_with(Vec::new).push(id);
        id
    }

    /// Node IDs from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            path.push(parent);
            current = self.node(parent).parent;
        }
        path.reverse();
        path
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes; false once constructed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ActionKind;

    #[test]
    fn new_tree_has_materialized_root() {
        let tree = SearchTree::new(ReasoningState::new("q"));
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_materialized());
        assert!(!tree.root().is_expanded());
        assert_eq!(tree.root().id, NodeId::ROOT);
    }

    #[test]
    fn expand_creates_unmaterialized_children() {
        let mut tree = SearchTree::new(ReasoningState::new("q"));
        let ids = tree.expand(
            NodeId::ROOT,
            vec![
                Action::new("a?", ActionKind::SubQuestion),
                Action::new("b?", ActionKind::SubQuestion),
            ],
        );

        assert_eq!(ids, vec![NodeId(1), NodeId(2)]);
        assert_eq!(tree.root().children(), &ids[..]);
        let child = tree.node(ids[1]);
        assert_eq!(child.parent, Some(NodeId::ROOT));
        assert_eq!(child.depth, 1);
        assert!(!child.is_materialized());
    }

    #[test]
    fn path_runs_root_first() {
        let mut tree = SearchTree::new(ReasoningState::new("q"));
        let first = tree.expand(NodeId::ROOT, vec![Action::new("a?", ActionKind::SubQuestion)]);
        let second = tree.expand(first[0], vec![Action::new("b?", ActionKind::SubQuestion)]);

        assert_eq!(tree.path(second[0]), vec![NodeId::ROOT, first[0], second[0]]);
        assert_eq!(tree.path(NodeId::ROOT), vec![NodeId::ROOT]);
        assert!(tree.get(NodeId(9)).is_none());
    }

    #[test]
    fn add_child_appends_to_existing_children() {
        let mut tree = SearchTree::new(ReasoningState::new("q"));
        let first = tree.expand(NodeId::ROOT, vec![Action::new("a?", ActionKind::SubQuestion)]);
        let extra = tree.add_child(NodeId::ROOT, Action::new("b?", ActionKind::FinalAnswer));

        assert_eq!(tree.root().children(), &[first[0], extra]);
        assert_eq!(tree.node(extra).depth, 1);
    }

    #[test]
    fn empty_expansion_marks_expanded() {
        let mut tree = SearchTree::new(ReasoningState::new("q"));
        tree.expand(NodeId::ROOT, Vec::new());
        assert!(tree.root().is_expanded());
        assert!(tree.root().children().is_empty());
    }
}
