//! Search tree for reasoning-via-planning.
//!
//! This module provides:
//! - Tree nodes wrapping reasoning states, with visit statistics
//! - An arena that owns every node of one search, addressed by [`NodeId`]
//!
//! # Overview
//!
//! Parent/child links are indices into the arena, so the tree is a strict
//! hierarchy rooted at [`NodeId::ROOT`] with no shared ownership. Nodes are
//! never removed; the whole arena is dropped (or serialised into the search
//! result) when the search call ends.
//!
//! # Example
//!
//! ```rust
//! use rap_core::search::{Action, ActionKind};
//! use rap_core::tree::{NodeId, SearchTree};
//! use rap_core::world::ReasoningState;
//!
//! let mut tree = SearchTree::new(ReasoningState::new("Roger has 5 balls."));
//!
//! // Proposed actions become unmaterialised children
//! let children = tree.expand(
//!     NodeId::ROOT,
//!     vec![Action::new("How many balls did he buy?", ActionKind::SubQuestion)],
//! );
//!
//! assert!(!tree.node(children[0]).is_materialized());
//! assert_eq!(tree.path(children[0]), vec![NodeId::ROOT, children[0]]);
//! ```

mod arena;
mod node;

pub use arena::SearchTree;
pub use node::{NodeId, TreeNode};
