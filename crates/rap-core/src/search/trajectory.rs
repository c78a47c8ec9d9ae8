//! Search output types.

use super::{Action, MctsStats};
use crate::tree::SearchTree;
use crate::world::ReasoningState;
use serde::{Deserialize, Serialize};

/// One step of an extracted trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// State the action was taken from.
    pub state: ReasoningState,
    /// Action taken.
    pub action: Action,
    /// Step reward.
    pub reward: f64,
}

/// Best root-to-leaf path found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Steps from the root, in order.
    pub steps: Vec<TrajectoryStep>,
    /// State reached after the last step.
    pub terminal_state: ReasoningState,
    /// `cum_reward` over the step rewards.
    pub cum_reward: f64,
}

impl Trajectory {
    /// Number of states on the path, root included.
    pub fn state_count(&self) -> usize {
        self.steps.len() + 1
    }

    /// Step rewards in order.
    pub fn rewards(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.reward).collect()
    }

    /// Numeric answer of the terminal state.
    pub fn final_answer(&self) -> Option<&str> {
        self.terminal_state.answer()
    }
}

/// Everything one search call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Extracted trajectory.
    pub trajectory: Trajectory,
    /// The full tree, for inspection.
    pub tree: SearchTree,
    /// Search statistics.
    pub stats: MctsStats,
}

impl SearchResult {
    /// Numeric answer of the extracted trajectory.
    pub fn answer(&self) -> Option<&str> {
        self.trajectory.final_answer()
    }
}
