//! Branch scoring for tree search.
//!
//! Provides scoring functions for picking among expanded children:
//! - UCT (Upper Confidence Bound for Trees) during selection
//! - Greedy (exploitation only) for extracting the final trajectory

use super::Aggregation;
use serde::{Deserialize, Serialize};

/// Values a node received during backpropagation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Every backpropagated value, in order.
    pub values: Vec<f64>,
    /// Best value seen at this node.
    pub best_value: Option<f64>,
}

impl NodeStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a backpropagated value.
    pub fn update(&mut self, value: f64) {
        self.values.push(value);
        self.best_value = Some(self.best_value.map_or(value, |b| b.max(value)));
    }

    /// Number of times this node was on a simulation path.
    pub fn visits(&self) -> usize {
        self.values.len()
    }

    /// Value estimate under `calc_q`.
    pub fn q(&self, calc_q: Aggregation) -> f64 {
        calc_q.apply(&self.values)
    }
}

/// Trait for branch scoring algorithms.
pub trait Scorer: Send + Sync {
    /// Score a child with value estimate `q` and `visits` visits.
    ///
    /// Higher scores indicate more promising children.
    fn score(&self, q: f64, visits: usize, parent_visits: usize) -> f64;

    /// Index of the best `(q, visits)` pair; ties go to the earliest.
    fn best(&self, children: &[(f64, usize)], parent_visits: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &(q, visits)) in children.iter().enumerate() {
            let score = self.score(q, visits, parent_visits);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// UCT scorer.
///
/// `UCT = q + C * sqrt(ln(parent_visits) / max(1, visits))`
///
/// Unvisited children score infinitely high so every child is tried once
/// before any sibling is revisited.
#[derive(Debug, Clone)]
pub struct UctScorer {
    /// Exploration constant (higher = more exploration).
    pub exploration_constant: f64,
}

impl UctScorer {
    /// Create with the default exploration constant of 1.0.
    pub fn new() -> Self {
        Self {
            exploration_constant: 1.0,
        }
    }

    /// Create with custom exploration constant.
    pub fn with_exploration(exploration_constant: f64) -> Self {
        Self { exploration_constant }
    }
}

impl Default for UctScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for UctScorer {
    fn score(&self, q: f64, visits: usize, parent_visits: usize) -> f64 {
        if visits == 0 {
            return f64::INFINITY;
        }
        let parent = (parent_visits.max(1)) as f64;
        q + self.exploration_constant * (parent.ln() / visits as f64).sqrt()
    }
}

/// Greedy scorer that only considers the value estimate.
#[derive(Debug, Clone, Default)]
pub struct GreedyScorer;

impl Scorer for GreedyScorer {
    fn score(&self, q: f64, visits: usize, _parent_visits: usize) -> f64 {
        if visits == 0 {
            f64::NEG_INFINITY
        } else {
            q
        }
    }
}
