//! Reward aggregation strategies.

use serde::{Deserialize, Serialize};

/// How a list of rewards collapses into one value.
///
/// Used twice by the search: `cum_reward` aggregates the per-step rewards of
/// a trajectory, `calc_q` aggregates the values a node has received. Both
/// are pure functions of the list; an empty list aggregates to 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum of rewards.
    #[default]
    Sum,
    /// Arithmetic mean.
    Mean,
    /// Largest reward.
    Max,
    /// Most recent reward.
    Last,
    /// User-supplied function.
    #[serde(skip)]
    Custom(fn(&[f64]) -> f64),
}

impl Aggregation {
    /// Aggregate `rewards`.
    pub fn apply(&self, rewards: &[f64]) -> f64 {
        if rewards.is_empty() {
            return 0.0;
        }
        match self {
            Aggregation::Sum => rewards.iter().sum(),
            Aggregation::Mean => rewards.iter().sum::<f64>() / rewards.len() as f64,
            Aggregation::Max => rewards.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Last => rewards[rewards.len() - 1],
            Aggregation::Custom(f) => f(rewards),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(xs: &[f64]) -> f64 {
        xs.iter().product()
    }

    #[test]
    fn builtin_aggregations() {
        let rewards = [0.5, 1.0, 0.0];
        assert_eq!(Aggregation::Sum.apply(&rewards), 1.5);
        assert_eq!(Aggregation::Mean.apply(&rewards), 0.5);
        assert_eq!(Aggregation::Max.apply(&rewards), 1.0);
        assert_eq!(Aggregation::Last.apply(&rewards), 0.0);
    }

    #[test]
    fn empty_list_is_zero() {
        for agg in [Aggregation::Sum, Aggregation::Mean, Aggregation::Max, Aggregation::Last] {
            assert_eq!(agg.apply(&[]), 0.0);
        }
    }

    #[test]
    fn custom_function_is_used() {
        let agg = Aggregation::Custom(product);
        assert_eq!(agg.apply(&[0.5, 0.5]), 0.25);
        assert!(format!("{agg:?}").starts_with("Custom("));
    }

    #[test]
    fn serializes_by_name() {
        assert_eq!(serde_json::to_string(&Aggregation::Mean).unwrap(), "\"mean\"");
        let agg: Aggregation = serde_json::from_str("\"sum\"").unwrap();
        assert_eq!(agg.apply(&[1.0, 2.0]), 3.0);
    }
}
