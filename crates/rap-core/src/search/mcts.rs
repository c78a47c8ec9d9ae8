//! Monte Carlo Tree Search over reasoning states.
//!
//! # Algorithm
//!
//! Each simulation consists of four phases:
//! 1. **Selection**: from the root, take an untried child (highest estimated
//!    reward first) or else the child with the best UCT score, until reaching
//!    a node that is unexpanded, unmaterialised or terminal
//! 2. **Expansion**: materialise the leaf through the world model, then ask
//!    the search config for its actions (one child per action)
//! 3. **Evaluation**: the path's step rewards, plus a one-step lookahead
//!    `calc_q` over the new children's estimated rewards when the leaf is not
//!    terminal
//! 4. **Backpropagation**: every node on the path receives `cum_reward` of
//!    the rewards from itself downwards
//!
//! Children are materialised lazily, one per simulation, so an iteration
//! costs at most one transition and one proposal round.
//!
//! # Example
//!
//! ```ignore
//! let mcts = Mcts::new(world.init_state(question), world, search, MctsConfig::default());
//! let result = mcts.run().await?;
//! println!("{:?}", result.answer());
//! ```

use super::{
    Aggregation, GreedyScorer, Scorer, SearchConfig, SearchResult, Trajectory, TrajectoryStep,
    UctScorer,
};
use crate::error::Result;
use crate::tree::{NodeId, SearchTree};
use crate::world::{ReasoningState, WorldModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for MCTS.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MctsConfig {
    /// Number of simulations per search.
    pub n_iters: usize,
    /// Exploration constant for UCT.
    pub exploration_constant: f64,
    /// Aggregates a path's step rewards into a value.
    pub cum_reward: Aggregation,
    /// Aggregates a node's received values into its Q estimate.
    pub calc_q: Aggregation,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            n_iters: 20,
            exploration_constant: 1.0,
            cum_reward: Aggregation::Sum,
            calc_q: Aggregation::Mean,
        }
    }
}

/// Statistics about one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MctsStats {
    /// Simulations performed.
    pub simulations: usize,
    /// Nodes created, root excluded.
    pub nodes_created: usize,
    /// World model transitions sampled.
    pub transitions: usize,
    /// Deepest materialised node.
    pub max_depth_reached: usize,
    /// Simulations that ended on a terminal node.
    pub terminal_hits: usize,
    /// Best value backpropagated to the root.
    pub best_value: f64,
    /// Language model calls made during the search.
    pub lm_calls: usize,
}

/// Monte Carlo Tree Search for one question.
///
/// An instance owns its tree and is consumed by [`Mcts::run`]; nothing is
/// shared between questions.
pub struct Mcts {
    world: WorldModel,
    search: SearchConfig,
    config: MctsConfig,
    scorer: Box<dyn Scorer>,
    tree: SearchTree,
    stats: MctsStats,
}

impl Mcts {
    /// Create a search rooted at `root_state`.
    pub fn new(root_state: ReasoningState, world: WorldModel, search: SearchConfig, config: MctsConfig) -> Self {
        let scorer = Box::new(UctScorer::with_exploration(config.exploration_constant));
        Self::with_scorer(root_state, world, search, config, scorer)
    }

    /// Create with custom selection scorer.
    pub fn with_scorer(
        root_state: ReasoningState,
        world: WorldModel,
        search: SearchConfig,
        config: MctsConfig,
        scorer: Box<dyn Scorer>,
    ) -> Self {
        let root_terminal = search.is_terminal(&root_state);
        let mut tree = SearchTree::new(root_state);
        tree.node_mut(NodeId::ROOT).is_terminal = root_terminal;

        Self {
            world,
            search,
            config,
            scorer,
            tree,
            stats: MctsStats {
                best_value: f64::NEG_INFINITY,
                ..Default::default()
            },
        }
    }

    /// The search tree.
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// Search statistics so far.
    pub fn stats(&self) -> &MctsStats {
        &self.stats
    }

    /// Run all simulations and extract the best trajectory.
    ///
    /// Any gateway error aborts the search.
    pub async fn run(mut self) -> Result<SearchResult> {
        let calls_before = self.world.gateway().lm_calls();

        for _ in 0..self.config.n_iters {
            self.simulate().await?;
        }

        let mut path = self.best_path();
        if path.len() == 1 {
            path = self.force_final_answer().await?;
        }
        let trajectory = self.trajectory(&path);

        self.stats.lm_calls = self.world.gateway().lm_calls() - calls_before;
        if self.stats.best_value == f64::NEG_INFINITY {
            self.stats.best_value = 0.0;
        }

        info!(
            simulations = self.stats.simulations,
            nodes = self.tree.len(),
            transitions = self.stats.transitions,
            lm_calls = self.stats.lm_calls,
            depth = trajectory.steps.len(),
            cum_reward = trajectory.cum_reward,
            answer = trajectory.final_answer().unwrap_or("none"),
            "search complete"
        );

        Ok(SearchResult {
            trajectory,
            tree: self.tree,
            stats: self.stats,
        })
    }

    /// Run one selection-expansion-evaluation-backpropagation cycle.
    pub async fn simulate(&mut self) -> Result<()> {
        let path = self.select();
        let leaf = path[path.len() - 1];

        if !self.tree.node(leaf).is_materialized() {
            self.materialize(leaf).await?;
        }
        let node = self.tree.node(leaf);
        if node.is_terminal {
            self.stats.terminal_hits += 1;
        } else if !node.is_expanded() {
            self.expand(leaf).await?;
        }

        let value = self.backpropagate(&path);
        self.stats.simulations += 1;

        debug!(
            simulation = self.stats.simulations,
            depth = path.len() - 1,
            leaf = leaf.index(),
            value,
            "simulation"
        );
        Ok(())
    }

    /// Walk from the root to the node the next simulation works on.
    ///
    /// Returns the path, root first.
    pub fn select(&self) -> Vec<NodeId> {
        let mut path = vec![NodeId::ROOT];
        let mut current = NodeId::ROOT;

        loop {
            let node = self.tree.node(current);
            if !node.is_materialized() || node.is_terminal || node.children().is_empty() {
                return path;
            }
            current = self.select_child(current);
            path.push(current);
        }
    }

    fn select_child(&self, id: NodeId) -> NodeId {
        let node = self.tree.node(id);
        let children = node.children();

        let mut untried: Option<(NodeId, f64)> = None;
        for &child in children {
            let child_node = self.tree.node(child);
            if child_node.is_materialized() {
                continue;
            }
            let estimate = child_node.estimated_reward();
            if untried.map_or(true, |(_, best)| estimate > best) {
                untried = Some((child, estimate));
            }
        }
        if let Some((child, _)) = untried {
            return child;
        }

        let scored: Vec<(f64, usize)> = children
            .iter()
            .map(|&c| {
                let n = self.tree.node(c);
                (n.q(self.config.calc_q), n.visits())
            })
            .collect();
        let best = self.scorer.best(&scored, node.visits()).unwrap_or(0);
        children[best]
    }

    /// Sample the transition into `id` and record its reward.
    async fn materialize(&mut self, id: NodeId) -> Result<()> {
        let node = self.tree.node(id);
        let parent_state = node.parent.and_then(|p| self.tree.node(p).state.clone());
        let (Some(parent_state), Some(action)) = (parent_state, node.action.clone()) else {
            return Ok(());
        };

        let transition = self.world.step(&parent_state, &action).await?;
        let reward = self.search.reward(&action, Some(transition.confidence));
        let is_terminal = self.search.is_terminal(&transition.state);

        let node = self.tree.node_mut(id);
        node.reward = reward;
        node.confidence = Some(transition.confidence);
        node.is_terminal = is_terminal;
        node.state = Some(transition.state);

        self.stats.transitions += 1;
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(node.depth);
        Ok(())
    }

    /// Propose actions from a materialised node and add them as children.
    async fn expand(&mut self, id: NodeId) -> Result<()> {
        let Some(state) = self.tree.node(id).state.clone() else {
            return Ok(());
        };
        let actions = self.search.propose_actions(&state).await?;
        let children = self.tree.expand(id, actions);
        self.stats.nodes_created += children.len();
        Ok(())
    }

    /// Push the evaluated rewards of `path` into its nodes' statistics.
    ///
    /// Returns the value given to the root.
    fn backpropagate(&mut self, path: &[NodeId]) -> f64 {
        let mut rewards: Vec<f64> = path[1..].iter().map(|&id| self.tree.node(id).reward).collect();

        let leaf = self.tree.node(path[path.len() - 1]);
        if !leaf.is_terminal && !leaf.children().is_empty() {
            let lookahead: Vec<f64> = leaf
                .children()
                .iter()
                .map(|&c| self.tree.node(c).estimated_reward())
                .collect();
            rewards.push(self.config.calc_q.apply(&lookahead));
        }

        let cum_reward = self.config.cum_reward;
        let root_value = cum_reward.apply(&rewards);
        for (k, &id) in path.iter().enumerate() {
            let value = if k == 0 {
                root_value
            } else {
                cum_reward.apply(&rewards[k - 1..])
            };
            self.tree.node_mut(id).stats.update(value);
        }

        self.stats.best_value = self.stats.best_value.max(root_value);
        root_value
    }

    /// Greedy root-to-leaf path over materialised children.
    ///
    /// Picks the highest Q at every level, ties to the child created first.
    pub fn best_path(&self) -> Vec<NodeId> {
        let mut path = vec![NodeId::ROOT];
        let mut current = NodeId::ROOT;

        loop {
            let node = self.tree.node(current);
            let explored: Vec<NodeId> = node
                .children()
                .iter()
                .copied()
                .filter(|&c| self.tree.node(c).is_materialized())
                .collect();
            let scored: Vec<(f64, usize)> = explored
                .iter()
                .map(|&c| {
                    let n = self.tree.node(c);
                    (n.q(self.config.calc_q), n.visits())
                })
                .collect();

            match GreedyScorer.best(&scored, node.visits()) {
                Some(best) => {
                    current = explored[best];
                    path.push(current);
                }
                None => return path,
            }
        }
    }

    /// Take the final-answer action straight from the root.
    async fn force_final_answer(&mut self) -> Result<Vec<NodeId>> {
        let root_state = self.tree.root().state.clone().unwrap_or_else(|| ReasoningState::new(""));
        let action = self.search.final_answer_action(&root_state).await?;
        debug!(action = %action.sub_question, "no explored children, forcing final answer");

        let child = self.tree.add_child(NodeId::ROOT, action);
        self.stats.nodes_created += 1;
        self.materialize(child).await?;

        let path = vec![NodeId::ROOT, child];
        self.backpropagate(&path);
        Ok(path)
    }

    fn trajectory(&self, path: &[NodeId]) -> Trajectory {
        let steps: Vec<TrajectoryStep> = path
            .windows(2)
            .filter_map(|pair| {
                let parent = self.tree.node(pair[0]);
                let child = self.tree.node(pair[1]);
                Some(TrajectoryStep {
                    state: parent.state.clone()?,
                    action: child.action.clone()?,
                    reward: child.reward,
                })
            })
            .collect();

        let last = self.tree.node(path[path.len() - 1]);
        let terminal_state = last
            .state
            .clone()
            .or_else(|| self.tree.root().state.clone())
            .unwrap_or_else(|| ReasoningState::new(""));
        let rewards: Vec<f64> = steps.iter().map(|s| s.reward).collect();

        Trajectory {
            cum_reward: self.config.cum_reward.apply(&rewards),
            steps,
            terminal_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::judge_answer;
    use crate::error::RapError;
    use crate::model::{ModelGateway, ScriptedModel};
    use crate::prompt::PromptSet;
    use crate::search::ProposalConfig;
    use crate::world::WorldModelConfig;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    const QUESTION: &str = "Roger has 5 tennis balls. He buys 2 cans of 3 balls each. How many does he have now?";

    /// Answers every sub-question with `answer` and always proposes `proposals`.
    fn scripted(proposals: &'static [&'static str], answer: &'static str) -> ScriptedModel {
        ScriptedModel::new(move |prompt: &str| {
            let last = prompt.lines().last().unwrap_or("");
            if last.starts_with("Answer") {
                vec![answer.to_string()]
            } else if last.ends_with("Now we can answer the question:") {
                vec![" How many does he have now?".to_string()]
            } else {
                proposals.iter().map(|p| p.to_string()).collect()
            }
        })
    }

    fn mcts(model: Arc<ScriptedModel>, config: MctsConfig) -> Mcts {
        mcts_with_gateway(Arc::new(ModelGateway::new(model, 2).with_seed(7)), config)
    }

    fn mcts_with_gateway(gateway: Arc<ModelGateway>, config: MctsConfig) -> Mcts {
        let prompts = Arc::new(PromptSet::default());
        let world = WorldModel::new(
            gateway.clone(),
            Arc::new(prompts.interactive.clone()),
            WorldModelConfig::default(),
        );
        let search = SearchConfig::new(gateway, prompts, ProposalConfig::default());
        Mcts::new(world.init_state(QUESTION), world, search, config)
    }

    #[tokio::test]
    async fn chain_search_reaches_final_answer() {
        let model = Arc::new(scripted(&[" How many balls are in the cans?"], "The answer is 11."));

        let result = mcts(model, MctsConfig::default()).run().await.unwrap();

        assert_eq!(result.answer(), Some("11"));
        assert!(judge_answer(result.answer(), Some("11")));
        assert!(result.trajectory.terminal_state.is_final());
        assert_eq!(result.trajectory.state_count(), 6);
        assert_eq!(result.stats.simulations, 20);
        assert_eq!(result.stats.max_depth_reached, 5);
        assert!(result.stats.terminal_hits > 0);
        assert!(result.stats.lm_calls > 0);
    }

    #[tokio::test]
    async fn root_receives_every_simulation() {
        let model = Arc::new(scripted(&[" a?", " b?", " c?"], "The answer is 2."));

        let result = mcts(model, MctsConfig::default()).run().await.unwrap();

        let root = result.tree.root();
        assert_eq!(root.visits(), result.stats.simulations);
        for child in root.children() {
            assert!(result.tree.node(*child).visits() <= root.visits());
        }
    }

    #[tokio::test]
    async fn untried_children_are_explored_before_revisits() {
        let model = Arc::new(scripted(&[" a?", " b?"], "The answer is 2.").with_judge(|_| 0.5));
        let mut search = mcts(
            model,
            MctsConfig {
                n_iters: 3,
                ..Default::default()
            },
        );

        for _ in 0..3 {
            search.simulate().await.unwrap();
        }

        // one expansion plus one materialisation per root child
        let tree = search.tree();
        assert!(tree.root().children().iter().all(|&c| tree.node(c).is_materialized()));
    }

    #[tokio::test]
    async fn backpropagation_uses_suffix_rewards() {
        let model = Arc::new(scripted(&[" a?"], "The answer is 2."));
        let mut search = mcts(
            model,
            MctsConfig {
                n_iters: 3,
                cum_reward: Aggregation::Sum,
                calc_q: Aggregation::Mean,
                ..Default::default()
            },
        );
        for _ in 0..3 {
            search.simulate().await.unwrap();
        }

        let tree = search.tree();
        let first = tree.root().children()[0];
        let second = tree.node(first).children()[0];
        let lookahead = tree.node(second).children()[0];
        let last_value = tree.node(first).reward + tree.node(second).reward + tree.node(lookahead).estimated_reward();

        assert_eq!(tree.root().stats.values.last().copied(), Some(last_value));
        assert_eq!(tree.node(first).stats.values.last().copied(), Some(last_value));
        let expected_second = tree.node(second).reward + tree.node(lookahead).estimated_reward();
        assert!((tree.node(second).stats.values[0] - expected_second).abs() < 1e-12);
    }

    #[tokio::test]
    async fn no_simulations_forces_final_answer() {
        let model = Arc::new(scripted(&[" a?"], "The answer is 11."));

        let result = mcts(
            model,
            MctsConfig {
                n_iters: 0,
                ..Default::default()
            },
        )
        .run()
        .await
        .unwrap();

        assert_eq!(result.trajectory.steps.len(), 1);
        assert!(result.trajectory.steps[0].action.is_final());
        assert_eq!(result.answer(), Some("11"));
    }

    #[tokio::test]
    async fn unavailable_model_aborts_search() {
        let model = Arc::new(scripted(&[" a?"], "The answer is 1."));
        model.set_available(false);

        let err = mcts(model, MctsConfig::default()).run().await.err().unwrap();

        assert!(matches!(err, RapError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn cancelled_search_stops_at_next_call() {
        let model = Arc::new(scripted(&[" a?"], "The answer is 1."));
        let token = CancellationToken::new();
        let gateway = Arc::new(ModelGateway::new(model, 2).with_cancellation(token.clone()));
        token.cancel();

        let err = mcts_with_gateway(gateway, MctsConfig::default()).run().await.err().unwrap();

        assert!(matches!(err, RapError::Cancelled));
    }
}
