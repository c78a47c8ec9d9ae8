//! Tree search over reasoning states.
//!
//! This module provides the planning half of the engine:
//! - **Search config**: proposes next sub-questions, scores their usefulness
//!   and blends usefulness with confidence into rewards
//! - **MCTS** with UCT selection, lazy child materialisation and one-step
//!   lookahead evaluation
//! - **Scorers** for branch selection (UCT while searching, greedy when
//!   extracting the answer)
//! - **Aggregations** for `cum_reward` and `calc_q`
//!
//! # Architecture
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`SearchConfig`] | Action proposal, rewards, global termination |
//! | [`Mcts`] | Monte Carlo Tree Search with backpropagation |
//! | [`Scorer`] | Evaluates branches (UCT, Greedy) |
//! | [`Aggregation`] | Collapses reward lists into one value |
//! | [`SearchResult`] | Trajectory, tree and statistics of one search |
//!
//! # Example
//!
//! ```
//! use rap_core::model::{ModelGateway, ScriptedModel};
//! use rap_core::prompt::PromptSet;
//! use rap_core::search::{Mcts, MctsConfig, ProposalConfig, SearchConfig};
//! use rap_core::world::{WorldModel, WorldModelConfig};
//! use std::sync::Arc;
//!
//! let model = ScriptedModel::new(|prompt: &str| {
//!     if prompt.lines().last().unwrap_or("").starts_with("Answer") {
//!         vec!["2 + 2 = 4. The answer is 4.".to_string()]
//!     } else {
//!         vec![" Now we can answer the question: What is 2 + 2?".to_string()]
//!     }
//! });
//! let gateway = Arc::new(ModelGateway::new(Arc::new(model), 2).with_seed(0));
//! let prompts = Arc::new(PromptSet::default());
//!
//! let world = WorldModel::new(
//!     gateway.clone(),
//!     Arc::new(prompts.interactive.clone()),
//!     WorldModelConfig::default(),
//! );
//! let search = SearchConfig::new(gateway, prompts, ProposalConfig::default());
//!
//! let mcts = Mcts::new(world.init_state("What is 2 + 2?"), world, search, MctsConfig::default());
//! let result = futures::executor::block_on(mcts.run()).unwrap();
//! assert_eq!(result.answer(), Some("4"));
//! ```
//!
//! # Scoring Algorithms
//!
//! | Scorer | Formula | Use Case |
//! |--------|---------|----------|
//! | [`UctScorer`] | `Q + C * sqrt(ln(N)/n)` | Exploration-exploitation balance |
//! | [`GreedyScorer`] | `Q` | Extracting the best trajectory |

mod action;
mod aggregate;
mod config;
mod mcts;
mod scorer;
mod trajectory;

pub use action::{Action, ActionKind};
pub use aggregate::Aggregation;
pub use config::{ProposalConfig, SearchConfig};
pub use mcts::{Mcts, MctsConfig, MctsStats};
pub use scorer::{GreedyScorer, NodeStats, Scorer, UctScorer};
pub use trajectory::{SearchResult, Trajectory, TrajectoryStep};
