//! # RAP
//!
//! Reasoning-via-planning agent for multi-step math word problems.
//!
//! RAP answers a question by planning over sub-questions instead of
//! generating a solution in one shot:
//! - **World model**: answers each sub-question with self-consistency voting
//! - **Search config**: proposes sub-questions and scores their usefulness
//! - **MCTS**: explores the sub-question tree under a depth budget
//! - **Experiments**: dataset evaluation with per-case logs and artifacts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rap::prelude::*;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Create agent
//!     let agent = Agent::builder()
//!         .remote(RemoteConfig::default())
//!         .prompts(PromptSet::load(Path::new("prompts/interactive_examples.json"), Path::new("prompts/useful_examples.json"))?)
//!         .build()?;
//!
//!     // Plan over sub-questions
//!     let result = agent
//!         .run("Roger has 5 tennis balls. He buys 2 more cans of 3. How many does he have now?")
//!         .await?;
//!
//!     println!("{:?}", result.answer());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Re-export core crate
pub use rap_core::*;

mod agent;
mod experiment;

pub use agent::{Agent, AgentBuilder, AgentConfig};
pub use experiment::{load_dataset, CaseRecord, Example, Experiment, ExperimentLog, ExperimentSummary};

/// Commonly used types.
pub mod prelude {
    pub use crate::agent::{Agent, AgentBuilder, AgentConfig};
    pub use crate::experiment::{load_dataset, Example, Experiment, ExperimentLog, ExperimentSummary};
    pub use crate::{
        answer::{judge_answer, retrieve_answer, retrieve_answer_from_dataset},
        error::{RapError, Result},
        model::{LanguageModel, ModelBackend, RemoteConfig, ScriptedModel},
        prompt::PromptSet,
        search::{Aggregation, SearchResult, Trajectory},
        world::ReasoningState,
    };

    // Re-export useful external types
    pub use anyhow;
    pub use tokio;
    pub use tracing;
}
