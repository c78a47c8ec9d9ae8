//! # RAP Core
//!
//! Reasoning-via-planning engine for multi-step math word problems.
//!
//! This crate provides:
//! - **Model gateway** over remote or scripted language models, with
//!   batching, seeding and cancellation
//! - **World model** that answers sub-questions with self-consistency voting
//! - **Search config** that proposes sub-questions and blends usefulness with
//!   confidence into rewards
//! - **MCTS** over an arena tree with pluggable reward aggregation
//! - **Answer parsing** and judging for GSM8k-style answers

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod answer;
pub mod error;
pub mod model;
pub mod prompt;
pub mod search;
pub mod tree;
pub mod world;

pub use error::{RapError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::answer::{judge_answer, retrieve_answer, retrieve_answer_from_dataset};
    pub use crate::error::{RapError, Result};
    pub use crate::model::{LanguageModel, ModelBackend, ModelGateway, RemoteConfig, ScriptedModel};
    pub use crate::prompt::PromptSet;
    pub use crate::search::{Aggregation, Mcts, MctsConfig, SearchConfig, SearchResult, Trajectory};
    pub use crate::tree::{NodeId, SearchTree};
    pub use crate::world::{ReasoningState, WorldModel};
}
