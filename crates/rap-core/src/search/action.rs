//! Candidate actions (next sub-questions).

use serde::{Deserialize, Serialize};

/// What answering an action does to the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// An intermediate sub-question.
    SubQuestion,
    /// Asks for the overall answer; the resulting state is terminal.
    FinalAnswer,
}

/// A proposed next sub-question with its estimated reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Sub-question text.
    pub sub_question: String,
    /// Kind of step.
    pub kind: ActionKind,
    /// Probability that the sub-question is a useful next step.
    pub usefulness: f64,
    /// Reward estimated at proposal time with the default confidence.
    pub estimated_reward: f64,
}

impl Action {
    /// An unscored action.
    pub fn new(sub_question: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            sub_question: sub_question.into(),
            kind,
            usefulness: 0.0,
            estimated_reward: 0.0,
        }
    }

    /// Classify a sub-question by whether it opens with the overall-question prefix.
    pub fn classify(sub_question: impl Into<String>, overall_question_prefix: &str) -> Self {
        let sub_question = sub_question.into();
        let kind = if !overall_question_prefix.is_empty()
            && sub_question.trim_start().starts_with(overall_question_prefix)
        {
            ActionKind::FinalAnswer
        } else {
            ActionKind::SubQuestion
        };
        Self::new(sub_question, kind)
    }

    /// Whether this action asks for the overall answer.
    pub fn is_final(&self) -> bool {
        self.kind == ActionKind::FinalAnswer
    }
}
