//! Reasoning states.

use crate::answer::retrieve_answer;
use serde::{Deserialize, Serialize};

/// Sub-answer recorded when no sampled completion contained a number.
pub const UNKNOWN_ANSWER: &str = "unknown";

/// One answered sub-question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStep {
    /// The sub-question asked.
    pub sub_question: String,
    /// The completion chosen by the vote, or [`UNKNOWN_ANSWER`].
    pub sub_answer: String,
    /// Numeric answer extracted from `sub_answer`.
    pub answer: Option<String>,
    /// Share of valid samples that agreed with the chosen answer, in `[0, 1]`.
    pub confidence: f64,
}

impl SubStep {
    /// A step answered by `sub_answer`.
    pub fn answered(sub_question: impl Into<String>, sub_answer: impl Into<String>, confidence: f64) -> Self {
        let sub_answer = sub_answer.into();
        Self {
            sub_question: sub_question.into(),
            answer: retrieve_answer(&sub_answer),
            sub_answer,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// A step for which no sample could be parsed.
    pub fn unknown(sub_question: impl Into<String>) -> Self {
        Self {
            sub_question: sub_question.into(),
            sub_answer: UNKNOWN_ANSWER.to_string(),
            answer: None,
            confidence: 0.0,
        }
    }
}

/// The question plus the sub-question/sub-answer steps taken so far.
///
/// States are values: a transition produces a new state with one more step
/// and never touches the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningState {
    question: String,
    steps: Vec<SubStep>,
    final_answer: bool,
}

impl ReasoningState {
    /// Root state for a question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            steps: Vec::new(),
            final_answer: false,
        }
    }

    /// The original question.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Steps taken so far.
    pub fn steps(&self) -> &[SubStep] {
        &self.steps
    }

    /// Number of steps taken.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Most recent step.
    pub fn last_step(&self) -> Option<&SubStep> {
        self.steps.last()
    }

    /// Whether the last step answered the overall question.
    pub fn is_final(&self) -> bool {
        self.final_answer
    }

    /// Numeric answer of the last step.
    pub fn answer(&self) -> Option<&str> {
        self.last_step().and_then(|s| s.answer.as_deref())
    }

    /// New state with `step` appended.
    pub fn extend(&self, step: SubStep, final_answer: bool) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push(step);
        Self {
            question: self.question.clone(),
            steps,
            final_answer,
        }
    }
}
