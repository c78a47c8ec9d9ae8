//! Few-shot prompt templates.
//!
//! Two JSON documents drive the search: the *interactive* template, whose
//! exemplars decompose a question into numbered sub-questions and answers,
//! and the *useful* template, whose exemplars judge whether a new
//! sub-question helps. Prefixes contain a `{}` placeholder that is replaced
//! by the 1-based step index.

mod render;

pub use render::{answer_prompt, closing_question, proposal_prompt, usefulness_prompt};

use crate::error::{RapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Template for answering and proposing sub-questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractivePrompt {
    /// Instructions followed by the few-shot exemplars.
    pub input: String,
    /// Prefix of the original question line.
    pub question_prefix: String,
    /// Prefix of each sub-question line (`{}` = step index).
    pub subquestion_prefix: String,
    /// Opening of the sub-question that asks for the final answer.
    pub overall_question_prefix: String,
    /// Prefix of each sub-answer line (`{}` = step index).
    pub answer_prefix: String,
}

impl Default for InteractivePrompt {
    fn default() -> Self {
        Self {
            input: String::new(),
            question_prefix: "Question 5: ".to_string(),
            subquestion_prefix: "Question 5.{}:".to_string(),
            overall_question_prefix: "Now we can answer the question:".to_string(),
            answer_prefix: "Answer 5.{}:".to_string(),
        }
    }
}

/// Template for judging whether a new sub-question is useful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsefulPrompt {
    /// Instructions followed by the few-shot exemplars.
    pub input: String,
    /// Prefix of the original question line.
    pub question_prefix: String,
    /// Prefix of each prior sub-question line (`{}` = step index).
    pub subquestion_prefix: String,
    /// Prefix of the candidate sub-question line (`{}` = step index).
    pub new_subquestion_prefix: String,
    /// Line asking for the Yes/No verdict.
    pub answer_prefix: String,
}

impl Default for UsefulPrompt {
    fn default() -> Self {
        Self {
            input: String::new(),
            question_prefix: "Question 1: ".to_string(),
            subquestion_prefix: "Question 1.{}:".to_string(),
            new_subquestion_prefix: "New question 1.{}:".to_string(),
            answer_prefix: "Is the new question useful?".to_string(),
        }
    }
}

/// Both templates, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    /// Decomposition template.
    pub interactive: InteractivePrompt,
    /// Usefulness template.
    pub useful: UsefulPrompt,
}

impl PromptSet {
    /// Load both templates from JSON files.
    pub fn load(interactive: &Path, useful: &Path) -> Result<Self> {
        Ok(Self {
            interactive: load_json(interactive)?,
            useful: load_json(useful)?,
        })
    }
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RapError::PromptError(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| RapError::PromptError(format!("{}: {e}", path.display())))
}

/// Replace the step placeholder in a prefix.
pub fn indexed(prefix: &str, index: usize) -> String {
    prefix.replacen("{}", &index.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn indexed_prefix() {
        assert_eq!(indexed("Question 5.{}:", 3), "Question 5.3:");
        assert_eq!(indexed("Is the new question useful?", 3), "Is the new question useful?");
    }

    #[test]
    fn partial_template_gets_defaults() {
        let prompt: InteractivePrompt =
            serde_json::from_str(r#"{"input": "Decompose the question.\n\n"}"#).unwrap();
        assert_eq!(prompt.input, "Decompose the question.\n\n");
        assert_eq!(prompt.answer_prefix, "Answer 5.{}:");
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("useful.json");
        let bad = dir.path().join("interactive.json");
        std::fs::File::create(&good)
            .unwrap()
            .write_all(br#"{"input": "Judge.\n"}"#)
            .unwrap();
        std::fs::File::create(&bad).unwrap().write_all(b"{not json").unwrap();

        let err = PromptSet::load(&bad, &good).unwrap_err();
        assert!(matches!(err, RapError::PromptError(_)));

        let missing = PromptSet::load(&dir.path().join("nope.json"), &good).unwrap_err();
        assert!(matches!(missing, RapError::PromptError(_)));
    }
}
