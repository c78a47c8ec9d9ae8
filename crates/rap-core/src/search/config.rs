//! Search config: action proposal, rewards and global termination.

use super::{Action, ActionKind};
use crate::error::Result;
use crate::model::{softmax, ModelGateway, SamplingParams};
use crate::prompt::{closing_question, proposal_prompt, usefulness_prompt, PromptSet};
use crate::world::ReasoningState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tokens whose next-token probabilities define usefulness.
const VERDICT_TOKENS: [&str; 2] = ["Yes", "No"];

/// Configuration for action proposal and rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalConfig {
    /// Sub-questions sampled per expansion.
    pub n_actions: usize,
    /// Maximum number of steps in a trace.
    pub depth_limit: usize,
    /// Only propose the final-answer action at the depth limit.
    pub force_terminating_on_depth_limit: bool,
    /// Weight of usefulness against confidence in the reward.
    pub reward_alpha: f64,
    /// Confidence assumed before a transition was sampled.
    pub reward_confidence_default: f64,
    /// Sampling temperature for sub-questions.
    pub temperature: f32,
    /// Token limit per sub-question.
    pub max_tokens: usize,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            n_actions: 4,
            depth_limit: 5,
            force_terminating_on_depth_limit: true,
            reward_alpha: 0.5,
            reward_confidence_default: 0.8,
            temperature: 0.8,
            max_tokens: 128,
        }
    }
}

/// Proposes next sub-questions and scores them.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    gateway: Arc<ModelGateway>,
    prompts: Arc<PromptSet>,
    config: ProposalConfig,
}

impl SearchConfig {
    /// Create a search config.
    pub fn new(gateway: Arc<ModelGateway>, prompts: Arc<PromptSet>, config: ProposalConfig) -> Self {
        Self {
            gateway,
            prompts,
            config,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &ProposalConfig {
        &self.config
    }

    /// Maximum number of steps in a trace.
    pub fn depth_limit(&self) -> usize {
        self.config.depth_limit
    }

    /// Whether the next step from `state` must be the final answer.
    pub fn must_finish(&self, state: &ReasoningState) -> bool {
        self.config.force_terminating_on_depth_limit && state.depth() + 1 >= self.config.depth_limit
    }

    /// Propose up to `n_actions` distinct next sub-questions for `state`.
    ///
    /// At the depth limit (with forcing on) the only proposal is the final
    /// answer action. An empty proposal set falls back to a final-answer
    /// action built from the question, so the result is never empty.
    pub async fn propose_actions(&self, state: &ReasoningState) -> Result<Vec<Action>> {
        let interactive = &self.prompts.interactive;
        let forced = self.must_finish(state);
        let (n, temperature) = if forced {
            (1, 0.0)
        } else {
            (self.config.n_actions.max(1), self.config.temperature)
        };

        let prompt = proposal_prompt(interactive, state, forced);
        let params = SamplingParams::line(temperature, self.config.max_tokens);
        let completions = self.gateway.complete(&vec![prompt; n], &params).await?;

        let mut actions: Vec<Action> = Vec::with_capacity(n);
        for completion in completions {
            let text = completion.text.trim();
            if text.is_empty() {
                continue;
            }
            let action = if forced {
                Action::new(
                    format!("{} {}", interactive.overall_question_prefix, text),
                    ActionKind::FinalAnswer,
                )
            } else {
                Action::classify(text, &interactive.overall_question_prefix)
            };
            if !actions.iter().any(|a| a.sub_question == action.sub_question) {
                actions.push(action);
            }
        }

        if actions.is_empty() {
            warn!(depth = state.depth(), "no usable proposals, forcing final answer");
            actions.push(self.fallback_action(state));
        }

        let candidates: Vec<String> = actions.iter().map(|a| a.sub_question.clone()).collect();
        let usefulness = self.usefulness(state, &candidates).await?;
        for (action, u) in actions.iter_mut().zip(usefulness) {
            action.usefulness = u;
            action.estimated_reward = self.reward(action, None);
        }

        debug!(
            depth = state.depth(),
            forced,
            proposals = actions.len(),
            "proposed actions"
        );
        Ok(actions)
    }

    /// Probability that each candidate is a useful next sub-question.
    pub async fn usefulness(&self, state: &ReasoningState, candidates: &[String]) -> Result<Vec<f64>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let prompts: Vec<String> = candidates
            .iter()
            .map(|c| usefulness_prompt(&self.prompts.useful, state, c))
            .collect();
        let tokens: Vec<String> = VERDICT_TOKENS.iter().map(|t| t.to_string()).collect();

        let rows = self.gateway.next_token_log_probs(&prompts, &tokens).await?;
        Ok(rows.iter().map(|row| softmax(row)[0]).collect())
    }

    /// Blend usefulness and confidence into a step reward.
    ///
    /// `reward_alpha * usefulness + (1 - reward_alpha) * confidence`, with
    /// `reward_confidence_default` standing in for a missing confidence.
    pub fn reward(&self, action: &Action, confidence: Option<f64>) -> f64 {
        let alpha = self.config.reward_alpha;
        let confidence = confidence.unwrap_or(self.config.reward_confidence_default);
        alpha * action.usefulness + (1.0 - alpha) * confidence
    }

    /// Whether no further step may be taken from `state`.
    pub fn is_terminal(&self, state: &ReasoningState) -> bool {
        state.is_final() || state.depth() >= self.config.depth_limit
    }

    /// Scored final-answer action for `state`.
    ///
    /// Used when the search ends without any explored child of the root.
    pub async fn final_answer_action(&self, state: &ReasoningState) -> Result<Action> {
        let mut action = self.fallback_action(state);
        let usefulness = self.usefulness(state, &[action.sub_question.clone()]).await?;
        action.usefulness = usefulness.first().copied().unwrap_or(0.0);
        action.estimated_reward = self.reward(&action, None);
        Ok(action)
    }

    /// Final-answer action asking the question's closing sentence.
    pub fn fallback_action(&self, state: &ReasoningState) -> Action {
        Action::new(
            format!(
                "{} {}",
                self.prompts.interactive.overall_question_prefix,
                closing_question(state.question())
            ),
            ActionKind::FinalAnswer,
        )
    }
}
