//! World model: turns a reasoning state and a sub-question into the next state.
//!
//! The transition answers the sub-question by sampling the language model
//! several times and voting over the numeric answers (self-consistency). The
//! share of votes won by the majority answer is the step's confidence, which
//! the search config later blends into the step reward.
//!
//! # Sampling schedule
//!
//! Samples are drawn in rounds of `early_stop_base`. After each round the
//! vote may end sampling early when the leading answer already holds at
//! least `early_stop_threshold` of the draws and is not tied; otherwise
//! rounds continue until `n_confidence` samples were drawn.

mod state;
mod vote;

pub use state::{ReasoningState, SubStep, UNKNOWN_ANSWER};
pub use vote::{Verdict, VoteTally};

use crate::answer::retrieve_answer;
use crate::error::Result;
use crate::model::{ModelGateway, SamplingParams};
use crate::prompt::{answer_prompt, InteractivePrompt};
use crate::search::Action;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Configuration for the world model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldModelConfig {
    /// Maximum samples per transition.
    pub n_confidence: usize,
    /// Samples per round between early-stop checks.
    pub early_stop_base: usize,
    /// Leader share that ends sampling early.
    pub early_stop_threshold: f64,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// Token limit per answer.
    pub max_tokens: usize,
}

impl Default for WorldModelConfig {
    fn default() -> Self {
        Self {
            n_confidence: 8,
            early_stop_base: 2,
            early_stop_threshold: 0.5,
            temperature: 0.8,
            max_tokens: 256,
        }
    }
}

/// Outcome of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The extended state.
    pub state: ReasoningState,
    /// Self-consistency confidence of the new step, in `[0, 1]`.
    pub confidence: f64,
    /// Completions drawn (parsed or not).
    pub samples: usize,
}

/// Answers sub-questions with self-consistency voting.
#[derive(Debug, Clone)]
pub struct WorldModel {
    gateway: Arc<ModelGateway>,
    prompt: Arc<InteractivePrompt>,
    config: WorldModelConfig,
}

impl WorldModel {
    /// Create a world model.
    pub fn new(gateway: Arc<ModelGateway>, prompt: Arc<InteractivePrompt>, config: WorldModelConfig) -> Self {
        Self {
            gateway,
            prompt,
            config,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &WorldModelConfig {
        &self.config
    }

    /// Gateway used for sampling.
    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Root state for a question.
    pub fn init_state(&self, question: &str) -> ReasoningState {
        ReasoningState::new(question)
    }

    /// Answer `action`'s sub-question from `state`.
    ///
    /// Unparseable samples are discarded from the vote. When none parse, the
    /// step is recorded as [`UNKNOWN_ANSWER`] with confidence 0 rather than
    /// failing. Gateway errors propagate.
    pub async fn step(&self, state: &ReasoningState, action: &Action) -> Result<Transition> {
        let prompt = answer_prompt(&self.prompt, state, &action.sub_question);
        let params = SamplingParams::line(self.config.temperature, self.config.max_tokens);
        let n_confidence = self.config.n_confidence.max(1);
        let round_size = self.config.early_stop_base.max(1);

        let mut tally = VoteTally::new();
        let mut sampled = 0;

        while sampled < n_confidence {
            let round = round_size.min(n_confidence - sampled);
            let prompts = vec![prompt.clone(); round];
            let completions = self.gateway.complete(&prompts, &params).await?;
            sampled += round;

            for completion in completions {
                let text = completion.text.trim();
                if let Some(answer) = retrieve_answer(text) {
                    tally.add(answer, text.to_string());
                }
            }

            if tally.is_decisive(sampled, self.config.early_stop_threshold) {
                break;
            }
        }

        let step = match tally.leader() {
            Some(verdict) => SubStep {
                sub_question: action.sub_question.clone(),
                sub_answer: verdict.completion.to_string(),
                answer: Some(verdict.answer.to_string()),
                confidence: verdict.confidence,
            },
            None => SubStep::unknown(action.sub_question.clone()),
        };
        let confidence = step.confidence;

        debug!(
            depth = state.depth() + 1,
            sampled,
            valid = tally.valid(),
            distinct = tally.distinct(),
            confidence,
            answer = step.answer.as_deref().unwrap_or(UNKNOWN_ANSWER),
            final_answer = action.is_final(),
            "transition"
        );

        Ok(Transition {
            state: state.extend(step, action.is_final()),
            confidence,
            samples: sampled,
        })
    }

    /// Whether the state answered the overall question.
    pub fn is_terminal(&self, state: &ReasoningState) -> bool {
        state.is_final()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptedModel;
    use crate::search::ActionKind;

    fn world(model: ScriptedModel, config: WorldModelConfig) -> (Arc<ScriptedModel>, WorldModel) {
        let model = Arc::new(model);
        let gateway = Arc::new(ModelGateway::new(model.clone(), 2).with_seed(0));
        let world = WorldModel::new(gateway, Arc::new(InteractivePrompt::default()), config);
        (model, world)
    }

    fn ask(question: &str) -> Action {
        Action::new(question, ActionKind::SubQuestion)
    }

    #[tokio::test]
    async fn unanimous_samples_give_full_confidence() {
        let (_, world) = world(
            ScriptedModel::new(|_: &str| vec![" 2 * 3 = 6. The answer is 6.".to_string()]),
            WorldModelConfig::default(),
        );
        let root = world.init_state("Roger has 5 balls.");

        let t = world.step(&root, &ask("How many balls did he buy?")).await.unwrap();

        assert_eq!(t.confidence, 1.0);
        assert_eq!(t.state.answer(), Some("6"));
        assert_eq!(t.state.last_step().unwrap().sub_answer, "2 * 3 = 6. The answer is 6.");
        assert!(!world.is_terminal(&t.state));
    }

    #[tokio::test]
    async fn early_stop_saves_samples() {
        let (model, world) = world(
            ScriptedModel::new(|_: &str| vec!["The answer is 6.".to_string()]),
            WorldModelConfig::default(),
        );

        let t = world.step(&world.init_state("q"), &ask("sub?")).await.unwrap();

        // the first round of two already agrees
        assert_eq!(t.samples, 2);
        assert_eq!(model.prompts_seen().len(), 2);
    }

    #[tokio::test]
    async fn split_vote_draws_all_samples() {
        let (_, world) = world(
            ScriptedModel::new(|_: &str| {
                vec!["The answer is 5.".to_string(), "The answer is 6.".to_string()]
            }),
            WorldModelConfig {
                early_stop_threshold: 1.1,
                ..Default::default()
            },
        );

        let t = world.step(&world.init_state("q"), &ask("sub?")).await.unwrap();

        assert_eq!(t.samples, 8);
        assert!(t.confidence >= 0.5 && t.confidence <= 1.0);
    }

    #[tokio::test]
    async fn unparseable_samples_yield_unknown() {
        let (_, world) = world(
            ScriptedModel::new(|_: &str| vec!["I cannot tell.".to_string()]),
            WorldModelConfig::default(),
        );

        let t = world.step(&world.init_state("q"), &ask("sub?")).await.unwrap();

        assert_eq!(t.confidence, 0.0);
        assert_eq!(t.samples, 8);
        let step = t.state.last_step().unwrap();
        assert_eq!(step.sub_answer, UNKNOWN_ANSWER);
        assert_eq!(step.answer, None);
    }

    #[tokio::test]
    async fn single_sample_is_all_or_nothing() {
        let config = WorldModelConfig {
            n_confidence: 1,
            ..Default::default()
        };
        let (_, world) = world(
            ScriptedModel::new(|_: &str| {
                vec!["The answer is 1.".to_string(), "The answer is 2.".to_string(), "no idea".to_string()]
            }),
            config,
        );

        for i in 0..10 {
            let question = format!("q{i}");
            let t = world.step(&world.init_state(&question), &ask("sub?")).await.unwrap();
            assert!(t.confidence == 0.0 || t.confidence == 1.0);
            assert_eq!(t.samples, 1);
        }
    }

    #[tokio::test]
    async fn final_answer_action_terminates() {
        let (_, world) = world(
            ScriptedModel::new(|_: &str| vec!["5 + 6 = 11. The answer is 11.".to_string()]),
            WorldModelConfig::default(),
        );
        let action = Action::new("Now we can answer the question: How many now?", ActionKind::FinalAnswer);

        let t = world.step(&world.init_state("q"), &action).await.unwrap();

        assert!(world.is_terminal(&t.state));
        assert_eq!(t.state.answer(), Some("11"));
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let (model, world) = world(
            ScriptedModel::new(|_: &str| vec!["The answer is 1.".to_string()]),
            WorldModelConfig::default(),
        );
        model.set_available(false);

        let err = world.step(&world.init_state("q"), &ask("sub?")).await.unwrap_err();

        assert!(err.is_fatal());
    }
}
