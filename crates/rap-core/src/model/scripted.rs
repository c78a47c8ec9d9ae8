//! Deterministic in-process backend.

use super::{Completion, LanguageModel, SamplingParams};
use crate::error::{RapError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};

type Responder = Box<dyn Fn(&str) -> Vec<String> + Send + Sync>;
type Judge = Box<dyn Fn(&str) -> f64 + Send + Sync>;

/// A language model driven by closures.
///
/// The responder maps a prompt to candidate completions; one candidate is
/// drawn per prompt with a [`StdRng`] seeded from the per-prompt seed, or the
/// first candidate is returned when sampling is greedy. The judge maps a
/// prompt to the probability that the next token is "Yes", which is how
/// usefulness prompts are answered.
///
/// # Example
///
/// ```
/// use rap_core::model::{LanguageModel, SamplingParams, ScriptedModel};
///
/// # tokio_test_block(async {
/// let model = ScriptedModel::new(|_prompt: &str| vec![" The answer is 4.".to_string()]);
/// let out = model
///     .complete(&["2 + 2?".to_string()], &SamplingParams::default())
///     .await
///     .unwrap();
/// assert_eq!(out[0].text, " The answer is 4.");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     futures::executor::block_on(f)
/// # }
/// ```
pub struct ScriptedModel {
    responder: Responder,
    judge: Judge,
    available: AtomicBool,
    seen: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Create a model from a responder; usefulness defaults to 0.5.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            judge: Box::new(|_| 0.5),
            available: AtomicBool::new(true),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Set the "Yes" probability for usefulness prompts.
    pub fn with_judge<F>(mut self, judge: F) -> Self
    where
        F: Fn(&str) -> f64 + Send + Sync + 'static,
    {
        self.judge = Box::new(judge);
        self
    }

    /// Simulate the backend going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every prompt received so far, in order.
    pub fn prompts_seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RapError::ModelUnavailable("scripted backend offline".to_string()))
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompts: &[String], params: &SamplingParams) -> Result<Vec<Completion>> {
        self.check_available()?;
        self.seen.lock().extend(prompts.iter().cloned());

        let completions = prompts
            .iter()
            .enumerate()
            .map(|(i, prompt)| {
                let candidates = (self.responder)(prompt);
                if candidates.is_empty() {
                    return Completion::new("", 0.0);
                }
                let pick = if params.is_greedy() {
                    0
                } else {
                    let mut rng = StdRng::seed_from_u64(params.seed_for(i).unwrap_or(0));
                    rng.gen_range(0..candidates.len())
                };
                let log_prob = -(candidates.len() as f64).ln();
                Completion::new(candidates[pick].clone(), log_prob)
            })
            .collect();

        Ok(completions)
    }

    async fn next_token_log_probs(
        &self,
        prompts: &[String],
        candidates: &[String],
    ) -> Result<Vec<Vec<f64>>> {
        self.check_available()?;
        self.seen.lock().extend(prompts.iter().cloned());

        let rows = prompts
            .iter()
            .map(|prompt| {
                let yes = (self.judge)(prompt).clamp(1e-9, 1.0 - 1e-9);
                candidates
                    .iter()
                    .map(|c| match c.trim().to_ascii_lowercase().as_str() {
                        "yes" => yes.ln(),
                        "no" => (1.0 - yes).ln(),
                        _ => f64::NEG_INFINITY,
                    })
                    .collect()
            })
            .collect();

        Ok(rows)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl std::fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("available", &self.available.load(Ordering::SeqCst))
            .field("prompts_seen", &self.seen.lock().len())
            .finish()
    }
}
