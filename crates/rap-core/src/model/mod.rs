//! Model gateway: the uniform interface to the language model.
//!
//! The search treats the language model as a stateless, batched function:
//! prompts go in, sampled completions (or next-token log-probabilities) come
//! out. Backends implement [`LanguageModel`]; the concrete backend is picked
//! at construction time through the [`ModelBackend`] variant or by injecting
//! any other implementation.
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | [`RemoteModel`] | OpenAI-compatible `/completions` inference service |
//! | [`ScriptedModel`] | Deterministic in-process responder for tests and demos |
//!
//! All calls from the world model and search config go through a
//! [`ModelGateway`], which enforces the batch size, derives per-call seeds,
//! counts LM calls and observes cancellation.

mod backend;
mod config;
mod gateway;
mod remote;
mod scripted;

pub use backend::ModelBackend;
pub use config::{RemoteConfig, SamplingParams};
pub use gateway::ModelGateway;
pub use remote::RemoteModel;
pub use scripted::ScriptedModel;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single sampled completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text, without the prompt.
    pub text: String,
    /// Total log-probability of the generated tokens.
    pub log_prob: f64,
}

impl Completion {
    /// Create a completion.
    pub fn new(text: impl Into<String>, log_prob: f64) -> Self {
        Self {
            text: text.into(),
            log_prob,
        }
    }
}

/// Batched access to a language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sample one completion per prompt.
    ///
    /// Prompt `i` is sampled with seed `params.seed + i` when a seed is set,
    /// so identical prompts in one batch still draw independent samples.
    async fn complete(&self, prompts: &[String], params: &SamplingParams) -> Result<Vec<Completion>>;

    /// Log-probability of each candidate token being generated next.
    ///
    /// Returns one row per prompt with one entry per candidate.
    async fn next_token_log_probs(
        &self,
        prompts: &[String],
        candidates: &[String],
    ) -> Result<Vec<Vec<f64>>>;

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

/// Softmax over log-probabilities.
pub fn softmax(log_probs: &[f64]) -> Vec<f64> {
    let max = log_probs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![1.0 / log_probs.len().max(1) as f64; log_probs.len()];
    }
    let exp: Vec<f64> = log_probs.iter().map(|&l| (l - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_normalizes() {
        let probs = softmax(&[0.0, 0.0]);
        assert_eq!(probs, vec![0.5, 0.5]);

        let probs = softmax(&[-0.1, -3.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn softmax_handles_missing_candidates() {
        let probs = softmax(&[-1.0, f64::NEG_INFINITY]);
        assert_eq!(probs, vec![1.0, 0.0]);

        let probs = softmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert_eq!(probs, vec![0.5, 0.5]);
    }
}
