//! Sampling and backend configuration.

use serde::{Deserialize, Serialize};

/// Sampling parameters for one completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature (0 = greedy).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Stop sequences.
    pub stop: Vec<String>,
    /// Base random seed; prompt `i` of a batch uses `seed + i`.
    pub seed: Option<u64>,
}

impl SamplingParams {
    /// Sample a single line at the given temperature.
    pub fn line(temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature,
            max_tokens,
            top_p: None,
            stop: vec!["\n".to_string()],
            seed: None,
        }
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed for the `index`-th prompt of a batch.
    pub fn seed_for(&self, index: usize) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(index as u64))
    }

    /// Whether sampling is greedy.
    pub fn is_greedy(&self) -> bool {
        self.temperature <= 0.0
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::line(0.8, 256)
    }
}

/// Configuration for an OpenAI-compatible inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL, e.g. `http://localhost:8000/v1`.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Environment variable holding the API key, if the service needs one.
    pub api_key_env: Option<String>,
    /// Number of top log-probabilities requested for next-token scoring.
    pub top_logprobs: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "local-model".to_string(),
            timeout_secs: 120,
            api_key_env: None,
            top_logprobs: 20,
        }
    }
}
