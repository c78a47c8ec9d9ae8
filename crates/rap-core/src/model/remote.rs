//! OpenAI-compatible remote inference backend.

use super::{Completion, LanguageModel, RemoteConfig, SamplingParams};
use crate::error::{RapError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Log-probability given to a candidate missing from the top-k list.
const MISSING_LOG_PROB: f64 = -100.0;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logprobs: Option<usize>,
}

fn no_stop_sequences(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
    #[serde(default)]
    logprobs: Option<LogProbs>,
}

#[derive(Debug, Default, Deserialize)]
struct LogProbs {
    #[serde(default)]
    token_logprobs: Vec<Option<f64>>,
    #[serde(default)]
    top_logprobs: Vec<Option<HashMap<String, f64>>>,
}

/// Client for an OpenAI-compatible `/completions` endpoint (vLLM, llama.cpp
/// server, LM Studio, ...).
///
/// Prompts of a batch are sent as concurrent single-prompt requests, each
/// with its own seed, so identical prompts still yield independent samples.
pub struct RemoteModel {
    config: RemoteConfig,
    client: Client,
    api_key: Option<String>,
}

impl RemoteModel {
    /// Create a client.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RapError::InvalidConfig(format!("http client: {e}")))?;

        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                RapError::InvalidConfig(format!("environment variable {var} is not set"))
            })?),
            None => None,
        };

        Ok(Self {
            config,
            client,
            api_key,
        })
    }

    /// Backend configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn request(&self, body: &CompletionRequest<'_>) -> Result<Choice> {
        let url = format!("{}/completions", self.config.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                    RapError::ModelUnavailable(format!("{url} returned {status}"))
                }
                _ => RapError::ModelError(format!("{url} returned {status}: {text}")),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| RapError::ModelError(format!("invalid completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RapError::ModelError("completion response had no choices".to_string()))
    }
}

fn classify(url: &str, e: reqwest::Error) -> RapError {
    if e.is_connect() || e.is_timeout() {
        RapError::ModelUnavailable(format!("{url}: {e}"))
    } else {
        RapError::ModelError(format!("{url}: {e}"))
    }
}

/// Look up a candidate token in a top-k map, tolerating leading spaces.
fn candidate_log_prob(top: &HashMap<String, f64>, candidate: &str) -> f64 {
    let wanted = candidate.trim();
    top.iter()
        .filter(|(token, _)| token.trim() == wanted)
        .map(|(_, &lp)| lp)
        .fold(None, |best: Option<f64>, lp| Some(best.map_or(lp, |b| b.max(lp))))
        .unwrap_or(MISSING_LOG_PROB)
}

#[async_trait]
impl LanguageModel for RemoteModel {
    async fn complete(&self, prompts: &[String], params: &SamplingParams) -> Result<Vec<Completion>> {
        let requests = prompts.iter().enumerate().map(|(i, prompt)| async move {
            let body = CompletionRequest {
                model: &self.config.model,
                prompt,
                max_tokens: params.max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                stop: &params.stop,
                seed: params.seed_for(i),
                logprobs: Some(0),
            };
            let choice = self.request(&body).await?;
            let log_prob = choice
                .logprobs
                .map(|lp| lp.token_logprobs.into_iter().flatten().sum())
                .unwrap_or(0.0);
            Ok::<_, RapError>(Completion::new(choice.text, log_prob))
        });

        try_join_all(requests).await
    }

    async fn next_token_log_probs(
        &self,
        prompts: &[String],
        candidates: &[String],
    ) -> Result<Vec<Vec<f64>>> {
        let no_stop: Vec<String> = Vec::new();
        let requests = prompts.iter().map(|prompt| {
            let no_stop = &no_stop;
            async move {
                let body = CompletionRequest {
                    model: &self.config.model,
                    prompt,
                    max_tokens: 1,
                    temperature: 0.0,
                    top_p: None,
                    stop: no_stop,
                    seed: None,
                    logprobs: Some(self.config.top_logprobs),
                };
                let choice = self.request(&body).await?;
                let top = choice
                    .logprobs
                    .and_then(|lp| lp.top_logprobs.into_iter().next().flatten())
                    .unwrap_or_default();
                if top.is_empty() {
                    warn!(model = %self.config.model, "backend returned no top log-probabilities");
                }
                Ok::<_, RapError>(
                    candidates
                        .iter()
                        .map(|c| candidate_log_prob(&top, c))
                        .collect::<Vec<f64>>(),
                )
            }
        });

        try_join_all(requests).await
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for RemoteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteModel")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}
