//! Batch-limited, cancellable access to a language model.

use super::{Completion, LanguageModel, SamplingParams};
use crate::error::{RapError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Front door to the language model for the world model and search config.
///
/// Requests larger than `max_batch_size` are split into sequential chunks.
/// Every chunk counts as one LM call, gets its own base seed derived from the
/// gateway seed and the call counter, and is preceded by a cancellation check.
///
/// The counter belongs to one gateway value. A search runs on its own
/// [`session`](Self::session) so its seed stream does not depend on earlier
/// searches.
pub struct ModelGateway {
    model: Arc<dyn LanguageModel>,
    max_batch_size: usize,
    seed: Option<u64>,
    calls: AtomicUsize,
    cancel: CancellationToken,
}

impl ModelGateway {
    /// Create a gateway over a model.
    pub fn new(model: Arc<dyn LanguageModel>, max_batch_size: usize) -> Self {
        Self {
            model,
            max_batch_size: max_batch_size.max(1),
            seed: None,
            calls: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Derive all sampling seeds from `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Observe an external cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Gateway over the same model, seed and cancellation token with the
    /// call counter reset to zero.
    pub fn session(&self) -> Self {
        Self {
            model: self.model.clone(),
            max_batch_size: self.max_batch_size,
            seed: self.seed,
            calls: AtomicUsize::new(0),
            cancel: self.cancel.clone(),
        }
    }

    /// Maximum prompts per backend call.
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Number of backend calls made so far.
    pub fn lm_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Token that aborts the search at the next LM call.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Name of the underlying backend.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Sample one completion per prompt.
    pub async fn complete(&self, prompts: &[String], params: &SamplingParams) -> Result<Vec<Completion>> {
        let mut out = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(self.max_batch_size) {
            let call = self.begin_call()?;
            let mut chunk_params = params.clone();
            if let Some(seed) = self.seed {
                chunk_params.seed =
                    Some(seed.wrapping_add((call * self.max_batch_size) as u64));
            }

            debug!(
                model = self.model.name(),
                call,
                prompts = chunk.len(),
                temperature = chunk_params.temperature,
                "complete"
            );
            let completions = self.model.complete(chunk, &chunk_params).await?;
            if completions.len() != chunk.len() {
                return Err(RapError::ModelError(format!(
                    "expected {} completions, got {}",
                    chunk.len(),
                    completions.len()
                )));
            }
            out.extend(completions);
        }

        Ok(out)
    }

    /// Next-token log-probabilities of `candidates` for every prompt.
    pub async fn next_token_log_probs(
        &self,
        prompts: &[String],
        candidates: &[String],
    ) -> Result<Vec<Vec<f64>>> {
        let mut out = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(self.max_batch_size) {
            let call = self.begin_call()?;
            debug!(model = self.model.name(), call, prompts = chunk.len(), "score");

            let rows = self.model.next_token_log_probs(chunk, candidates).await?;
            if rows.len() != chunk.len() || rows.iter().any(|r| r.len() != candidates.len()) {
                return Err(RapError::ModelError(format!(
                    "expected {}x{} log-probabilities",
                    chunk.len(),
                    candidates.len()
                )));
            }
            out.extend(rows);
        }

        Ok(out)
    }

    fn begin_call(&self) -> Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(RapError::Cancelled);
        }
        Ok(self.calls.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("model", &self.model.name())
            .field("max_batch_size", &self.max_batch_size)
            .field("seed", &self.seed)
            .field("calls", &self.lm_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptedModel;

    fn echo_gateway(batch: usize) -> (Arc<ScriptedModel>, ModelGateway) {
        let model = Arc::new(ScriptedModel::new(|prompt: &str| vec![format!("re: {prompt}")]));
        let gateway = ModelGateway::new(model.clone(), batch).with_seed(7);
        (model, gateway)
    }

    fn prompts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{i}")).collect()
    }

    #[tokio::test]
    async fn gateway_splits_into_batches() {
        let (_, gateway) = echo_gateway(2);

        let out = gateway
            .complete(&prompts(5), &SamplingParams::default())
            .await
            .unwrap();

        assert_eq!(out.len(), 5);
        assert_eq!(out[4].text, "re: p4");
        assert_eq!(gateway.lm_calls(), 3);
    }

    #[tokio::test]
    async fn gateway_surfaces_unavailable_backend() {
        let (model, gateway) = echo_gateway(2);
        model.set_available(false);

        let err = gateway
            .complete(&prompts(1), &SamplingParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RapError::ModelUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn gateway_stops_after_cancellation() {
        let (model, gateway) = echo_gateway(4);
        gateway.cancellation_token().cancel();

        let err = gateway
            .next_token_log_probs(&prompts(2), &["Yes".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, RapError::Cancelled));
        assert!(model.prompts_seen().is_empty());
        assert_eq!(gateway.lm_calls(), 0);
    }

    #[tokio::test]
    async fn gateway_seeds_differ_between_calls() {
        let model = Arc::new(ScriptedModel::new(|_: &str| {
            (0..1000).map(|i| i.to_string()).collect()
        }));
        let gateway = ModelGateway::new(model, 1).with_seed(3);
        let params = SamplingParams::default();

        let first = gateway.complete(&prompts(1), &params).await.unwrap();
        let second = gateway.complete(&prompts(1), &params).await.unwrap();

        assert_ne!(first[0].text, second[0].text);
    }

    #[tokio::test]
    async fn session_restarts_seed_stream() {
        let model = Arc::new(ScriptedModel::new(|_: &str| {
            (0..1000).map(|i| i.to_string()).collect()
        }));
        let gateway = ModelGateway::new(model, 1).with_seed(3);
        let params = SamplingParams::default();

        let used = gateway.complete(&prompts(1), &params).await.unwrap();
        let session = gateway.session();
        let fresh = session.complete(&prompts(1), &params).await.unwrap();

        assert_eq!(used[0].text, fresh[0].text);
        assert_eq!(session.lm_calls(), 1);
        assert_eq!(gateway.lm_calls(), 1);

        gateway.cancellation_token().cancel();
        let err = session.complete(&prompts(1), &params).await.unwrap_err();
        assert!(matches!(err, RapError::Cancelled));
    }
}
