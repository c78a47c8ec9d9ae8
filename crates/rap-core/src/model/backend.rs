//! Backend selection.

use super::{Completion, LanguageModel, RemoteConfig, RemoteModel, SamplingParams, ScriptedModel};
use crate::error::Result;
use async_trait::async_trait;

/// The language-model backends shipped with the crate.
///
/// Chosen once at construction; the rest of the engine only sees the
/// [`LanguageModel`] interface.
#[derive(Debug)]
pub enum ModelBackend {
    /// OpenAI-compatible inference service.
    Remote(RemoteModel),
    /// Deterministic in-process responder.
    Scripted(ScriptedModel),
}

impl ModelBackend {
    /// Connect to a remote inference service.
    pub fn remote(config: RemoteConfig) -> Result<Self> {
        Ok(Self::Remote(RemoteModel::new(config)?))
    }
}

impl From<ScriptedModel> for ModelBackend {
    fn from(model: ScriptedModel) -> Self {
        Self::Scripted(model)
    }
}

impl From<RemoteModel> for ModelBackend {
    fn from(model: RemoteModel) -> Self {
        Self::Remote(model)
    }
}

#[async_trait]
impl LanguageModel for ModelBackend {
    async fn complete(&self, prompts: &[String], params: &SamplingParams) -> Result<Vec<Completion>> {
        match self {
            Self::Remote(m) => m.complete(prompts, params).await,
            Self::Scripted(m) => m.complete(prompts, params).await,
        }
    }

    async fn next_token_log_probs(
        &self,
        prompts: &[String],
        candidates: &[String],
    ) -> Result<Vec<Vec<f64>>> {
        match self {
            Self::Remote(m) => m.next_token_log_probs(prompts, candidates).await,
            Self::Scripted(m) => m.next_token_log_probs(prompts, candidates).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Remote(m) => m.name(),
            Self::Scripted(m) => m.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_variant_delegates() {
        let backend: ModelBackend =
            ScriptedModel::new(|_: &str| vec!["The answer is 3.".to_string()]).into();

        let out = backend
            .complete(&["q".to_string()], &SamplingParams::default())
            .await
            .unwrap();

        assert_eq!(backend.name(), "scripted");
        assert_eq!(out[0].text, "The answer is 3.");
    }
}
