//! High-level reasoning agent.

use anyhow::{bail, Context, Result};
use rap_core::{
    model::{LanguageModel, ModelBackend, ModelGateway, RemoteConfig},
    prompt::{InteractivePrompt, PromptSet},
    search::{Aggregation, Mcts, MctsConfig, ProposalConfig, SearchConfig, SearchResult},
    world::{WorldModel, WorldModelConfig},
    RapError,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Configuration for the agent.
///
/// Every field has a default, so a JSON file only needs the values it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Sub-questions proposed per expansion.
    pub n_action: usize,
    /// Samples per self-consistency vote.
    pub n_confidence: usize,
    /// Maximum number of steps in a trace.
    pub depth_limit: usize,
    /// Only propose the final answer at the depth limit.
    pub force_terminating_on_depth_limit: bool,
    /// Maximum prompts per backend call.
    pub batch_size: usize,
    /// Samples per round between early-stop checks.
    pub early_stop_base: usize,
    /// Leader share that ends self-consistency sampling early.
    pub early_stop_threshold: f64,
    /// Weight of usefulness against confidence in the reward.
    pub reward_alpha: f64,
    /// Confidence assumed before a transition was sampled.
    pub reward_confidence_default: f64,
    /// Aggregates a path's step rewards.
    pub cum_reward: Aggregation,
    /// Aggregates a node's received values.
    pub calc_q: Aggregation,
    /// Simulations per question; defaults to `n_action * depth_limit`.
    pub n_iters: Option<usize>,
    /// Exploration constant for UCT.
    pub exploration_constant: f64,
    /// Sampling temperature for sub-questions.
    pub question_temperature: f32,
    /// Sampling temperature for sub-answers.
    pub answer_temperature: f32,
    /// Token limit per completion.
    pub max_tokens: usize,
    /// Seed for every sampling call.
    pub seed: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            n_action: 4,
            n_confidence: 8,
            depth_limit: 5,
            force_terminating_on_depth_limit: true,
            batch_size: 2,
            early_stop_base: 2,
            early_stop_threshold: 0.5,
            reward_alpha: 0.5,
            reward_confidence_default: 0.8,
            cum_reward: Aggregation::Sum,
            calc_q: Aggregation::Mean,
            n_iters: None,
            exploration_constant: 1.0,
            question_temperature: 0.8,
            answer_temperature: 0.8,
            max_tokens: 256,
            seed: 0,
        }
    }
}

impl AgentConfig {
    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> rap_core::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject values the search cannot run with.
    pub fn validate(&self) -> rap_core::Result<()> {
        let positive = [
            ("n_action", self.n_action),
            ("n_confidence", self.n_confidence),
            ("depth_limit", self.depth_limit),
            ("batch_size", self.batch_size),
            ("early_stop_base", self.early_stop_base),
            ("max_tokens", self.max_tokens),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(RapError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }

        let unit = [
            ("reward_alpha", self.reward_alpha),
            ("reward_confidence_default", self.reward_confidence_default),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(RapError::InvalidConfig(format!("{name} must lie in [0, 1], got {value}")));
            }
        }

        if !self.early_stop_threshold.is_finite() || self.early_stop_threshold < 0.0 {
            return Err(RapError::InvalidConfig(format!(
                "early_stop_threshold must be non-negative, got {}",
                self.early_stop_threshold
            )));
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(RapError::InvalidConfig(format!(
                "exploration_constant must be non-negative, got {}",
                self.exploration_constant
            )));
        }
        if self.question_temperature < 0.0 || self.answer_temperature < 0.0 {
            return Err(RapError::InvalidConfig("temperatures must be non-negative".to_string()));
        }
        Ok(())
    }

    /// Simulations per question.
    pub fn n_iters(&self) -> usize {
        self.n_iters.unwrap_or(self.n_action * self.depth_limit)
    }

    /// World model settings.
    pub fn world_config(&self) -> WorldModelConfig {
        WorldModelConfig {
            n_confidence: self.n_confidence,
            early_stop_base: self.early_stop_base,
            early_stop_threshold: self.early_stop_threshold,
            temperature: self.answer_temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Search config settings.
    pub fn proposal_config(&self) -> ProposalConfig {
        ProposalConfig {
            n_actions: self.n_action,
            depth_limit: self.depth_limit,
            force_terminating_on_depth_limit: self.force_terminating_on_depth_limit,
            reward_alpha: self.reward_alpha,
            reward_confidence_default: self.reward_confidence_default,
            temperature: self.question_temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// MCTS settings.
    pub fn mcts_config(&self) -> MctsConfig {
        MctsConfig {
            n_iters: self.n_iters(),
            exploration_constant: self.exploration_constant,
            cum_reward: self.cum_reward,
            calc_q: self.calc_q,
        }
    }
}

/// Builder for creating an Agent.
pub struct AgentBuilder {
    config: AgentConfig,
    prompts: Option<PromptSet>,
    model: Option<Arc<dyn LanguageModel>>,
    remote: Option<RemoteConfig>,
    cancel: Option<CancellationToken>,
}

impl AgentBuilder {
    /// Create a new agent builder.
    pub fn new() -> Self {
        Self {
            config: AgentConfig::default(),
            prompts: None,
            model: None,
            remote: None,
            cancel: None,
        }
    }

    /// Set the whole configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the prompt templates.
    pub fn prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Use an already constructed language model.
    pub fn model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Connect to an OpenAI-compatible inference service.
    pub fn remote(mut self, config: RemoteConfig) -> Self {
        self.remote = Some(config);
        self
    }

    /// Abort searches when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the agent.
    pub fn build(self) -> Result<Agent> {
        self.config.validate().context("invalid agent configuration")?;

        let model: Arc<dyn LanguageModel> = match (self.model, self.remote) {
            (Some(model), _) => model,
            (None, Some(remote)) => {
                let base_url = remote.base_url.clone();
                Arc::new(ModelBackend::remote(remote).with_context(|| format!("connecting to {base_url}"))?)
            }
            (None, None) => bail!("no language model configured"),
        };

        let mut gateway = ModelGateway::new(model, self.config.batch_size).with_seed(self.config.seed);
        if let Some(token) = self.cancel {
            gateway = gateway.with_cancellation(token);
        }
        let gateway = Arc::new(gateway);

        let prompts = Arc::new(self.prompts.unwrap_or_default());
        let interactive = Arc::new(prompts.interactive.clone());

        Ok(Agent {
            config: self.config,
            gateway,
            prompts,
            interactive,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers questions by planning over sub-questions.
pub struct Agent {
    config: AgentConfig,
    gateway: Arc<ModelGateway>,
    prompts: Arc<PromptSet>,
    interactive: Arc<InteractivePrompt>,
}

impl Agent {
    /// Create a new agent builder.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Get agent configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Model gateway that each search opens its session from.
    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Token that aborts the running search.
    pub fn cancellation_token(&self) -> &CancellationToken {
        self.gateway.cancellation_token()
    }

    /// Search for the best reasoning trace for `question`.
    ///
    /// Each call builds a fresh tree over a fresh gateway session, so the
    /// result depends only on the question and the configuration.
    pub async fn run(&self, question: &str) -> rap_core::Result<SearchResult> {
        let session = Arc::new(self.gateway.session());
        let world = WorldModel::new(session.clone(), self.interactive.clone(), self.config.world_config());
        let search = SearchConfig::new(session, self.prompts.clone(), self.config.proposal_config());

        let mcts = Mcts::new(world.init_state(question), world, search, self.config.mcts_config());
        let result = mcts.run().await?;

        info!(
            answer = result.answer().unwrap_or("none"),
            steps = result.trajectory.steps.len(),
            lm_calls = result.stats.lm_calls,
            "question answered"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("gateway", &self.gateway)
            .finish()
    }
}
