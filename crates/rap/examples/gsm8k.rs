//! GSM8k evaluation driver.
//!
//! Runs the agent over a JSON Lines copy of the GSM8k test split against an
//! OpenAI-compatible inference service, logging one record per case.
//!
//! ```text
//! cargo run --example gsm8k -- --dataset gsm8k_test.jsonl \
//!     --interactive-prompt prompts/interactive_examples.json \
//!     --useful-prompt prompts/useful_examples.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rap::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Evaluate reasoning-via-planning on GSM8k")]
struct Args {
    /// JSON Lines dataset with `question` and `answer` fields
    #[arg(long)]
    dataset: PathBuf,

    /// Interactive few-shot template
    #[arg(long, default_value = "prompts/interactive_examples.json")]
    interactive_prompt: PathBuf,

    /// Usefulness few-shot template
    #[arg(long, default_value = "prompts/useful_examples.json")]
    useful_prompt: PathBuf,

    /// Agent configuration (JSON); defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inference service base URL
    #[arg(long, env = "RAP_BASE_URL", default_value = "http://localhost:8000/v1")]
    base_url: String,

    /// Model name sent to the service
    #[arg(long, env = "RAP_MODEL", default_value = "local-model")]
    model: String,

    /// Environment variable holding the API key
    #[arg(long)]
    api_key_env: Option<String>,

    /// Records to skip
    #[arg(long, default_value_t = 0)]
    resume: usize,

    /// Log directory; defaults to a timestamped directory under `logs/`
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Do not write logs
    #[arg(long)]
    disable_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AgentConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => AgentConfig::default(),
    };
    let prompts = PromptSet::load(&args.interactive_prompt, &args.useful_prompt)?;
    let remote = RemoteConfig {
        base_url: args.base_url.clone(),
        model: args.model.clone(),
        api_key_env: args.api_key_env.clone(),
        ..Default::default()
    };

    let agent = Agent::builder().config(config).prompts(prompts).remote(remote).build()?;

    // Ctrl-C stops the search at the next model call
    let token = agent.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            token.cancel();
        }
    });

    let examples = load_dataset(&args.dataset)?;
    let mut experiment = Experiment::new(&agent).resume(args.resume);
    if !args.disable_log {
        let dir = args.log_dir.clone().unwrap_or_else(|| ExperimentLog::timestamped("logs"));
        let log = ExperimentLog::create(&dir, agent.config(), args.resume > 0)?;
        tracing::info!(dir = %dir.display(), "logging to");
        experiment = experiment.log(log);
    }

    let summary = experiment.run(examples).await?;
    println!(
        "accuracy {:.3} ({}/{}), {} failed",
        summary.accuracy(),
        summary.correct,
        summary.evaluated,
        summary.failed
    );

    Ok(())
}
