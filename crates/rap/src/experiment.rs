//! Dataset evaluation loop with per-case logging.
//!
//! An experiment feeds dataset records to an [`Agent`] one at a time, judges
//! each answer against the record's ground truth and keeps a running
//! accuracy. With logging enabled the log directory holds:
//!
//! | Path | Contents |
//! |------|----------|
//! | `config.json` | The agent configuration |
//! | `result.jsonl` | One [`CaseRecord`] per evaluated case |
//! | `algo_output/<case>.json` | The full [`SearchResult`] of the case |

use crate::agent::{Agent, AgentConfig};
use anyhow::{Context, Result};
use rap_core::answer::{judge_answer, retrieve_answer_from_dataset};
use rap_core::search::SearchResult;
use rap_core::RapError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One dataset record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Word problem.
    pub question: String,
    /// Worked solution ending in `#### <answer>`.
    pub answer: String,
}

/// Read a JSON Lines dataset; blank lines are skipped.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<Example>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;

    let mut examples = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let example: Example = serde_json::from_str(&line)
            .map_err(|e| RapError::DatasetError(format!("{}:{}: {e}", path.display(), i + 1)))?;
        examples.push(example);
    }
    Ok(examples)
}

/// Outcome of one evaluated case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// 1-based case number, counting skipped records.
    pub case: usize,
    /// Whether the output matched the ground truth.
    pub correct: bool,
    /// Answer extracted from the search result.
    pub output: Option<String>,
    /// Answer extracted from the dataset record.
    pub answer: Option<String>,
    /// Running accuracy over evaluated cases.
    pub accuracy: f64,
    /// Correct cases so far.
    pub correct_count: usize,
    /// Cases evaluated so far in this run.
    pub evaluated: usize,
}

/// Files written by an experiment.
#[derive(Debug, Clone)]
pub struct ExperimentLog {
    dir: PathBuf,
}

impl ExperimentLog {
    /// Create the log directory and write the configuration snapshot.
    ///
    /// An existing directory is an error unless `resume` is set.
    pub fn create(dir: impl Into<PathBuf>, config: &AgentConfig, resume: bool) -> Result<Self> {
        let dir = dir.into();
        if !resume {
            if let Some(parent) = dir.parent() {
                fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::create_dir(&dir).with_context(|| {
                format!("creating log directory {} (pass a resume offset to reuse it)", dir.display())
            })?;
        }
        fs::create_dir_all(dir.join("algo_output"))
            .with_context(|| format!("creating log directory {}", dir.display()))?;

        let snapshot = serde_json::to_string_pretty(config).context("serializing agent config")?;
        fs::write(dir.join("config.json"), snapshot)?;
        Ok(Self { dir })
    }

    /// Default directory under `root`, named by the current local time.
    pub fn timestamped(root: impl AsRef<Path>) -> PathBuf {
        let stamp = chrono::Local::now().format("%m%d%Y-%H%M%S");
        root.as_ref().join(format!("gsm8k_mcts/{stamp}"))
    }

    /// Log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a case record to `result.jsonl`.
    pub fn record(&self, record: &CaseRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("result.jsonl"))?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Write the search result of a case.
    pub fn save_result(&self, case: usize, result: &SearchResult) -> Result<()> {
        let path = self.dir.join("algo_output").join(format!("{case}.json"));
        fs::write(&path, serde_json::to_vec(result)?).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Totals of an experiment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Cases evaluated in this run.
    pub evaluated: usize,
    /// Cases answered correctly.
    pub correct: usize,
    /// Cases whose search failed with a non-fatal error.
    pub failed: usize,
}

impl ExperimentSummary {
    /// Share of evaluated cases answered correctly.
    pub fn accuracy(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.correct as f64 / self.evaluated as f64
        }
    }
}

/// Sequential evaluation of an agent over a dataset.
pub struct Experiment<'a> {
    agent: &'a Agent,
    resume: usize,
    log: Option<ExperimentLog>,
}

impl<'a> Experiment<'a> {
    /// Evaluate with `agent`, without logging.
    pub fn new(agent: &'a Agent) -> Self {
        Self {
            agent,
            resume: 0,
            log: None,
        }
    }

    /// Skip the first `resume` records.
    pub fn resume(mut self, resume: usize) -> Self {
        self.resume = resume;
        self
    }

    /// Write records and search results to `log`.
    pub fn log(mut self, log: ExperimentLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Evaluate every remaining record in order.
    ///
    /// A failed search counts as an incorrect answer; a fatal error
    /// (unreachable model, cancellation) ends the run.
    pub async fn run(self, examples: impl IntoIterator<Item = Example>) -> Result<ExperimentSummary> {
        let mut summary = ExperimentSummary::default();

        for (i, example) in examples.into_iter().skip(self.resume).enumerate() {
            let case = self.resume + i + 1;

            let result = match self.agent.run(&example.question).await {
                Ok(result) => Some(result),
                Err(e) if e.is_fatal() => {
                    return Err(anyhow::Error::new(e).context(format!("case #{case} aborted the run")));
                }
                Err(e) => {
                    warn!(case, error = %e, "search failed, counting as incorrect");
                    summary.failed += 1;
                    None
                }
            };

            let output = result.as_ref().and_then(|r| r.answer().map(str::to_string));
            let answer = retrieve_answer_from_dataset(&example.answer);
            let correct = judge_answer(output.as_deref(), answer.as_deref());

            summary.evaluated += 1;
            summary.correct += usize::from(correct);
            let record = CaseRecord {
                case,
                correct,
                output,
                answer,
                accuracy: summary.accuracy(),
                correct_count: summary.correct,
                evaluated: summary.evaluated,
            };

            info!(
                case,
                correct,
                output = record.output.as_deref().unwrap_or("none"),
                answer = record.answer.as_deref().unwrap_or("none"),
                accuracy = format_args!("{:.3}", record.accuracy),
                "case {}/{}",
                record.correct_count,
                record.evaluated
            );

            if let Some(log) = &self.log {
                log.record(&record)?;
                if let Some(result) = &result {
                    log.save_result(case, result)?;
                }
            }
        }

        Ok(summary)
    }
}
