//! Scripted demo.
//!
//! Runs one search against an in-process scripted model, so the whole
//! pipeline can be watched without an inference service.

use anyhow::Result;
use rap::prelude::*;
use std::sync::Arc;

const QUESTION: &str =
    "Roger has 5 tennis balls. He buys 2 cans of 3 balls each. How many does he have now?";

fn respond(prompt: &str) -> Vec<String> {
    let last = prompt.lines().last().unwrap_or("");
    if last.starts_with("Answer") {
        // answers depend on which sub-question is being asked
        let asked = prompt.lines().rev().nth(1).unwrap_or("");
        if asked.contains("cans") {
            vec!["He buys 2 cans of 3 balls, so 2 * 3 = 6. The answer is 6.".to_string()]
        } else {
            vec!["He has 5 + 6 = 11 balls. The answer is 11.".to_string()]
        }
    } else if last.ends_with("Now we can answer the question:") {
        vec![" How many tennis balls does he have now?".to_string()]
    } else if prompt.contains("How many balls are in the cans?") {
        vec![" Now we can answer the question: How many tennis balls does he have now?".to_string()]
    } else {
        vec![
            " How many balls are in the cans?".to_string(),
            " How many cans did Roger buy?".to_string(),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let model = ScriptedModel::new(respond).with_judge(|prompt| {
        if prompt.trim_end().ends_with("Is the new question useful?") && prompt.contains("balls are in the cans") {
            0.9
        } else {
            0.4
        }
    });

    let agent = Agent::builder()
        .model(Arc::new(model))
        .config(AgentConfig {
            n_iters: Some(12),
            ..Default::default()
        })
        .build()?;

    let result = agent.run(QUESTION).await?;

    for (i, step) in result.trajectory.steps.iter().enumerate() {
        println!("step {}: {} (reward {:.3})", i + 1, step.action.sub_question, step.reward);
    }
    for step in result.trajectory.terminal_state.steps() {
        println!("  {} -> {}", step.sub_question, step.sub_answer);
    }
    println!("answer: {:?}", result.answer());
    println!("stats: {:?}", result.stats);

    Ok(())
}
