//! End-to-end searches against scripted models.

use rap::prelude::*;
use rap::tree::TreeNode;
use std::sync::Arc;

const ROGER: &str = "Roger has 5 tennis balls. He buys 2 cans of 3 balls each. How many does he have now?";

fn agent(model: ScriptedModel, config: AgentConfig) -> Agent {
    Agent::builder().model(Arc::new(model)).config(config).build().unwrap()
}

fn last_line(prompt: &str) -> &str {
    prompt.lines().last().unwrap_or("")
}

/// Proposes one correct decomposition and answers it consistently.
fn roger_model() -> ScriptedModel {
    ScriptedModel::new(|prompt: &str| {
        let last = last_line(prompt);
        if last.starts_with("Answer") {
            let asked = prompt.lines().rev().nth(1).unwrap_or("");
            if asked.contains("in the cans") {
                vec![" There are 2 cans of 3 balls, so 2 * 3 = 6. The answer is 6.".to_string()]
            } else {
                vec![" He has 5 + 6 = 11 balls. The answer is 11.".to_string()]
            }
        } else if last.ends_with("Now we can answer the question:") {
            vec![" How many tennis balls does he have now?".to_string()]
        } else if prompt.contains("in the cans?") {
            vec![" Now we can answer the question: How many tennis balls does he have now?".to_string()]
        } else {
            vec![" How many tennis balls are in the cans?".to_string()]
        }
    })
}

fn materialized(result: &SearchResult) -> impl Iterator<Item = &TreeNode> {
    result
        .tree
        .nodes()
        .iter()
        .filter(|n| n.depth > 0 && n.is_materialized())
}

#[tokio::test]
async fn roger_tennis_balls_answers_eleven() {
    let agent = agent(roger_model(), AgentConfig::default());

    let result = agent.run(ROGER).await.unwrap();

    assert_eq!(result.answer(), Some("11"));
    assert!(judge_answer(result.answer(), Some("11")));
    assert!(result.trajectory.terminal_state.is_final());
    assert_eq!(result.trajectory.steps.len(), 2);
    for step in result.trajectory.terminal_state.steps() {
        assert_eq!(step.confidence, 1.0);
    }
    assert_eq!(result.stats.simulations, agent.config().n_iters());
}

#[tokio::test]
async fn unparseable_model_still_terminates() {
    let model = ScriptedModel::new(|_: &str| vec!["I really could not say.".to_string()]);
    let config = AgentConfig::default();
    let agent = agent(model, config.clone());

    let result = agent.run(ROGER).await.unwrap();

    assert_eq!(result.stats.simulations, config.n_iters());
    assert!(result.trajectory.state_count() <= config.depth_limit + 1);
    assert!(materialized(&result).count() > 0);
    for node in materialized(&result) {
        assert_eq!(node.confidence, Some(0.0));
        let state = node.state.as_ref().unwrap();
        assert_eq!(state.last_step().unwrap().sub_answer, "unknown");
    }
    assert_eq!(result.answer(), None);
}

/// Proposes and answers with several competing candidates.
fn branching_model() -> ScriptedModel {
    ScriptedModel::new(|prompt: &str| {
        if last_line(prompt).starts_with("Answer") {
            vec![
                "The answer is 6.".to_string(),
                "The answer is 5.".to_string(),
                "The answer is 11.".to_string(),
            ]
        } else {
            vec![
                " How many balls are in the cans?".to_string(),
                " How many cans did he buy?".to_string(),
                " Now we can answer the question: How many does he have now?".to_string(),
            ]
        }
    })
    .with_judge(|prompt| if prompt.contains("cans did") { 0.3 } else { 0.7 })
}

#[tokio::test]
async fn same_seed_gives_identical_result() {
    let config = AgentConfig {
        seed: 17,
        ..Default::default()
    };

    let first = agent(branching_model(), config.clone()).run(ROGER).await.unwrap();
    let second = agent(branching_model(), config).run(ROGER).await.unwrap();

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.trajectory, second.trajectory);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn one_agent_repeats_its_result() {
    let agent = agent(
        branching_model(),
        AgentConfig {
            seed: 17,
            ..Default::default()
        },
    );

    let first = agent.run(ROGER).await.unwrap();
    let other = agent.run("Tom has 3 apples. How many apples does he have?").await.unwrap();
    let second = agent.run(ROGER).await.unwrap();

    assert_eq!(first.answer(), second.answer());
    assert_eq!(first.stats, second.stats);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_ne!(
        other.trajectory.terminal_state.question(),
        first.trajectory.terminal_state.question()
    );
}

#[tokio::test]
async fn depth_limit_forces_final_answer() {
    let model = ScriptedModel::new(|prompt: &str| {
        let last = last_line(prompt);
        if last.starts_with("Answer") {
            vec!["The answer is 3.".to_string()]
        } else if last.ends_with("Now we can answer the question:") {
            vec![" How many are there?".to_string()]
        } else {
            vec![" What else do we know?".to_string(), " What comes next?".to_string()]
        }
    });
    let config = AgentConfig {
        depth_limit: 3,
        ..Default::default()
    };
    let agent = agent(model, config.clone());

    let result = agent.run(ROGER).await.unwrap();

    assert!(result.trajectory.state_count() <= config.depth_limit + 1);
    assert!(result.stats.max_depth_reached <= config.depth_limit);
    for node in result.tree.nodes() {
        if node.depth + 1 == config.depth_limit && node.is_expanded() {
            assert_eq!(node.children().len(), 1);
            assert!(result.tree.node(node.children()[0]).action.as_ref().unwrap().is_final());
        }
        if node.depth == config.depth_limit && node.is_materialized() {
            assert!(node.is_terminal);
            assert!(node.state.as_ref().unwrap().is_final());
        }
    }
}

#[tokio::test]
async fn depth_limit_one_allows_only_final_answer() {
    let config = AgentConfig {
        depth_limit: 1,
        ..Default::default()
    };
    let agent = agent(roger_model(), config);

    let result = agent.run(ROGER).await.unwrap();

    assert_eq!(result.tree.root().children().len(), 1);
    assert_eq!(result.trajectory.steps.len(), 1);
    assert!(result.trajectory.steps[0].action.is_final());
    assert_eq!(result.answer(), Some("11"));
}

#[tokio::test]
async fn terminal_iff_final_answer_or_depth_limit() {
    let config = AgentConfig {
        depth_limit: 4,
        ..Default::default()
    };
    let agent = agent(roger_model(), config.clone());

    let result = agent.run(ROGER).await.unwrap();

    for node in materialized(&result) {
        let state = node.state.as_ref().unwrap();
        let by_action = node.action.as_ref().unwrap().is_final();
        assert_eq!(state.is_final(), by_action);
        assert_eq!(node.is_terminal, by_action || node.depth >= config.depth_limit);
    }
}

#[tokio::test]
async fn reward_alpha_selects_signal() {
    let judged = || roger_model().with_judge(|_| 0.25);

    let confidence_only = agent(
        judged(),
        AgentConfig {
            reward_alpha: 0.0,
            ..Default::default()
        },
    )
    .run(ROGER)
    .await
    .unwrap();
    let steps = confidence_only.trajectory.terminal_state.steps();
    for (step, sub) in confidence_only.trajectory.steps.iter().zip(steps) {
        assert!((step.reward - sub.confidence).abs() < 1e-12);
    }

    let usefulness_only = agent(
        judged(),
        AgentConfig {
            reward_alpha: 1.0,
            ..Default::default()
        },
    )
    .run(ROGER)
    .await
    .unwrap();
    for step in &usefulness_only.trajectory.steps {
        assert!((step.reward - 0.25).abs() < 1e-9);
        assert!((step.reward - step.action.usefulness).abs() < 1e-12);
    }
}

#[tokio::test]
async fn single_sample_confidence_is_binary() {
    let model = ScriptedModel::new(|prompt: &str| {
        let last = last_line(prompt);
        if last.starts_with("Answer") {
            vec!["The answer is 4.".to_string(), "no idea".to_string(), "The answer is 5.".to_string()]
        } else {
            vec![" What is next?".to_string(), " Anything else?".to_string()]
        }
    });
    let agent = agent(
        model,
        AgentConfig {
            n_confidence: 1,
            ..Default::default()
        },
    );

    let result = agent.run(ROGER).await.unwrap();

    for node in materialized(&result) {
        let confidence = node.confidence.unwrap();
        assert!(confidence == 0.0 || confidence == 1.0);
    }
}
