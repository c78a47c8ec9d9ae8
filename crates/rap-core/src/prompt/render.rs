//! Prompt rendering for the world model and search config.

use super::{indexed, InteractivePrompt, UsefulPrompt};
use crate::world::ReasoningState;
use std::fmt::Write;

fn write_trace(out: &mut String, prompt: &InteractivePrompt, state: &ReasoningState) {
    out.push_str(&prompt.input);
    let _ = writeln!(out, "{}{}", prompt.question_prefix, state.question());
    for (i, step) in state.steps().iter().enumerate() {
        let _ = writeln!(out, "{} {}", indexed(&prompt.subquestion_prefix, i + 1), step.sub_question);
        let _ = writeln!(out, "{} {}", indexed(&prompt.answer_prefix, i + 1), step.sub_answer);
    }
}

/// Prompt asking the model to answer `sub_question` given the trace so far.
pub fn answer_prompt(prompt: &InteractivePrompt, state: &ReasoningState, sub_question: &str) -> String {
    let next = state.depth() + 1;
    let mut out = String::new();
    write_trace(&mut out, prompt, state);
    let _ = writeln!(out, "{} {}", indexed(&prompt.subquestion_prefix, next), sub_question);
    out.push_str(&indexed(&prompt.answer_prefix, next));
    out
}

/// Prompt asking the model for the next sub-question.
///
/// With `force_final` the sub-question line is pre-filled with the
/// overall-question prefix, so the model can only ask for the final answer.
pub fn proposal_prompt(prompt: &InteractivePrompt, state: &ReasoningState, force_final: bool) -> String {
    let mut out = String::new();
    write_trace(&mut out, prompt, state);
    out.push_str(&indexed(&prompt.subquestion_prefix, state.depth() + 1));
    if force_final {
        out.push(' ');
        out.push_str(&prompt.overall_question_prefix);
    }
    out
}

/// Prompt asking whether `candidate` is a useful next sub-question.
pub fn usefulness_prompt(prompt: &UsefulPrompt, state: &ReasoningState, candidate: &str) -> String {
    let mut out = String::new();
    out.push_str(&prompt.input);
    let _ = writeln!(out, "{}{}", prompt.question_prefix, state.question());
    for (i, step) in state.steps().iter().enumerate() {
        let _ = writeln!(out, "{} {}", indexed(&prompt.subquestion_prefix, i + 1), step.sub_question);
    }
    let _ = writeln!(
        out,
        "{} {}",
        indexed(&prompt.new_subquestion_prefix, state.depth() + 1),
        candidate
    );
    out.push_str(&prompt.answer_prefix);
    out.push(' ');
    out
}

/// The sentence of a word problem that asks the question.
///
/// Used to build a final-answer sub-question when the model proposes
/// nothing usable.
pub fn closing_question(question: &str) -> &str {
    let question = question.trim();
    let Some(end) = question.rfind('?') else {
        return question;
    };
    let head = &question[..end];
    let start = head
        .rfind(|c: char| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|i| i + 1)
        .unwrap_or(0);
    question[start..=end].trim()
}
