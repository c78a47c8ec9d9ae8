//! Numeric answer extraction and comparison.
//!
//! Completions answer sub-questions in a sentence that usually ends with
//! "The answer is N."; dataset answers carry the final number after a
//! `#### ` delimiter.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker preceding the answer in a completion.
pub const ANSWER_MARKER: &str = "The answer is";

/// Delimiter preceding the final answer in a dataset record.
pub const DATASET_DELIMITER: &str = "####";

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\$?\d[\d,]*(?:\.\d+)?|-?\$?\.\d+").expect("number pattern is valid")
});

/// Strip currency and grouping, and drop a trailing `.0`.
pub fn normalize_number(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    let cleaned = cleaned.trim_end_matches('.');
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Some(format!("{}", value as i64))
    } else {
        Some(cleaned.to_string())
    }
}

fn first_number(text: &str) -> Option<String> {
    NUMBER
        .find_iter(text)
        .find_map(|m| normalize_number(m.as_str()))
}

/// End of the sentence starting at the beginning of `text`.
fn sentence_end(text: &str) -> usize {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => return i,
            b'.' => {
                let next_is_digit = bytes.get(i + 1).is_some_and(|c| c.is_ascii_digit());
                if !next_is_digit {
                    return i;
                }
            }
            _ => {}
        }
    }
    text.len()
}

/// Extract the numeric answer from a completion.
///
/// When the completion states "The answer is ...", the number is taken from
/// that clause (after its last `=`, if any); otherwise the first number in
/// the text is used. Returns `None` when nothing parses.
pub fn retrieve_answer(output: &str) -> Option<String> {
    if let Some(pos) = output.rfind(ANSWER_MARKER) {
        let tail = &output[pos + ANSWER_MARKER.len()..];
        let clause = &tail[..sentence_end(tail)];
        let clause = clause.rsplit('=').next().unwrap_or(clause);
        if let Some(n) = first_number(clause) {
            return Some(n);
        }
    }
    first_number(output)
}

/// Extract the ground-truth answer from a dataset answer string.
pub fn retrieve_answer_from_dataset(answer: &str) -> Option<String> {
    let pos = answer.rfind(DATASET_DELIMITER)?;
    let tail = answer[pos + DATASET_DELIMITER.len()..].trim();
    normalize_number(tail).or_else(|| first_number(tail))
}

/// Whether a predicted answer matches the ground truth.
///
/// Numbers are compared by value; anything else by exact text. A missing
/// side is never correct.
pub fn judge_answer(output: Option<&str>, answer: Option<&str>) -> bool {
    let (Some(output), Some(answer)) = (output, answer) else {
        return false;
    };
    match (output.trim().parse::<f64>(), answer.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => (a - b).abs() < 1e-6,
        _ => output.trim() == answer.trim(),
    }
}
