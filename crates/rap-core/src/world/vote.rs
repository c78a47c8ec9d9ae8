//! Self-consistency voting over sampled answers.

/// Votes per distinct answer, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    /// (answer, completions that produced it)
    entries: Vec<(String, Vec<String>)>,
    valid: usize,
}

/// The winning answer of a tally.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict<'a> {
    /// Normalised numeric answer.
    pub answer: &'a str,
    /// First completion that produced it.
    pub completion: &'a str,
    /// Votes for the answer.
    pub votes: usize,
    /// `votes / valid parses`.
    pub confidence: f64,
}

impl VoteTally {
    /// Empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion whose parsed answer is `answer`.
    pub fn add(&mut self, answer: String, completion: String) {
        self.valid += 1;
        match self.entries.iter_mut().find(|(a, _)| *a == answer) {
            Some((_, completions)) => completions.push(completion),
            None => self.entries.push((answer, vec![completion])),
        }
    }

    /// Number of completions that parsed.
    pub fn valid(&self) -> usize {
        self.valid
    }

    /// Number of distinct answers.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing parsed yet.
    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    /// The majority answer; ties go to the answer seen first.
    pub fn leader(&self) -> Option<Verdict<'_>> {
        let mut best: Option<&(String, Vec<String>)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1.len() > b.1.len()) {
                best = Some(entry);
            }
        }
        best.map(|(answer, completions)| Verdict {
            answer,
            completion: &completions[0],
            votes: completions.len(),
            confidence: completions.len() as f64 / self.valid as f64,
        })
    }

    /// Whether sampling can stop after `sampled` draws.
    ///
    /// The leader must hold at least `threshold` of all draws (parsed or
    /// not) and must not be tied with the runner-up.
    pub fn is_decisive(&self, sampled: usize, threshold: f64) -> bool {
        let mut counts: Vec<usize> = self.entries.iter().map(|(_, c)| c.len()).collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        match counts.as_slice() {
            [] => false,
            [top, rest @ ..] => {
                let share = *top as f64 / sampled.max(1) as f64;
                let tied = rest.first().is_some_and(|second| second == top);
                share >= threshold && !tied
            }
        }
    }
}
