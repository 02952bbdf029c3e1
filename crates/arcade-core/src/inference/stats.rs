use super::candidate::{Answer, CandidateId, QuestionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Yes/no tallies for one (question, candidate) pair.
///
/// Counts are Laplace-smoothed on read: a stored zero is treated as one, so no
/// answer can ever have zero likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerStats {
    yes_count: u32,
    no_count: u32,
}

impl AnswerStats {
    /// The prior used when no statistic is recorded.
    pub const UNINFORMATIVE: AnswerStats = AnswerStats {
        yes_count: 1,
        no_count: 1,
    };

    pub const fn new(yes_count: u32, no_count: u32) -> Self {
        Self {
            yes_count,
            no_count,
        }
    }

    pub fn yes_count(&self) -> u32 {
        self.yes_count.max(1)
    }

    pub fn no_count(&self) -> u32 {
        self.no_count.max(1)
    }

    /// Fraction of recorded answers equal to `answer`, before any floor is applied.
    pub fn ratio(&self, answer: Answer) -> f64 {
        let yes = f64::from(self.yes_count());
        let no = f64::from(self.no_count());
        let hits = match answer {
            Answer::Yes => yes,
            Answer::No => no,
        };
        hits / (yes + no)
    }

    /// Likelihood of `answer`, clamped to at least `floor`.
    pub fn likelihood(&self, answer: Answer, floor: f64) -> f64 {
        self.ratio(answer).max(floor)
    }

    pub fn record(&mut self, answer: Answer) {
        match answer {
            Answer::Yes => self.yes_count = self.yes_count.saturating_add(1),
            Answer::No => self.no_count = self.no_count.saturating_add(1),
        }
    }
}

impl Default for AnswerStats {
    fn default() -> Self {
        Self::UNINFORMATIVE
    }
}

/// Read access to per-question, per-candidate answer statistics.
///
/// Implemented for closures so callers can back lookups with whatever store
/// they batch-loaded before entering the engine.
pub trait StatsLookup {
    fn lookup(&self, question: QuestionId, candidate: CandidateId) -> Option<AnswerStats>;

    /// Stored statistic, or the uninformative `(1, 1)` prior when absent.
    fn stats_or_prior(&self, question: QuestionId, candidate: CandidateId) -> AnswerStats {
        self.lookup(question, candidate)
            .unwrap_or(AnswerStats::UNINFORMATIVE)
    }
}

impl<F> StatsLookup for F
where
    F: Fn(QuestionId, CandidateId) -> Option<AnswerStats>,
{
    fn lookup(&self, question: QuestionId, candidate: CandidateId) -> Option<AnswerStats> {
        self(question, candidate)
    }
}

/// In-memory statistics table keyed by `(question, candidate)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsTable {
    entries: HashMap<(QuestionId, CandidateId), AnswerStats>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question: QuestionId, candidate: CandidateId, stats: AnswerStats) {
        self.entries.insert((question, candidate), stats);
    }

    pub fn get(&self, question: QuestionId, candidate: CandidateId) -> Option<AnswerStats> {
        self.entries.get(&(question, candidate)).copied()
    }

    /// Counts one more `answer` for the pair, starting from the prior if unseen.
    pub fn record_answer(&mut self, question: QuestionId, candidate: CandidateId, answer: Answer) {
        self.entries
            .entry((question, candidate))
            .or_default()
            .record(answer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StatsLookup for StatsTable {
    fn lookup(&self, question: QuestionId, candidate: CandidateId) -> Option<AnswerStats> {
        self.get(question, candidate)
    }
}
