//! Adaptive yes/no guessing over a fixed candidate set.
//!
//! This module is composed of:
//! - `candidate`: candidates, questions, answers and their ids.
//! - `stats`: per-question answer statistics and the lookup capability.
//! - `distribution`: prior construction and Bayesian updates.
//! - `selection`: entropy scoring and next-question choice.
//! - `policy`: tunable constants and the guess-or-ask decision.
//! - `catalog`: the plain-text dataset loader.

pub mod catalog;
mod candidate;
mod distribution;
mod policy;
mod selection;
mod stats;

pub use candidate::{Answer, Candidate, CandidateId, Question, QuestionId};
pub use catalog::{Catalog, CatalogError};
pub use distribution::{
    initialize_distribution, normalize, top_candidate, uniform_distribution, update_distribution,
    update_distribution_with_floor,
};
pub use policy::{
    DEFAULT_CERTAINTY_THRESHOLD, DEFAULT_LIKELIHOOD_FLOOR, DEFAULT_QUESTION_CAP,
    DEFAULT_SEARCH_WINDOW, Decision, GuessReason, InferenceConfig,
};
pub use selection::{expected_entropy, select_next_question, select_next_question_within};
pub use stats::{AnswerStats, StatsLookup, StatsTable};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("candidate set is empty")]
    EmptyCandidates,
    #[error("candidate {candidate} has invalid popularity {value}")]
    InvalidPopularity { candidate: CandidateId, value: f64 },
    #[error("candidate {candidate} has invalid probability {value}")]
    InvalidProbability { candidate: CandidateId, value: f64 },
    #[error("total popularity is zero")]
    ZeroPopularity,
    #[error("posterior mass {sum} cannot be normalized")]
    DegenerateNormalization { sum: f64 },
    #[error("unknown answer '{0}', expected yes or no")]
    UnknownAnswer(String),
}

/// The guessing engine bound to one [`InferenceConfig`].
///
/// Holds no per-round state; every call is a function of its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine {
    config: InferenceConfig,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn initialize(&self, candidates: &[Candidate]) -> Result<Vec<Candidate>, InferenceError> {
        initialize_distribution(candidates)
    }

    pub fn update<S>(
        &self,
        candidates: &[Candidate],
        question: QuestionId,
        answer: Answer,
        stats: &S,
    ) -> Result<Vec<Candidate>, InferenceError>
    where
        S: StatsLookup + ?Sized,
    {
        update_distribution_with_floor(
            candidates,
            question,
            answer,
            stats,
            self.config.likelihood_floor,
        )
    }

    pub fn select<'q, S>(
        &self,
        candidates: &[Candidate],
        excluded: &[QuestionId],
        pool: &'q [Question],
        stats: &S,
    ) -> Option<&'q Question>
    where
        S: StatsLookup + ?Sized,
    {
        select_next_question_within(candidates, excluded, pool, stats, self.config.search_window)
    }

    pub fn decide<'a>(
        &self,
        candidates: &'a [Candidate],
        asked: usize,
    ) -> Result<Decision<'a>, InferenceError> {
        self.config.decide(candidates, asked)
    }
}
