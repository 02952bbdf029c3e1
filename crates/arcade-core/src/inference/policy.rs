use super::InferenceError;
use super::candidate::Candidate;
use super::distribution::top_candidate;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_LIKELIHOOD_FLOOR: f64 = 0.01;
pub const DEFAULT_CERTAINTY_THRESHOLD: f64 = 0.80;
pub const DEFAULT_QUESTION_CAP: usize = 20;
pub const DEFAULT_SEARCH_WINDOW: usize = 50;

/// Product knobs for the guessing engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Lower bound applied to every answer likelihood during an update.
    pub likelihood_floor: f64,
    /// Guess as soon as the leading candidate's probability exceeds this.
    pub certainty_threshold: f64,
    /// Guess once this many questions have been asked.
    pub question_cap: usize,
    /// Maximum number of non-excluded questions scored per selection, in pool order.
    pub search_window: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            likelihood_floor: DEFAULT_LIKELIHOOD_FLOOR,
            certainty_threshold: DEFAULT_CERTAINTY_THRESHOLD,
            question_cap: DEFAULT_QUESTION_CAP,
            search_window: DEFAULT_SEARCH_WINDOW,
        }
    }
}

impl InferenceConfig {
    pub fn from_env() -> Self {
        let base = Self::default();
        let floor = parse_env_f64("ARCADE_GUESS_FLOOR", base.likelihood_floor);
        let certainty = parse_env_f64("ARCADE_GUESS_CERTAINTY", base.certainty_threshold);
        let cap = parse_env_usize("ARCADE_GUESS_CAP", base.question_cap);
        let window = parse_env_usize("ARCADE_GUESS_WINDOW", base.search_window);

        Self {
            likelihood_floor: floor.clamp(1e-6, 0.5),
            certainty_threshold: certainty.clamp(0.5, 0.999),
            question_cap: cap.clamp(1, 200),
            search_window: window.clamp(1, 10_000),
        }
    }

    /// Whether the round should end now, and with which candidate.
    ///
    /// `asked` is the number of questions already answered this round.
    pub fn decide<'a>(
        &self,
        candidates: &'a [Candidate],
        asked: usize,
    ) -> Result<Decision<'a>, InferenceError> {
        let top = top_candidate(candidates).ok_or(InferenceError::EmptyCandidates)?;

        if top.probability > self.certainty_threshold {
            return Ok(Decision::Guess {
                candidate: top,
                reason: GuessReason::Confident,
            });
        }

        if asked >= self.question_cap {
            return Ok(Decision::Guess {
                candidate: top,
                reason: GuessReason::QuestionCap,
            });
        }

        Ok(Decision::Ask)
    }
}

fn parse_env_f64(key: &str, fallback: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}

fn parse_env_usize(key: &str, fallback: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessReason {
    /// The leading candidate crossed the certainty threshold.
    Confident,
    /// The round hit the question cap.
    QuestionCap,
    /// No unasked question was left to pick.
    PoolExhausted,
}

impl GuessReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            GuessReason::Confident => "confident",
            GuessReason::QuestionCap => "question_cap",
            GuessReason::PoolExhausted => "pool_exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision<'a> {
    Ask,
    Guess {
        candidate: &'a Candidate,
        reason: GuessReason,
    },
}
