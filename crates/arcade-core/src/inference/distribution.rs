//! Prior construction and Bayesian updates over a candidate set.

use super::InferenceError;
use super::candidate::{Answer, Candidate, QuestionId};
use super::policy::DEFAULT_LIKELIHOOD_FLOOR;
use super::stats::StatsLookup;

/// Assigns `probability = popularity / total popularity` to every candidate.
pub fn initialize_distribution(candidates: &[Candidate]) -> Result<Vec<Candidate>, InferenceError> {
    if candidates.is_empty() {
        return Err(InferenceError::EmptyCandidates);
    }

    for candidate in candidates {
        if !candidate.popularity.is_finite() || candidate.popularity < 0.0 {
            return Err(InferenceError::InvalidPopularity {
                candidate: candidate.id,
                value: candidate.popularity,
            });
        }
    }

    let total: f64 = candidates.iter().map(|c| c.popularity).sum();
    if total <= 0.0 {
        return Err(InferenceError::ZeroPopularity);
    }

    Ok(candidates
        .iter()
        .map(|c| Candidate {
            probability: c.popularity / total,
            ..c.clone()
        })
        .collect())
}

/// Posterior after observing `answer` to `question`, using the default likelihood floor.
pub fn update_distribution<S>(
    candidates: &[Candidate],
    question: QuestionId,
    answer: Answer,
    stats: &S,
) -> Result<Vec<Candidate>, InferenceError>
where
    S: StatsLookup + ?Sized,
{
    update_distribution_with_floor(candidates, question, answer, stats, DEFAULT_LIKELIHOOD_FLOOR)
}

/// Posterior after observing `answer`, clamping each likelihood to at least `floor`.
///
/// The floor keeps every candidate recoverable: no single answer can drive a
/// posterior to exactly zero.
pub fn update_distribution_with_floor<S>(
    candidates: &[Candidate],
    question: QuestionId,
    answer: Answer,
    stats: &S,
    floor: f64,
) -> Result<Vec<Candidate>, InferenceError>
where
    S: StatsLookup + ?Sized,
{
    if candidates.is_empty() {
        return Err(InferenceError::EmptyCandidates);
    }

    let mut updated: Vec<Candidate> = candidates
        .iter()
        .map(|c| {
            let likelihood = stats.stats_or_prior(question, c.id).likelihood(answer, floor);
            Candidate {
                probability: c.probability * likelihood,
                ..c.clone()
            }
        })
        .collect();

    normalize(&mut updated)?;
    Ok(updated)
}

/// Rescales probabilities in place so they sum to one.
///
/// Every input probability must be finite and non-negative.
pub fn normalize(candidates: &mut [Candidate]) -> Result<(), InferenceError> {
    if candidates.is_empty() {
        return Err(InferenceError::EmptyCandidates);
    }

    if let Some(bad) = candidates
        .iter()
        .find(|c| !c.probability.is_finite() || c.probability < 0.0)
    {
        return Err(InferenceError::InvalidProbability {
            candidate: bad.id,
            value: bad.probability,
        });
    }

    let sum: f64 = candidates.iter().map(|c| c.probability).sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(InferenceError::DegenerateNormalization { sum });
    }

    for candidate in candidates.iter_mut() {
        candidate.probability /= sum;
    }
    Ok(())
}

/// Even distribution; the fallback callers may choose after a degenerate update.
pub fn uniform_distribution(candidates: &[Candidate]) -> Result<Vec<Candidate>, InferenceError> {
    if candidates.is_empty() {
        return Err(InferenceError::EmptyCandidates);
    }
    let share = 1.0 / candidates.len() as f64;
    Ok(candidates
        .iter()
        .map(|c| Candidate {
            probability: share,
            ..c.clone()
        })
        .collect())
}

/// Highest-probability candidate; on ties the later candidate wins.
pub fn top_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .reduce(|best, next| if best.probability > next.probability { best } else { next })
}
