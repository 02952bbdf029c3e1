//! Entropy-driven choice of the next question.

use super::candidate::{Answer, Candidate, Question, QuestionId};
use super::policy::DEFAULT_SEARCH_WINDOW;
use super::stats::StatsLookup;
use tracing::{debug, trace};

/// Probability-weighted answer entropy of `question` over the candidate set:
/// `-Σ_c p_c · [p_yes·log2(p_yes) + p_no·log2(p_no)]`, with `0·log2(0) = 0`.
///
/// Lower values mean the likely candidates answer this question more
/// predictably, so the answer is expected to concentrate the distribution.
pub fn expected_entropy<S>(candidates: &[Candidate], question: QuestionId, stats: &S) -> f64
where
    S: StatsLookup + ?Sized,
{
    candidates
        .iter()
        .map(|candidate| {
            let answer_stats = stats.stats_or_prior(question, candidate.id);
            let yes = answer_stats.ratio(Answer::Yes);
            let no = answer_stats.ratio(Answer::No);
            candidate.probability * (plogp(yes) + plogp(no))
        })
        .fold(0.0, |acc, term| acc - term)
}

fn plogp(p: f64) -> f64 {
    if p > 0.0 { p * p.log2() } else { 0.0 }
}

/// Picks the unasked question with minimal [`expected_entropy`], scanning at
/// most [`DEFAULT_SEARCH_WINDOW`] questions.
pub fn select_next_question<'q, S>(
    candidates: &[Candidate],
    excluded: &[QuestionId],
    pool: &'q [Question],
    stats: &S,
) -> Option<&'q Question>
where
    S: StatsLookup + ?Sized,
{
    select_next_question_within(candidates, excluded, pool, stats, DEFAULT_SEARCH_WINDOW)
}

/// Like [`select_next_question`] with an explicit search window.
///
/// Only the first `window` non-excluded questions in pool order are scored, so
/// the result is the best question of that slice, not of the whole pool. A
/// window of zero still scores one question. Ties keep the earliest question.
/// Returns `None` only when every pool question is excluded.
pub fn select_next_question_within<'q, S>(
    candidates: &[Candidate],
    excluded: &[QuestionId],
    pool: &'q [Question],
    stats: &S,
    window: usize,
) -> Option<&'q Question>
where
    S: StatsLookup + ?Sized,
{
    let mut best: Option<(&'q Question, f64)> = None;

    for question in pool
        .iter()
        .filter(|question| !excluded.contains(&question.id))
        .take(window.max(1))
    {
        let entropy = expected_entropy(candidates, question.id, stats);
        trace!(question = question.id.0, entropy, "scored question");

        match best {
            Some((_, best_entropy)) if entropy >= best_entropy || entropy.is_nan() => {}
            _ => best = Some((question, entropy)),
        }
    }

    if let Some((question, entropy)) = best {
        debug!(
            question = question.id.0,
            entropy,
            excluded = excluded.len(),
            "selected next question"
        );
    }

    best.map(|(question, _)| question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::candidate::CandidateId;
    use crate::inference::stats::{AnswerStats, StatsTable};

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate {
                probability: 0.5,
                ..Candidate::new(1, "a", 1.0)
            },
            Candidate {
                probability: 0.5,
                ..Candidate::new(2, "b", 1.0)
            },
        ]
    }

    fn pool(n: u32) -> Vec<Question> {
        (1..=n).map(|id| Question::new(id, format!("q{id}"))).collect()
    }

    #[test]
    fn uninformative_question_has_one_bit() {
        let table = StatsTable::new();
        let entropy = expected_entropy(&candidates(), QuestionId(1), &table);
        assert!((entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn picks_question_with_lowest_entropy() {
        let mut table = StatsTable::new();
        table.insert(QuestionId(2), CandidateId(1), AnswerStats::new(19, 1));
        table.insert(QuestionId(2), CandidateId(2), AnswerStats::new(1, 19));
        table.insert(QuestionId(3), CandidateId(1), AnswerStats::new(3, 2));

        let questions = pool(3);
        let chosen = select_next_question(&candidates(), &[], &questions, &table).unwrap();
        assert_eq!(chosen.id, QuestionId(2));
    }

    #[test]
    fn ties_keep_pool_order() {
        let table = StatsTable::new();
        let questions = pool(4);
        let chosen = select_next_question(&candidates(), &[], &questions, &table).unwrap();
        assert_eq!(chosen.id, QuestionId(1));
    }

    #[test]
    fn never_returns_excluded_questions() {
        let mut table = StatsTable::new();
        table.insert(QuestionId(1), CandidateId(1), AnswerStats::new(50, 1));
        table.insert(QuestionId(1), CandidateId(2), AnswerStats::new(1, 50));
        let questions = pool(3);
        let chosen =
            select_next_question(&candidates(), &[QuestionId(1)], &questions, &table).unwrap();
        assert_ne!(chosen.id, QuestionId(1));
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let table = StatsTable::new();
        let questions = pool(2);
        assert!(
            select_next_question(
                &candidates(),
                &[QuestionId(1), QuestionId(2)],
                &questions,
                &table
            )
            .is_none()
        );
        assert!(select_next_question(&candidates(), &[], &[], &table).is_none());
    }

    #[test]
    fn zero_window_still_asks_when_questions_remain() {
        let table = StatsTable::new();
        let questions = pool(2);
        let chosen = select_next_question_within(&candidates(), &[], &questions, &table, 0);
        assert_eq!(chosen.map(|q| q.id), Some(QuestionId(1)));
        let last = select_next_question_within(
            &candidates(),
            &[QuestionId(1)],
            &questions,
            &table,
            0,
        );
        assert_eq!(last.map(|q| q.id), Some(QuestionId(2)));
    }

    #[test]
    fn search_is_limited_to_window() {
        let mut table = StatsTable::new();
        table.insert(QuestionId(3), CandidateId(1), AnswerStats::new(99, 1));
        table.insert(QuestionId(3), CandidateId(2), AnswerStats::new(1, 99));
        let questions = pool(3);

        let narrow =
            select_next_question_within(&candidates(), &[], &questions, &table, 2).unwrap();
        assert_eq!(narrow.id, QuestionId(1));

        let skipped = select_next_question_within(
            &candidates(),
            &[QuestionId(1)],
            &questions,
            &table,
            2,
        )
        .unwrap();
        assert_eq!(skipped.id, QuestionId(3));
    }
}
