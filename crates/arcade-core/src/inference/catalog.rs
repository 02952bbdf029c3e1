//! Loader for the plain-text candidate/question dataset.
//!
//! The persons block is a count line followed by `name` / `popularity` line
//! pairs. The questions block is a count line followed by, per question, the
//! question text, a line of yes counts and a line of no counts (one column per
//! person, in person order). Ids are assigned from 1 in file order.

use super::candidate::{Candidate, CandidateId, Question, QuestionId};
use super::stats::{AnswerStats, StatsTable};
use thiserror::Error;

const BUILTIN_PERSONS: &str = include_str!("../../data/persons.txt");
const BUILTIN_QUESTIONS: &str = include_str!("../../data/questions.txt");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{section} line {line}: {message}")]
    Parse {
        section: &'static str,
        line: usize,
        message: String,
    },
    #[error("question {question} has {found} {kind} counts but there are {expected} candidates")]
    CountMismatch {
        question: u32,
        kind: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Candidates, questions and their answer statistics loaded together.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub candidates: Vec<Candidate>,
    pub questions: Vec<Question>,
    pub stats: StatsTable,
}

impl Catalog {
    /// The small dataset bundled with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(BUILTIN_PERSONS, BUILTIN_QUESTIONS)
    }

    pub fn parse(persons: &str, questions: &str) -> Result<Self, CatalogError> {
        let candidates = parse_persons(persons)?;
        let (questions, stats) = parse_questions(questions, &candidates)?;
        Ok(Self {
            candidates,
            questions,
            stats,
        })
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.id == id)
    }
}

struct Lines<'a> {
    section: &'static str,
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(section: &'static str, text: &'a str) -> Self {
        Self {
            section,
            inner: text.trim().lines().enumerate(),
        }
    }

    fn next_line(&mut self) -> Result<(usize, &'a str), CatalogError> {
        self.inner
            .next()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .ok_or_else(|| CatalogError::Parse {
                section: self.section,
                line: 0,
                message: "unexpected end of input".to_string(),
            })
    }

    fn error(&self, line: usize, message: impl Into<String>) -> CatalogError {
        CatalogError::Parse {
            section: self.section,
            line,
            message: message.into(),
        }
    }

    fn next_count(&mut self) -> Result<usize, CatalogError> {
        let (line, text) = self.next_line()?;
        text.parse::<usize>()
            .map_err(|_| self.error(line, format!("expected a count, found '{text}'")))
    }
}

fn parse_persons(text: &str) -> Result<Vec<Candidate>, CatalogError> {
    let mut lines = Lines::new("persons", text);
    let count = lines.next_count()?;
    let mut candidates = Vec::with_capacity(count);

    for idx in 0..count {
        let (line, name) = lines.next_line()?;
        if name.is_empty() {
            return Err(lines.error(line, "candidate name must not be empty"));
        }
        let (line, raw) = lines.next_line()?;
        let popularity = raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .ok_or_else(|| lines.error(line, format!("invalid popularity '{raw}'")))?;
        candidates.push(Candidate::new(idx as u32 + 1, name, popularity));
    }

    Ok(candidates)
}

fn parse_questions(
    text: &str,
    candidates: &[Candidate],
) -> Result<(Vec<Question>, StatsTable), CatalogError> {
    let mut lines = Lines::new("questions", text);
    let count = lines.next_count()?;
    let mut questions = Vec::with_capacity(count);
    let mut stats = StatsTable::new();

    for idx in 0..count {
        let id = idx as u32 + 1;
        let (_, question_text) = lines.next_line()?;
        let yes = parse_counts(&mut lines, id, "yes", candidates.len())?;
        let no = parse_counts(&mut lines, id, "no", candidates.len())?;

        for ((candidate, yes_count), no_count) in candidates.iter().zip(yes).zip(no) {
            stats.insert(
                QuestionId(id),
                candidate.id,
                AnswerStats::new(yes_count, no_count),
            );
        }
        questions.push(Question::new(id, question_text));
    }

    Ok((questions, stats))
}

fn parse_counts(
    lines: &mut Lines<'_>,
    question: u32,
    kind: &'static str,
    expected: usize,
) -> Result<Vec<u32>, CatalogError> {
    let (line, text) = lines.next_line()?;
    let counts = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| lines.error(line, format!("invalid {kind} count '{token}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if counts.len() != expected {
        return Err(CatalogError::CountMismatch {
            question,
            kind,
            expected,
            found: counts.len(),
        });
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::candidate::Answer;
    use crate::inference::stats::StatsLookup;

    const PERSONS: &str = "2\nAda Lovelace\n5\nCarl Gauss\n2\n";
    const QUESTIONS: &str = "1\nIs this person a programmer?\n4 1 \n1 3\n";

    #[test]
    fn parses_small_dataset() {
        let catalog = Catalog::parse(PERSONS, QUESTIONS).unwrap();
        assert_eq!(catalog.candidates.len(), 2);
        assert_eq!(catalog.candidates[1].name, "Carl Gauss");
        assert_eq!(catalog.candidates[1].popularity, 2.0);
        assert_eq!(catalog.questions[0].id, QuestionId(1));
        let stats = catalog
            .stats
            .lookup(QuestionId(1), CandidateId(1))
            .unwrap();
        assert!((stats.ratio(Answer::Yes) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_short_count_rows() {
        let err = Catalog::parse(PERSONS, "1\nq\n4\n1 3\n").unwrap_err();
        assert_eq!(
            err,
            CatalogError::CountMismatch {
                question: 1,
                kind: "yes",
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn rejects_bad_popularity() {
        let err = Catalog::parse("1\nSomeone\nlots\n", "0\n").unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Parse {
                section: "persons",
                line: 3,
                ..
            }
        ));
    }

    #[test]
    fn truncated_input_is_reported() {
        assert!(Catalog::parse("2\nOnly One\n3\n", "0\n").is_err());
    }

    #[test]
    fn builtin_dataset_is_consistent() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.candidates.len(), 15);
        assert_eq!(catalog.questions.len(), 14);
        assert_eq!(catalog.stats.len(), 15 * 14);
        assert!(catalog.candidates.iter().all(|c| c.popularity > 0.0));
    }
}
