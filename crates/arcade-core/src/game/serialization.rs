use super::GameError;
use super::guess::{GuessOutcome, GuessRound};
use super::puzzle::{PuzzleSession, PuzzleStatus};
use crate::board::Grid;
use crate::inference::{Candidate, InferenceEngine, QuestionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PuzzleSnapshot {
    pub seed: u64,
    pub grid: Grid,
    pub score: u64,
    #[serde(default)]
    pub moves: u32,
    pub status: PuzzleStatus,
}

impl PuzzleSnapshot {
    pub fn capture(session: &PuzzleSession) -> Self {
        PuzzleSnapshot {
            seed: session.seed(),
            grid: *session.grid(),
            score: session.score(),
            moves: session.moves(),
            status: session.status(),
        }
    }

    /// Rebuilds the session; the status is recomputed from the grid.
    pub fn restore(self) -> PuzzleSession {
        PuzzleSession::resume(self.grid, self.score, self.moves, self.seed)
    }

    pub fn to_json(session: &PuzzleSession) -> serde_json::Result<String> {
        let snapshot = Self::capture(session);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuessSnapshot {
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub asked_questions: Vec<QuestionId>,
    #[serde(default)]
    pub pending_question: Option<QuestionId>,
    #[serde(default)]
    pub outcome: Option<GuessOutcome>,
}

impl GuessSnapshot {
    pub fn capture(round: &GuessRound) -> Self {
        GuessSnapshot {
            candidates: round.candidates().to_vec(),
            asked_questions: round.asked().to_vec(),
            pending_question: round.pending(),
            outcome: round.outcome().copied(),
        }
    }

    pub fn restore(self, engine: InferenceEngine) -> Result<GuessRound, GameError> {
        GuessRound::restore(
            engine,
            self.candidates,
            self.asked_questions,
            self.pending_question,
            self.outcome,
        )
    }

    pub fn to_json(round: &GuessRound) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(round))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction;
    use crate::inference::{Answer, Question, StatsTable};

    #[test]
    fn puzzle_snapshot_serializes_to_json() {
        let session = PuzzleSession::with_seed(99);
        let json = PuzzleSnapshot::to_json(&session).unwrap();
        assert!(json.contains("\"seed\": 99"));
        assert!(json.contains("\"status\": \"active\""));
        assert!(json.contains("\"grid\""));
    }

    #[test]
    fn puzzle_snapshot_roundtrip_keeps_board_and_score() {
        let mut session = PuzzleSession::with_seed(123);
        for direction in [Direction::Left, Direction::Down, Direction::Right] {
            session.apply(direction).unwrap();
        }
        let json = PuzzleSnapshot::to_json(&session).unwrap();
        let restored = PuzzleSnapshot::from_json(&json).unwrap().restore();
        assert_eq!(restored.grid(), session.grid());
        assert_eq!(restored.score(), session.score());
        assert_eq!(restored.moves(), session.moves());
        assert_eq!(restored.seed(), 123);
    }

    #[test]
    fn puzzle_snapshot_rejects_invalid_board() {
        let legacy = r#"{
            "seed": 7,
            "grid": [[3,0,0,0],[0,0,0,0],[0,0,0,0],[0,0,0,0]],
            "score": 0,
            "status": "active"
        }"#;
        assert!(PuzzleSnapshot::from_json(legacy).is_err());
    }

    #[test]
    fn guess_snapshot_roundtrip_preserves_progress() {
        let candidates = vec![Candidate::new(1, "a", 3.0), Candidate::new(2, "b", 1.0)];
        let pool = vec![Question::new(1, "q1"), Question::new(2, "q2")];
        let table = StatsTable::new();
        let engine = InferenceEngine::default();

        let mut round = GuessRound::start(&candidates, engine).unwrap();
        round.next_step(&pool, &table).unwrap();
        round.answer(Answer::Yes, &pool, &table).unwrap();

        let json = GuessSnapshot::to_json(&round).unwrap();
        assert!(json.contains("\"asked_questions\""));
        let restored = GuessSnapshot::from_json(&json)
            .unwrap()
            .restore(engine)
            .unwrap();
        assert_eq!(restored.asked(), round.asked());
        assert_eq!(restored.pending(), round.pending());
        assert_eq!(restored.candidates(), round.candidates());
    }

    #[test]
    fn guess_snapshot_requires_candidates() {
        let snapshot = GuessSnapshot::from_json(r#"{"candidates": []}"#).unwrap();
        assert!(snapshot.restore(InferenceEngine::default()).is_err());
    }
}
