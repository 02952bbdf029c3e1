//! Round-level state an orchestrator keeps between engine calls.

pub mod guess;
pub mod puzzle;
pub mod serialization;

pub use guess::{GuessOutcome, GuessRound, RoundStep};
pub use puzzle::{PuzzleSession, PuzzleStatus};
pub use serialization::{GuessSnapshot, PuzzleSnapshot};

use crate::board::BoardError;
use crate::inference::{InferenceError, QuestionId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("game is over")]
    GameOver,
    #[error("round already ended with a guess")]
    RoundFinished,
    #[error("no question is waiting for an answer")]
    NoPendingQuestion,
    #[error("question {0} is still waiting for an answer")]
    AwaitingAnswer(QuestionId),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
