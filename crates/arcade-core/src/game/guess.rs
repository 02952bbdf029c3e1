use super::GameError;
use crate::inference::{
    Answer, Candidate, CandidateId, Decision, GuessReason, InferenceEngine, Question, QuestionId,
    StatsLookup, top_candidate,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the round wants from the player next.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundStep {
    Ask(Question),
    Guess {
        candidate: Candidate,
        reason: GuessReason,
    },
}

/// Final guess recorded when a round ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuessOutcome {
    pub candidate: CandidateId,
    pub probability: f64,
    pub reason: GuessReason,
}

/// One guessing round: the live distribution and the questions asked so far.
#[derive(Debug, Clone)]
pub struct GuessRound {
    engine: InferenceEngine,
    candidates: Vec<Candidate>,
    asked: Vec<QuestionId>,
    pending: Option<QuestionId>,
    outcome: Option<GuessOutcome>,
}

impl GuessRound {
    /// Starts a round with popularity-based odds.
    pub fn start(candidates: &[Candidate], engine: InferenceEngine) -> Result<Self, GameError> {
        let candidates = engine.initialize(candidates)?;
        Ok(Self {
            engine,
            candidates,
            asked: Vec::new(),
            pending: None,
            outcome: None,
        })
    }

    /// Rebuilds a round from stored parts without touching the distribution.
    pub fn restore(
        engine: InferenceEngine,
        candidates: Vec<Candidate>,
        asked: Vec<QuestionId>,
        pending: Option<QuestionId>,
        outcome: Option<GuessOutcome>,
    ) -> Result<Self, GameError> {
        if candidates.is_empty() {
            return Err(crate::inference::InferenceError::EmptyCandidates.into());
        }
        Ok(Self {
            engine,
            candidates,
            asked,
            pending,
            outcome,
        })
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Question ids already answered, in the order they were asked.
    pub fn asked(&self) -> &[QuestionId] {
        &self.asked
    }

    pub fn pending(&self) -> Option<QuestionId> {
        self.pending
    }

    pub fn outcome(&self) -> Option<&GuessOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn leader(&self) -> Option<&Candidate> {
        top_candidate(&self.candidates)
    }

    /// Either guesses now or picks the next question to ask.
    pub fn next_step<S>(&mut self, pool: &[Question], stats: &S) -> Result<RoundStep, GameError>
    where
        S: StatsLookup + ?Sized,
    {
        if self.is_finished() {
            return Err(GameError::RoundFinished);
        }
        if let Some(pending) = self.pending {
            return Err(GameError::AwaitingAnswer(pending));
        }

        let (leader, reason) = match self.engine.decide(&self.candidates, self.asked.len())? {
            Decision::Guess { candidate, reason } => (candidate.clone(), reason),
            Decision::Ask => {
                match self
                    .engine
                    .select(&self.candidates, &self.asked, pool, stats)
                {
                    Some(question) => {
                        self.pending = Some(question.id);
                        return Ok(RoundStep::Ask(question.clone()));
                    }
                    None => {
                        let leader = self.leader().cloned().ok_or(GameError::RoundFinished)?;
                        (leader, GuessReason::PoolExhausted)
                    }
                }
            }
        };

        debug!(
            candidate = leader.id.0,
            probability = leader.probability,
            asked = self.asked.len(),
            reason = reason.as_str(),
            "guessing"
        );
        self.outcome = Some(GuessOutcome {
            candidate: leader.id,
            probability: leader.probability,
            reason,
        });
        Ok(RoundStep::Guess {
            candidate: leader,
            reason,
        })
    }

    /// Applies the player's answer to the pending question, then moves on.
    pub fn answer<S>(
        &mut self,
        answer: Answer,
        pool: &[Question],
        stats: &S,
    ) -> Result<RoundStep, GameError>
    where
        S: StatsLookup + ?Sized,
    {
        if self.is_finished() {
            return Err(GameError::RoundFinished);
        }
        let question = self.pending.ok_or(GameError::NoPendingQuestion)?;

        self.candidates = self
            .engine
            .update(&self.candidates, question, answer, stats)?;
        self.pending = None;
        self.asked.push(question);

        self.next_step(pool, stats)
    }
}
