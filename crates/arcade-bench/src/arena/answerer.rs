use arcade_core::inference::{Answer, Candidate, CandidateId, QuestionId, StatsLookup};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Plays the human side of a guessing round for a fixed secret candidate.
///
/// Answers are drawn from the same statistics the engine reads, so a perfect
/// answerer agrees with the crowd on average. `noise` flips each answer with
/// the given probability.
pub struct SimulatedAnswerer {
    secret: CandidateId,
    noise: f64,
}

impl SimulatedAnswerer {
    pub fn new(secret: CandidateId, noise: f64) -> Self {
        Self {
            secret,
            noise: noise.clamp(0.0, 1.0),
        }
    }

    pub fn secret(&self) -> CandidateId {
        self.secret
    }

    pub fn answer<R, S>(&self, question: QuestionId, stats: &S, rng: &mut R) -> Answer
    where
        R: Rng + ?Sized,
        S: StatsLookup + ?Sized,
    {
        let yes = stats
            .stats_or_prior(question, self.secret)
            .ratio(Answer::Yes);
        let honest = if rng.gen_bool(yes) {
            Answer::Yes
        } else {
            Answer::No
        };
        if self.noise > 0.0 && rng.gen_bool(self.noise) {
            honest.flipped()
        } else {
            honest
        }
    }
}

/// Draws a secret candidate with odds proportional to popularity.
///
/// Falls back to a uniform pick when no candidate has positive popularity.
pub fn draw_secret<R>(candidates: &[Candidate], rng: &mut R) -> Option<CandidateId>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return None;
    }
    let weights = candidates.iter().map(|candidate| candidate.popularity);
    let index = match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(_) => rng.gen_range(0..candidates.len()),
    };
    candidates.get(index).map(|candidate| candidate.id)
}
