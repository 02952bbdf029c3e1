use super::GameError;
use crate::board::{Direction, Grid, MoveResult, apply_move_with_rng, legal_directions, new_game};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleStatus {
    Active,
    Over,
}

impl PuzzleStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PuzzleStatus::Active => "active",
            PuzzleStatus::Over => "over",
        }
    }
}

/// One sliding-puzzle game: the board plus what the caller persists around it.
#[derive(Debug, Clone)]
pub struct PuzzleSession {
    grid: Grid,
    score: u64,
    moves: u32,
    status: PuzzleStatus,
    rng: StdRng,
    seed: u64,
}

impl PuzzleSession {
    pub fn new() -> Self {
        let seed: u64 = rand::random();
        Self::with_seed(seed)
    }

    /// Starts a game whose spawns are fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = new_game(&mut rng);
        Self {
            grid,
            score: 0,
            moves: 0,
            status: status_for(&grid),
            rng,
            seed,
        }
    }

    /// Resumes a stored game. Later spawns draw from a stream derived from
    /// `seed` and `moves`.
    pub fn resume(grid: Grid, score: u64, moves: u32, seed: u64) -> Self {
        let rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(moves)));
        Self {
            grid,
            score,
            moves,
            status: status_for(&grid),
            rng,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn status(&self) -> PuzzleStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status == PuzzleStatus::Over
    }

    pub fn legal_directions(&self) -> Vec<Direction> {
        if self.is_over() {
            return Vec::new();
        }
        legal_directions(&self.grid)
    }

    /// Plays `direction`. A move that changes nothing is returned with
    /// `moved == false` and does not count toward `moves`.
    pub fn apply(&mut self, direction: Direction) -> Result<MoveResult, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }

        let result = apply_move_with_rng(&self.grid, direction, &mut self.rng);
        if !result.moved {
            return Ok(result);
        }

        self.grid = result.grid;
        self.score += result.score_delta;
        self.moves += 1;
        self.status = status_for(&self.grid);

        if self.is_over() {
            debug!(
                seed = self.seed,
                score = self.score,
                moves = self.moves,
                max_tile = self.grid.max_tile(),
                "puzzle finished"
            );
        }

        Ok(result)
    }
}

impl Default for PuzzleSession {
    fn default() -> Self {
        Self::new()
    }
}

fn status_for(grid: &Grid) -> PuzzleStatus {
    if grid.is_terminal() {
        PuzzleStatus::Over
    } else {
        PuzzleStatus::Active
    }
}
