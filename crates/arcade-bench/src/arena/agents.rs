use arcade_core::board::{Direction, Grid, slide};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// What a move agent sees before each decision.
pub struct MoveContext<'a> {
    pub grid: &'a Grid,
    /// Directions that change the grid; never empty when an agent is asked.
    pub legal: &'a [Direction],
    pub score: u64,
    pub moves: u32,
}

/// Interface for puzzle-playing agents.
pub trait MoveAgent: Send {
    /// Pick one of `ctx.legal`, or `None` to resign.
    fn choose_move(&mut self, ctx: &MoveContext) -> Option<Direction>;
}

/// Uniformly random legal move.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl MoveAgent for RandomAgent {
    fn choose_move(&mut self, ctx: &MoveContext) -> Option<Direction> {
        ctx.legal.choose(&mut self.rng).copied()
    }
}

/// One-ply lookahead: merge score plus a bonus per empty cell left behind.
pub struct GreedyAgent {
    empty_weight: f64,
}

impl GreedyAgent {
    pub fn new(empty_weight: f64) -> Self {
        Self { empty_weight }
    }
}

impl MoveAgent for GreedyAgent {
    fn choose_move(&mut self, ctx: &MoveContext) -> Option<Direction> {
        let mut best: Option<(Direction, f64)> = None;
        for &direction in ctx.legal {
            let (next, gained) = slide(ctx.grid, direction);
            let value = gained as f64 + self.empty_weight * next.empty_cells().len() as f64;
            // First direction wins ties so the agent stays deterministic.
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((direction, value));
            }
        }
        best.map(|(direction, _)| direction)
    }
}

/// Fixed preference order; the classic "keep the big tile in a corner" play.
pub struct CornerAgent {
    order: Vec<Direction>,
}

impl CornerAgent {
    pub const DEFAULT_ORDER: [Direction; 4] = [
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Up,
    ];

    pub fn new(order: Vec<Direction>) -> Self {
        Self { order }
    }
}

impl Default for CornerAgent {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ORDER.to_vec())
    }
}

impl MoveAgent for CornerAgent {
    fn choose_move(&mut self, ctx: &MoveContext) -> Option<Direction> {
        self.order
            .iter()
            .copied()
            .find(|direction| ctx.legal.contains(direction))
            .or_else(|| ctx.legal.first().copied())
    }
}
