//! Sliding-merge puzzle engine over a 4x4 grid.
//!
//! - `grid`: the board, rotation, terminal detection and tile spawning.
//! - `direction`: the four move directions and their rotation offsets.
//! - `slide`: the "always slide left" move transition and its result.

mod direction;
mod grid;
mod slide;

pub use direction::Direction;
pub use grid::{GRID_SIZE, Grid, MAX_TILE, TWO_TILE_PROBABILITY};
pub use slide::{
    MoveResult, apply_move, apply_move_with_rng, legal_directions, new_game, slide, slide_row,
};

use thiserror::Error;

/// Invalid board input supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("grid must be 4x4 but found {rows} rows (offending width {cols})")]
    Shape { rows: usize, cols: usize },
    #[error("cell ({row}, {col}) holds {value}, expected 0 or a power of two in 2..=2^30")]
    InvalidTile { row: usize, col: usize, value: u32 },
    #[error("unknown direction '{0}', expected UP, DOWN, LEFT or RIGHT")]
    UnknownDirection(String),
}

/// Convenience wrapper mirroring [`Grid::is_terminal`].
pub fn is_terminal(grid: &Grid) -> bool {
    grid.is_terminal()
}
