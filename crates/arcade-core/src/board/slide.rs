use super::direction::Direction;
use super::grid::{GRID_SIZE, Grid, can_merge};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of a single directional move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    pub grid: Grid,
    /// Sum of every tile produced by a merge during this move.
    pub score_delta: u64,
    /// False iff the slide left every cell untouched (no tile is spawned then).
    pub moved: bool,
}

/// Compacts a row toward index 0 and merges equal neighbours pairwise.
///
/// Pairs are formed left to right over the compacted values and never overlap,
/// so `[2, 2, 2, 2]` becomes `[4, 4, 0, 0]`. Two [`MAX_TILE`](super::MAX_TILE)
/// tiles slide but never merge.
pub fn slide_row(row: [u32; GRID_SIZE]) -> ([u32; GRID_SIZE], u64) {
    let mut compacted = [0u32; GRID_SIZE];
    let mut len = 0;
    for value in row.into_iter().filter(|value| *value != 0) {
        compacted[len] = value;
        len += 1;
    }

    let mut out = [0u32; GRID_SIZE];
    let mut gained = 0u64;
    let mut write = 0;
    let mut idx = 0;
    while idx < len {
        let value = compacted[idx];
        if idx + 1 < len && can_merge(value, compacted[idx + 1]) {
            let merged = value << 1;
            out[write] = merged;
            gained += u64::from(merged);
            idx += 2;
        } else {
            out[write] = value;
            idx += 1;
        }
        write += 1;
    }

    (out, gained)
}

/// Slides the board without spawning; returns the new grid and merge score.
pub fn slide(grid: &Grid, direction: Direction) -> (Grid, u64) {
    let mut normalized = grid.rotated(direction.quarter_turns());
    let mut gained = 0u64;
    for r in 0..GRID_SIZE {
        let row = normalized.row_mut(r);
        let (slid, score) = slide_row(*row);
        *row = slid;
        gained += score;
    }
    (normalized.rotated(direction.inverse_turns()), gained)
}

/// Applies `direction` using the thread-local RNG for the spawned tile.
pub fn apply_move(grid: &Grid, direction: Direction) -> MoveResult {
    apply_move_with_rng(grid, direction, &mut rand::thread_rng())
}

/// Applies `direction` and, when the board changed, spawns one tile from `rng`.
///
/// A no-op move returns the input grid and leaves `rng` untouched.
pub fn apply_move_with_rng<R: Rng + ?Sized>(
    grid: &Grid,
    direction: Direction,
    rng: &mut R,
) -> MoveResult {
    let (mut next, gained) = slide(grid, direction);
    if next == *grid {
        return MoveResult {
            grid: *grid,
            score_delta: 0,
            moved: false,
        };
    }

    next.spawn_tile(rng);
    MoveResult {
        grid: next,
        score_delta: gained,
        moved: true,
    }
}

/// Directions whose slide would change the board.
pub fn legal_directions(grid: &Grid) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|direction| slide(grid, *direction).0 != *grid)
        .collect()
}

/// Fresh board with two tiles placed on distinct random cells.
pub fn new_game<R: Rng + ?Sized>(rng: &mut R) -> Grid {
    let mut grid = Grid::empty();
    grid.spawn_tile(rng);
    grid.spawn_tile(rng);
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::MAX_TILE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn single_row(row: [u32; 4]) -> Grid {
        Grid::new([row, [0; 4], [0; 4], [0; 4]]).unwrap()
    }

    #[test]
    fn four_equal_tiles_merge_pairwise() {
        assert_eq!(slide_row([2, 2, 2, 2]), ([4, 4, 0, 0], 8));
    }

    #[test]
    fn merges_near_the_cap_stay_in_range() {
        let big = MAX_TILE >> 1;
        assert_eq!(
            slide_row([big; 4]),
            ([MAX_TILE, MAX_TILE, 0, 0], 2 * u64::from(MAX_TILE))
        );
        assert_eq!(
            slide_row([MAX_TILE, MAX_TILE, 0, 0]),
            ([MAX_TILE, MAX_TILE, 0, 0], 0)
        );
    }

    #[test]
    fn full_board_of_large_merges_scores_past_u32() {
        let big = MAX_TILE >> 1;
        let grid = Grid::new([[big; 4]; 4]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let result = apply_move_with_rng(&grid, Direction::Left, &mut rng);
        assert!(result.moved);
        assert_eq!(result.score_delta, 8 * u64::from(MAX_TILE));
        assert_eq!(result.grid.max_tile(), MAX_TILE);
        assert!(Grid::from_rows(&result.grid.to_rows()).is_ok());
    }

    #[test]
    fn capped_pair_is_not_a_legal_move() {
        let grid = single_row([MAX_TILE, MAX_TILE, 0, 0]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!apply_move_with_rng(&grid, Direction::Left, &mut rng).moved);
        assert!(!legal_directions(&grid).contains(&Direction::Left));
    }

    #[test]
    fn merged_tile_does_not_merge_again() {
        assert_eq!(slide_row([4, 2, 2, 0]), ([4, 4, 0, 0], 4));
        assert_eq!(slide_row([2, 2, 4, 0]), ([4, 4, 0, 0], 4));
    }

    #[test]
    fn compaction_precedes_merge() {
        assert_eq!(slide_row([0, 0, 2, 2]), ([4, 0, 0, 0], 4));
        assert_eq!(slide_row([2, 0, 0, 2]), ([4, 0, 0, 0], 4));
        assert_eq!(slide_row([2, 0, 4, 0]), ([2, 4, 0, 0], 0));
        assert_eq!(slide_row([8, 8, 8, 0]), ([16, 8, 0, 0], 16));
    }

    #[test]
    fn left_move_spawns_one_tile() {
        let mut rng = StdRng::seed_from_u64(11);
        let result = apply_move_with_rng(&single_row([0, 0, 2, 2]), Direction::Left, &mut rng);
        assert!(result.moved);
        assert_eq!(result.score_delta, 4);
        assert_eq!(result.grid.get(0, 0), 4);
        let spawned = result.grid.tile_sum() - 4;
        assert!(spawned == 2 || spawned == 4);
        assert_eq!(result.grid.empty_cells().len(), 14);
    }

    #[test]
    fn every_direction_slides_toward_its_edge() {
        let grid = Grid::new([[0; 4], [0, 2, 0, 0], [0; 4], [0; 4]]).unwrap();
        assert_eq!(slide(&grid, Direction::Up).0.get(0, 1), 2);
        assert_eq!(slide(&grid, Direction::Down).0.get(3, 1), 2);
        assert_eq!(slide(&grid, Direction::Left).0.get(1, 0), 2);
        assert_eq!(slide(&grid, Direction::Right).0.get(1, 3), 2);
    }

    #[test]
    fn vertical_moves_merge_columns() {
        let grid = Grid::new([[2, 0, 0, 0], [2, 0, 0, 0], [4, 0, 0, 0], [4, 0, 0, 0]]).unwrap();
        let (up, gained) = slide(&grid, Direction::Up);
        assert_eq!(gained, 12);
        assert_eq!(up.get(0, 0), 4);
        assert_eq!(up.get(1, 0), 8);
        assert_eq!(up.get(2, 0), 0);

        let (down, _) = slide(&grid, Direction::Down);
        assert_eq!(down.get(3, 0), 8);
        assert_eq!(down.get(2, 0), 4);
    }

    #[test]
    fn right_move_merges_from_the_right_edge() {
        let (grid, gained) = slide(&single_row([2, 2, 2, 0]), Direction::Right);
        assert_eq!(grid.rows()[0], [0, 0, 2, 4]);
        assert_eq!(gained, 4);
    }

    #[test]
    fn noop_move_keeps_grid_and_rng() {
        let grid = single_row([2, 4, 8, 16]);
        let mut rng = StdRng::seed_from_u64(99);
        let mut untouched = StdRng::seed_from_u64(99);

        let result = apply_move_with_rng(&grid, Direction::Left, &mut rng);
        assert!(!result.moved);
        assert_eq!(result.score_delta, 0);
        assert_eq!(result.grid, grid);
        assert_eq!(rng.r#gen::<u64>(), untouched.r#gen::<u64>());
    }

    #[test]
    fn legal_directions_excludes_noops() {
        let grid = single_row([2, 4, 8, 16]);
        let legal = legal_directions(&grid);
        assert!(!legal.contains(&Direction::Left));
        assert!(!legal.contains(&Direction::Right));
        assert!(!legal.contains(&Direction::Up));
        assert!(legal.contains(&Direction::Down));
    }

    #[test]
    fn new_game_places_two_tiles() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = new_game(&mut rng);
        assert_eq!(grid.empty_cells().len(), 14);
        assert!(grid.rows().iter().flatten().all(|v| matches!(v, 0 | 2 | 4)));
    }
}
