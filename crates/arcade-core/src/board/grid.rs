use super::BoardError;
use core::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Side length of the square board.
pub const GRID_SIZE: usize = 4;

/// Largest tile a board may hold; a pair of these no longer merges.
pub const MAX_TILE: u32 = 1 << 30;

/// Probability that a spawned tile is a 2 rather than a 4.
pub const TWO_TILE_PROBABILITY: f64 = 0.9;

/// A 4x4 board of tiles. Every cell is either `0` (empty) or a power of two
/// between 2 and [`MAX_TILE`].
///
/// Serialized as nested row arrays so stored boards stay readable, e.g.
/// `[[2,0,0,0],[0,0,0,0],[0,0,4,0],[0,0,0,0]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct Grid {
    cells: [[u32; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    pub const fn empty() -> Self {
        Self {
            cells: [[0; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Builds a grid from a fixed-size array, validating tile values.
    pub fn new(cells: [[u32; GRID_SIZE]; GRID_SIZE]) -> Result<Self, BoardError> {
        for (row, values) in cells.iter().enumerate() {
            for (col, value) in values.iter().copied().enumerate() {
                if !is_valid_tile(value) {
                    return Err(BoardError::InvalidTile { row, col, value });
                }
            }
        }
        Ok(Self { cells })
    }

    /// Builds a grid from caller-supplied rows (e.g. a decoded JSON board).
    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self, BoardError> {
        if rows.len() != GRID_SIZE || rows.iter().any(|row| row.len() != GRID_SIZE) {
            return Err(BoardError::Shape {
                rows: rows.len(),
                cols: rows
                    .iter()
                    .map(Vec::len)
                    .find(|len| *len != GRID_SIZE)
                    .unwrap_or(GRID_SIZE),
            });
        }

        let mut cells = [[0; GRID_SIZE]; GRID_SIZE];
        for (target, source) in cells.iter_mut().zip(rows) {
            target.copy_from_slice(source);
        }
        Self::new(cells)
    }

    pub fn rows(&self) -> &[[u32; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row][col]
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [u32; GRID_SIZE] {
        &mut self.cells[row]
    }

    /// Coordinates of empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(GRID_SIZE * GRID_SIZE);
        for (row, values) in self.cells.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if *value == 0 {
                    cells.push((row, col));
                }
            }
        }
        cells
    }

    pub fn has_empty_cell(&self) -> bool {
        self.cells.iter().flatten().any(|value| *value == 0)
    }

    pub fn tile_sum(&self) -> u64 {
        self.cells.iter().flatten().map(|value| u64::from(*value)).sum()
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Rotates clockwise by 90 degrees `times` times: `new[r][c] = old[N-1-c][r]`.
    pub fn rotated(&self, times: u8) -> Self {
        let mut current = self.cells;
        for _ in 0..times % 4 {
            let mut next = [[0; GRID_SIZE]; GRID_SIZE];
            for (r, row) in next.iter_mut().enumerate() {
                for (c, cell) in row.iter_mut().enumerate() {
                    *cell = current[GRID_SIZE - 1 - c][r];
                }
            }
            current = next;
        }
        Self { cells: current }
    }

    /// True iff the board is full and no horizontal or vertical neighbours match.
    pub fn is_terminal(&self) -> bool {
        if self.has_empty_cell() {
            return false;
        }

        for r in 0..GRID_SIZE {
            for c in 0..GRID_SIZE {
                let value = self.cells[r][c];
                if c + 1 < GRID_SIZE && can_merge(value, self.cells[r][c + 1]) {
                    return false;
                }
                if r + 1 < GRID_SIZE && can_merge(value, self.cells[r + 1][c]) {
                    return false;
                }
            }
        }
        true
    }

    /// Places a 2 (90%) or 4 (10%) on a uniformly chosen empty cell.
    ///
    /// Draws exactly one cell index and one tile value from `rng`, or nothing
    /// when the board is full. Returns the placed `(row, col, value)`.
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(usize, usize, u32)> {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return None;
        }

        let (row, col) = empty[rng.gen_range(0..empty.len())];
        let value = if rng.gen_bool(TWO_TILE_PROBABILITY) {
            2
        } else {
            4
        };
        self.cells[row][col] = value;
        Some((row, col, value))
    }
}

fn is_valid_tile(value: u32) -> bool {
    value == 0 || ((2..=MAX_TILE).contains(&value) && value.is_power_of_two())
}

/// Two non-empty tiles merge when equal and below the cap.
pub(crate) fn can_merge(a: u32, b: u32) -> bool {
    a != 0 && a == b && a < MAX_TILE
}

impl TryFrom<Vec<Vec<u32>>> for Grid {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<u32>>) -> Result<Self, Self::Error> {
        Grid::from_rows(&rows)
    }
}

impl From<Grid> for Vec<Vec<u32>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, row) in self.cells.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            let line = row
                .iter()
                .map(|value| format!("{value:>5}"))
                .collect::<Vec<_>>()
                .join("");
            f.write_str(&line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn rotation_matches_clockwise_definition() {
        let grid = Grid::new([[2, 4, 8, 16], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 32]]).unwrap();
        let rotated = grid.rotated(1);
        assert_eq!(rotated.rows()[0], [0, 0, 0, 2]);
        assert_eq!(rotated.rows()[3], [32, 0, 0, 16]);
        assert_eq!(grid.rotated(4), grid);
        assert_eq!(grid.rotated(1).rotated(3), grid);
    }

    #[test]
    fn rejects_non_power_of_two_tiles() {
        let err = Grid::new([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap_err();
        assert_eq!(
            err,
            BoardError::InvalidTile {
                row: 0,
                col: 0,
                value: 3
            }
        );
        assert!(Grid::new([[1, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_err());
    }

    #[test]
    fn rejects_tiles_above_the_cap() {
        assert!(Grid::new([[MAX_TILE, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_ok());
        assert_eq!(
            Grid::new([[1 << 31, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap_err(),
            BoardError::InvalidTile {
                row: 0,
                col: 0,
                value: 1 << 31
            }
        );
    }

    #[test]
    fn capped_neighbours_leave_board_terminal() {
        let m = MAX_TILE;
        let capped = Grid::new([[m, m, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        assert!(capped.is_terminal());
    }

    #[test]
    fn rejects_wrong_shape() {
        let rows = vec![vec![0; 4]; 3];
        assert!(matches!(
            Grid::from_rows(&rows),
            Err(BoardError::Shape { rows: 3, .. })
        ));
        let ragged = vec![vec![0; 4], vec![0; 4], vec![0; 5], vec![0; 4]];
        assert!(matches!(
            Grid::from_rows(&ragged),
            Err(BoardError::Shape { rows: 4, cols: 5 })
        ));
    }

    #[test]
    fn terminal_requires_full_board_without_pairs() {
        let locked =
            Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        assert!(locked.is_terminal());

        let vertical_pair =
            Grid::new([[2, 4, 2, 4], [2, 8, 4, 2], [8, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        assert!(!vertical_pair.is_terminal());

        let with_gap = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 0]]).unwrap();
        assert!(!with_gap.is_terminal());
        assert!(!Grid::empty().is_terminal());
    }

    #[test]
    fn spawn_fills_one_empty_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = Grid::empty();
        let (row, col, value) = grid.spawn_tile(&mut rng).expect("board has room");
        assert!(value == 2 || value == 4);
        assert_eq!(grid.get(row, col), value);
        assert_eq!(grid.empty_cells().len(), 15);
    }

    #[test]
    fn spawn_on_full_board_is_noop() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid =
            Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        let before = grid;
        assert!(grid.spawn_tile(&mut rng).is_none());
        assert_eq!(grid, before);
    }

    #[test]
    fn serde_uses_nested_rows_and_validates() {
        let grid = Grid::new([[2, 0, 0, 0], [0; 4], [0, 0, 4, 0], [0; 4]]).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, "[[2,0,0,0],[0,0,0,0],[0,0,4,0],[0,0,0,0]]");
        let decoded: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, grid);

        assert!(serde_json::from_str::<Grid>("[[2,0,0],[0,0,0,0],[0,0,0,0],[0,0,0,0]]").is_err());
        assert!(serde_json::from_str::<Grid>("[[6,0,0,0],[0,0,0,0],[0,0,0,0],[0,0,0,0]]").is_err());
    }
}
