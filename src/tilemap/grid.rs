use serde::{Deserialize, Serialize};

/// Tile index of the wall used by the built-in test map.
pub const WALL_TILE: i32 = 14;
/// Tile index of the impassable decoration used by the built-in test map.
pub const DECORATION_TILE: i32 = 25;
/// Tile index of plain floor in the tiny-dungeon tileset.
pub const FLOOR_TILE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("tile grid has no cells")]
    Empty,
    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
}

/// Rectangular grid of tile indices, stored row-major.
///
/// Negative indices are valid cells and mean "nothing drawn here".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i32>>", into = "Vec<Vec<i32>>")]
pub struct TileGrid {
    width: usize,
    height: usize,
    cells: Vec<i32>,
}

impl TileGrid {
    /// Build a grid from rows. Every row must have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, GridError> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(GridError::Empty);
        }
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for (row, tiles) in rows.into_iter().enumerate() {
            if tiles.len() != width {
                return Err(GridError::Ragged { row, expected: width, found: tiles.len() });
            }
            cells.extend(tiles);
        }
        Ok(Self { width, height, cells })
    }

    /// A `width × height` grid with every cell set to `tile`.
    pub fn filled(width: usize, height: usize, tile: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self { width, height, cells: vec![tile; width * height] }
    }

    /// `fill` everywhere except a one-tile border of `border`.
    pub fn bordered(width: usize, height: usize, fill: i32, border: i32) -> Self {
        let mut grid = Self::filled(width, height, fill);
        for y in 0..grid.height {
            for x in 0..grid.width {
                if x == 0 || y == 0 || x == grid.width - 1 || y == grid.height - 1 {
                    grid.cells[y * grid.width + x] = border;
                }
            }
        }
        grid
    }

    /// Fixed test pattern shown before any quest arrives: walls around the
    /// edge, a diagonal stripe of decorations, floor elsewhere.
    pub fn test_pattern(width: usize, height: usize) -> Self {
        let mut grid = Self::bordered(width, height, FLOOR_TILE, WALL_TILE);
        for y in 1..grid.height.saturating_sub(1) {
            for x in 1..grid.width.saturating_sub(1) {
                if (x + y) % 5 == 0 {
                    grid.cells[y * grid.width + x] = DECORATION_TILE;
                }
            }
        }
        grid
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Tile index at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: i32, y: i32) -> Option<i32> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.cells[y as usize * self.width + x as usize])
    }

    pub fn set(&mut self, x: i32, y: i32, tile: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.cells[y as usize * self.width + x as usize] = tile;
        true
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i32]> {
        self.cells.chunks(self.width)
    }

    /// `(x, y, tile)` for every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, i32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &tile)| (i % self.width, i / self.width, tile))
    }
}

impl TryFrom<Vec<Vec<i32>>> for TileGrid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<i32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<TileGrid> for Vec<Vec<i32>> {
    fn from(grid: TileGrid) -> Self {
        grid.rows().map(<[i32]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_has_wall_border() {
        let grid = TileGrid::test_pattern(50, 37);
        assert_eq!(grid.width(), 50);
        assert_eq!(grid.height(), 37);
        assert_eq!(grid.get(0, 0), Some(WALL_TILE));
        assert_eq!(grid.get(49, 36), Some(WALL_TILE));
        assert_eq!(grid.get(2, 3), Some(DECORATION_TILE));
        assert_eq!(grid.get(5, 5), Some(DECORATION_TILE));
        assert_eq!(grid.get(5, 6), Some(FLOOR_TILE));
    }

    #[test]
    fn serde_round_trips_as_nested_arrays() {
        let grid: TileGrid = serde_json::from_str("[[1,2],[3,4]]").unwrap();
        assert_eq!(grid.get(1, 1), Some(4));
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[[1,2],[3,4]]");
    }
}
