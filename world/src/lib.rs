#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static world layout for Hearthvale: tile walkability plus placed objects.
//!
//! The [`GridMap`] is the leaf every other system reads. It owns the
//! per-tile [`GridCell`] values and the registry of world objects (banks and
//! resource nodes) placed on top of them. Pathfinding over the grid lives in
//! [`navigation`].

use std::collections::BTreeMap;

use hearthvale_core::{NodeKind, Tile};
use thiserror::Error;

pub mod navigation;

/// Content of a single tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GridCell {
    /// Open ground.
    #[default]
    Walkable,
    /// Scenery or an object that cannot be entered.
    Blocked,
    /// Bank booth; cannot be entered but can be interacted with from a neighbor.
    Bank,
}

impl GridCell {
    /// Whether a character may stand on the cell.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Walkable)
    }

    fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Self::Walkable),
            '#' => Some(Self::Blocked),
            'B' => Some(Self::Bank),
            _ => None,
        }
    }
}

/// Object placed onto the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldObject {
    /// Bank booth.
    Bank,
    /// Harvestable resource node of the given kind.
    ResourceNode(NodeKind),
}

/// Reasons a grid layout could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridParseError {
    /// The layout contained no rows or no columns.
    #[error("grid layout is empty")]
    Empty,
    /// A row had a different width than the first row.
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A character did not describe a known cell.
    #[error("unknown glyph {glyph:?} at ({column}, {row})")]
    UnknownGlyph {
        /// The offending character.
        glyph: char,
        /// Column of the character.
        column: usize,
        /// Row of the character.
        row: usize,
    },
}

/// Reasons an object placement may be rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum PlacementError {
    /// The tile lies outside the grid.
    #[error("tile lies outside the world")]
    OutOfBounds,
    /// Another object already occupies the tile.
    #[error("tile already holds an object")]
    Occupied,
}

/// Per-tile walkability plus the registry of placed world objects.
#[derive(Clone, Debug)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    cells: Vec<GridCell>,
    objects: BTreeMap<Tile, WorldObject>,
}

impl GridMap {
    /// Creates a grid where every tile is walkable.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![GridCell::Walkable; capacity],
            objects: BTreeMap::new(),
        }
    }

    /// Parses an ASCII layout: `.` walkable, `#` blocked, `B` bank booth.
    ///
    /// Bank glyphs are registered as [`WorldObject::Bank`] as well.
    pub fn from_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridParseError> {
        let expected = rows.first().map_or(0, |row| row.as_ref().chars().count());
        if expected == 0 {
            return Err(GridParseError::Empty);
        }

        let mut cells = Vec::with_capacity(expected * rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != expected {
                return Err(GridParseError::RaggedRow {
                    row: row_index,
                    expected,
                    found,
                });
            }

            for (column, glyph) in row.chars().enumerate() {
                let cell = GridCell::from_glyph(glyph).ok_or(GridParseError::UnknownGlyph {
                    glyph,
                    column,
                    row: row_index,
                })?;
                cells.push(cell);
            }
        }

        let columns = u32::try_from(expected).map_err(|_| GridParseError::Empty)?;
        let row_count = u32::try_from(rows.len()).map_err(|_| GridParseError::Empty)?;
        let mut objects = BTreeMap::new();
        for (index, cell) in cells.iter().enumerate() {
            if *cell == GridCell::Bank {
                let index = u32::try_from(index).map_err(|_| GridParseError::Empty)?;
                let _ = objects.insert(
                    Tile::new(index % columns, index / columns),
                    WorldObject::Bank,
                );
            }
        }

        Ok(Self {
            columns,
            rows: row_count,
            cells,
            objects,
        })
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the tile lies within the grid.
    #[must_use]
    pub const fn contains(&self, tile: Tile) -> bool {
        tile.x() < self.columns && tile.y() < self.rows
    }

    /// Cell stored for the tile, if it lies within the grid.
    #[must_use]
    pub fn cell(&self, tile: Tile) -> Option<GridCell> {
        self.index(tile)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Whether a character may stand on the tile. Out-of-bounds tiles are not walkable.
    #[must_use]
    pub fn is_walkable(&self, tile: Tile) -> bool {
        self.cell(tile).is_some_and(GridCell::is_walkable)
    }

    /// Overwrites a single cell. Returns `false` when the tile is out of bounds.
    pub fn set_cell(&mut self, tile: Tile, cell: GridCell) -> bool {
        let Some(index) = self.index(tile) else {
            return false;
        };
        self.cells[index] = cell;
        true
    }

    /// Places an object onto the grid, blocking its tile.
    pub fn place_object(&mut self, tile: Tile, object: WorldObject) -> Result<(), PlacementError> {
        if !self.contains(tile) {
            return Err(PlacementError::OutOfBounds);
        }
        if self.objects.contains_key(&tile) {
            return Err(PlacementError::Occupied);
        }

        let cell = match object {
            WorldObject::Bank => GridCell::Bank,
            WorldObject::ResourceNode(_) => GridCell::Blocked,
        };
        let _ = self.set_cell(tile, cell);
        let _ = self.objects.insert(tile, object);
        Ok(())
    }

    /// Object placed on the tile, if any.
    #[must_use]
    pub fn object_at(&self, tile: Tile) -> Option<&WorldObject> {
        self.objects.get(&tile)
    }

    /// Iterator over every placed object in row-major tile order.
    pub fn objects(&self) -> impl Iterator<Item = (Tile, &WorldObject)> {
        self.objects.iter().map(|(tile, object)| (*tile, object))
    }

    /// Tiles holding bank booths.
    pub fn banks(&self) -> impl Iterator<Item = Tile> + '_ {
        self.objects()
            .filter(|(_, object)| matches!(object, WorldObject::Bank))
            .map(|(tile, _)| tile)
    }

    /// Reports whether the tile touches a bank booth (including diagonally).
    #[must_use]
    pub fn is_next_to_bank(&self, tile: Tile) -> bool {
        self.banks()
            .any(|bank| bank != tile && bank.chebyshev_distance(tile) <= 1)
    }

    pub(crate) fn index(&self, tile: Tile) -> Option<usize> {
        if !self.contains(tile) {
            return None;
        }
        let row = usize::try_from(tile.y()).ok()?;
        let column = usize::try_from(tile.x()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ascii_layout() {
        let grid = GridMap::from_ascii(&["..#", ".B.", "..."]).expect("valid layout");

        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cell(Tile::new(2, 0)), Some(GridCell::Blocked));
        assert_eq!(grid.cell(Tile::new(1, 1)), Some(GridCell::Bank));
        assert_eq!(grid.object_at(Tile::new(1, 1)), Some(&WorldObject::Bank));
        assert!(grid.is_walkable(Tile::new(0, 0)));
        assert!(!grid.is_walkable(Tile::new(1, 1)));
        assert!(!grid.is_walkable(Tile::new(3, 0)));
    }

    #[test]
    fn rejects_ragged_rows_and_unknown_glyphs() {
        assert_eq!(
            GridMap::from_ascii(&["...", ".."]).expect_err("ragged"),
            GridParseError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
        assert_eq!(
            GridMap::from_ascii(&[".x"]).expect_err("glyph"),
            GridParseError::UnknownGlyph {
                glyph: 'x',
                column: 1,
                row: 0
            }
        );
        assert_eq!(
            GridMap::from_ascii::<&str>(&[]).expect_err("empty"),
            GridParseError::Empty
        );
    }

    #[test]
    fn placing_a_node_blocks_its_tile() {
        let mut grid = GridMap::new(4, 4);
        let tile = Tile::new(2, 2);

        grid.place_object(tile, WorldObject::ResourceNode(NodeKind::new("tree")))
            .expect("placement");

        assert!(!grid.is_walkable(tile));
        assert_eq!(
            grid.place_object(tile, WorldObject::Bank),
            Err(PlacementError::Occupied)
        );
        assert_eq!(
            grid.place_object(Tile::new(4, 0), WorldObject::Bank),
            Err(PlacementError::OutOfBounds)
        );
    }

    #[test]
    fn bank_adjacency_includes_diagonals() {
        let grid = GridMap::from_ascii(&["....", ".B..", "...."]).expect("layout");

        assert!(grid.is_next_to_bank(Tile::new(0, 0)));
        assert!(grid.is_next_to_bank(Tile::new(2, 2)));
        assert!(!grid.is_next_to_bank(Tile::new(3, 1)));
        assert!(!grid.is_next_to_bank(Tile::new(1, 1)));
    }
}
