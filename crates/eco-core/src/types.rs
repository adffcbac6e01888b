//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell coordinates on the grid, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Step one cell in `direction`, or `None` when that leaves a `rows`x`cols` grid.
    ///
    /// The grid does not wrap around.
    pub fn step(&self, direction: Direction, rows: usize, cols: usize) -> Option<Self> {
        let (dr, dc) = direction.to_delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < rows && col < cols).then_some(Self { row, col })
    }

    /// Row-major index into a grid `cols` wide.
    pub fn index(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }

    pub fn from_index(index: usize, cols: usize) -> Self {
        Self {
            row: index / cols,
            col: index % cols,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.row, self.col)
    }
}

/// Orthogonal movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Neighbour enumeration order. Move selection indexes into candidates
    /// filtered from this order, so it must not change.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// `(row, col)` offset of one step.
    pub fn to_delta(&self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }
}

/// What occupies a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Rock,
    Rabbit,
    Fox,
}

impl CellKind {
    /// Token used by the text input and report formats.
    pub fn token(&self) -> &'static str {
        match self {
            CellKind::Empty => "EMPTY",
            CellKind::Rock => "ROCK",
            CellKind::Rabbit => "RABBIT",
            CellKind::Fox => "FOX",
        }
    }

    /// Parse an object token. `EMPTY` is not a placeable object.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("ROCK") {
            Some(CellKind::Rock)
        } else if token.eq_ignore_ascii_case("RABBIT") {
            Some(CellKind::Rabbit)
        } else if token.eq_ignore_ascii_case("FOX") {
            Some(CellKind::Fox)
        } else {
            None
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The two mobile species. Each generation runs one phase per species,
/// rabbits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Rabbit,
    Fox,
}

impl Species {
    pub fn kind(&self) -> CellKind {
        match self {
            Species::Rabbit => CellKind::Rabbit,
            Species::Fox => CellKind::Fox,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Rabbit => f.write_str("rabbit"),
            Species::Fox => f.write_str("fox"),
        }
    }
}

/// Grid cell state.
///
/// `food_age` only carries meaning while `kind` is [`CellKind::Fox`]; every
/// constructor keeps it at zero for other kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub proc_age: u32,
    pub food_age: u32,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        kind: CellKind::Empty,
        proc_age: 0,
        food_age: 0,
    };

    pub const ROCK: Cell = Cell {
        kind: CellKind::Rock,
        proc_age: 0,
        food_age: 0,
    };

    pub fn rabbit(proc_age: u32) -> Self {
        Self {
            kind: CellKind::Rabbit,
            proc_age,
            food_age: 0,
        }
    }

    pub fn fox(proc_age: u32, food_age: u32) -> Self {
        Self {
            kind: CellKind::Fox,
            proc_age,
            food_age,
        }
    }

    /// A freshly placed or newborn individual of `kind`.
    pub fn newborn(kind: CellKind) -> Self {
        Self {
            kind,
            proc_age: 0,
            food_age: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == CellKind::Empty
    }

    pub fn is(&self, kind: CellKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_stays_in_bounds() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.step(Direction::North, 3, 3), None);
        assert_eq!(origin.step(Direction::West, 3, 3), None);
        assert_eq!(origin.step(Direction::East, 3, 3), Some(Position::new(0, 1)));
        assert_eq!(origin.step(Direction::South, 3, 3), Some(Position::new(1, 0)));

        let corner = Position::new(2, 2);
        assert_eq!(corner.step(Direction::South, 3, 3), None);
        assert_eq!(corner.step(Direction::East, 3, 3), None);
    }

    #[test]
    fn test_index_round_trip() {
        let pos = Position::new(3, 4);
        assert_eq!(pos.index(7), 25);
        assert_eq!(Position::from_index(25, 7), pos);
    }

    #[test]
    fn test_direction_order() {
        assert_eq!(
            Direction::ALL.map(|d| d.to_delta()),
            [(-1, 0), (0, 1), (1, 0), (0, -1)]
        );
    }

    #[test]
    fn test_kind_tokens() {
        assert_eq!(CellKind::from_token("ROCK"), Some(CellKind::Rock));
        assert_eq!(CellKind::from_token("rabbit"), Some(CellKind::Rabbit));
        assert_eq!(CellKind::from_token("Fox"), Some(CellKind::Fox));
        assert_eq!(CellKind::from_token("EMPTY"), None);
        assert_eq!(CellKind::from_token("WOLF"), None);
    }

    #[test]
    fn test_default_cell_is_empty() {
        assert_eq!(Cell::default(), Cell::EMPTY);
        assert!(Cell::default().is_empty());
    }
}
