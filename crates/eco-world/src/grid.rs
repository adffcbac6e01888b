//! 2D grid and the double-buffered store the generation phases run on.

use crate::locks::SharedCell;
use eco_core::{Cell, CellKind, Direction, Position, Scenario, Species};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A bounded, row-major grid of cells.
///
/// Cells live in [`SharedCell`] slots so a grid can serve as the destination
/// of a phase while workers merge into it through a shared borrow.
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Box<[SharedCell]>,
}

impl Grid {
    /// All cells start empty.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: (0..rows * cols).map(|_| SharedCell::default()).collect(),
        }
    }

    /// Lay out a scenario's placements on an empty grid.
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut grid = Self::new(scenario.config.rows, scenario.config.cols);
        for placement in &scenario.placements {
            grid.set(placement.position, Cell::newborn(placement.kind));
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Panics if `pos` lies outside the grid.
    pub fn get(&self, pos: Position) -> Cell {
        debug_assert!(self.contains(pos), "{pos:?} outside {}x{}", self.rows, self.cols);
        self.cells[pos.index(self.cols)].load()
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        debug_assert!(self.contains(pos), "{pos:?} outside {}x{}", self.rows, self.cols);
        self.cells[pos.index(self.cols)].store_mut(cell);
    }

    pub(crate) fn shared(&self) -> &[SharedCell] {
        &self.cells
    }

    /// In-bounds orthogonal neighbours, in North, East, South, West order.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| pos.step(dir, self.rows, self.cols))
    }

    pub fn index_to_pos(&self, index: usize) -> Position {
        Position::from_index(index, self.cols)
    }

    /// Iterator over all cells with positions, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), cell.load()))
    }

    /// Non-empty cells, row-major
    pub fn occupied(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.iter().filter(|(_, cell)| !cell.is_empty())
    }

    pub fn live_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn census(&self) -> Census {
        self.iter().fold(Census::default(), |mut census, (_, cell)| {
            census.add(cell.kind);
            census
        })
    }
}

impl Clone for Grid {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(|c| SharedCell::new(c.load())).collect(),
        }
    }
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.iter().eq(other.iter())
    }
}

impl Eq for Grid {}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("occupied", &self.occupied().collect::<Vec<_>>())
            .finish()
    }
}

/// Occupancy counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub rocks: usize,
    pub rabbits: usize,
    pub foxes: usize,
}

impl Census {
    fn add(&mut self, kind: CellKind) {
        match kind {
            CellKind::Empty => {}
            CellKind::Rock => self.rocks += 1,
            CellKind::Rabbit => self.rabbits += 1,
            CellKind::Fox => self.foxes += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.rocks + self.rabbits + self.foxes
    }
}

/// What a destination cell holds before the active species starts writing.
///
/// Rocks and the species that is not moving this phase carry over unchanged;
/// everything else is cleared and rebuilt by the movers.
pub fn seed_cell(active: Species, source: &Cell) -> Cell {
    match source.kind {
        CellKind::Rock => *source,
        CellKind::Rabbit | CellKind::Fox if source.kind != active.kind() => *source,
        _ => Cell::EMPTY,
    }
}

/// Two equally sized buffers: `current` is the frozen source of a phase,
/// `next` is the destination being built.
#[derive(Debug, Clone)]
pub struct GridStore {
    current: Grid,
    next: Grid,
}

impl GridStore {
    pub fn allocate(rows: usize, cols: usize) -> Self {
        Self::from_grid(Grid::new(rows, cols))
    }

    pub fn from_grid(grid: Grid) -> Self {
        let next = Grid::new(grid.rows, grid.cols);
        Self {
            current: grid,
            next,
        }
    }

    pub fn current(&self) -> &Grid {
        &self.current
    }

    pub fn into_current(self) -> Grid {
        self.current
    }

    /// Reinitialise the destination buffer for `active`'s phase.
    pub fn seed(&mut self, active: Species) {
        for (dest, src) in self.next.cells.iter_mut().zip(self.current.cells.iter()) {
            dest.store_mut(seed_cell(active, &src.load()));
        }
    }

    /// [`GridStore::seed`] spread over the rayon pool the caller is running in.
    pub fn par_seed(&mut self, active: Species) {
        self.next
            .cells
            .par_iter_mut()
            .zip(self.current.cells.par_iter())
            .for_each(|(dest, src)| dest.store_mut(seed_cell(active, &src.load())));
    }

    /// The read-only source next to the destination that workers merge into.
    pub fn buffers(&self) -> (&Grid, &Grid) {
        (&self.current, &self.next)
    }

    /// Exchange buffer roles. The finished destination becomes the source.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{EcosystemConfig, Placement};

    fn mixed_grid() -> Grid {
        let mut grid = Grid::new(2, 2);
        grid.set(Position::new(0, 0), Cell::ROCK);
        grid.set(Position::new(0, 1), Cell::rabbit(3));
        grid.set(Position::new(1, 0), Cell::fox(2, 1));
        grid
    }

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(3, 4);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.len(), 12);
        assert!(grid.iter().all(|(_, cell)| cell.is_empty()));
    }

    #[test]
    fn test_neighbors_are_bounded_and_ordered() {
        let grid = Grid::new(3, 3);

        let center: Vec<_> = grid.neighbors(Position::new(1, 1)).collect();
        assert_eq!(
            center,
            vec![
                Position::new(0, 1),
                Position::new(1, 2),
                Position::new(2, 1),
                Position::new(1, 0),
            ]
        );

        let corner: Vec<_> = grid.neighbors(Position::new(0, 0)).collect();
        assert_eq!(corner, vec![Position::new(0, 1), Position::new(1, 0)]);

        let single = Grid::new(1, 1);
        assert_eq!(single.neighbors(Position::new(0, 0)).count(), 0);
    }

    #[test]
    fn test_from_scenario_last_placement_wins() {
        let config = EcosystemConfig {
            rows: 2,
            cols: 2,
            ..Default::default()
        };
        let scenario = Scenario::new(
            config,
            vec![
                Placement::new(CellKind::Rock, 1, 1),
                Placement::new(CellKind::Fox, 1, 1),
                Placement::new(CellKind::Rabbit, 0, 0),
            ],
        )
        .unwrap();

        let grid = Grid::from_scenario(&scenario);
        assert_eq!(grid.get(Position::new(1, 1)), Cell::fox(0, 0));
        assert_eq!(grid.get(Position::new(0, 0)), Cell::rabbit(0));
        assert_eq!(grid.live_count(), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let grid = mixed_grid();
        let mut copy = grid.clone();
        assert_eq!(copy, grid);

        copy.set(Position::new(1, 1), Cell::rabbit(1));
        assert_ne!(copy, grid);
        assert_eq!(grid.get(Position::new(1, 1)), Cell::EMPTY);
    }

    #[test]
    fn test_census() {
        let census = mixed_grid().census();
        assert_eq!(
            census,
            Census {
                rocks: 1,
                rabbits: 1,
                foxes: 1
            }
        );
        assert_eq!(census.total(), 3);
    }

    #[test]
    fn test_seed_rabbit_phase_keeps_rocks_and_foxes() {
        let mut store = GridStore::from_grid(mixed_grid());
        store.seed(Species::Rabbit);
        let (_, next) = store.buffers();

        assert_eq!(next.get(Position::new(0, 0)), Cell::ROCK);
        assert_eq!(next.get(Position::new(0, 1)), Cell::EMPTY);
        assert_eq!(next.get(Position::new(1, 0)), Cell::fox(2, 1));
        assert_eq!(next.get(Position::new(1, 1)), Cell::EMPTY);
    }

    #[test]
    fn test_seed_fox_phase_keeps_rocks_and_rabbits() {
        let mut store = GridStore::from_grid(mixed_grid());
        store.seed(Species::Fox);
        let (_, next) = store.buffers();

        assert_eq!(next.get(Position::new(0, 0)), Cell::ROCK);
        assert_eq!(next.get(Position::new(0, 1)), Cell::rabbit(3));
        assert_eq!(next.get(Position::new(1, 0)), Cell::EMPTY);
    }

    #[test]
    fn test_seed_clears_stale_destination() {
        let mut store = GridStore::from_grid(mixed_grid());
        store.next.set(Position::new(1, 1), Cell::rabbit(9));
        store.seed(Species::Rabbit);
        assert_eq!(store.buffers().1.get(Position::new(1, 1)), Cell::EMPTY);
    }

    #[test]
    fn test_par_seed_matches_seed() {
        let mut sequential = GridStore::from_grid(mixed_grid());
        let mut parallel = sequential.clone();
        for species in [Species::Rabbit, Species::Fox] {
            sequential.seed(species);
            parallel.par_seed(species);
            assert_eq!(sequential.buffers().1, parallel.buffers().1);
        }
    }

    #[test]
    fn test_swap() {
        let mut store = GridStore::from_grid(mixed_grid());
        store.seed(Species::Fox);
        store.swap();
        assert_eq!(store.current().census().foxes, 0);
        assert_eq!(store.current().census().rabbits, 1);
    }

    #[test]
    fn test_allocate_empty_buffers() {
        let mut store = GridStore::allocate(3, 4);
        let (current, next) = store.buffers();
        assert_eq!((current.rows(), current.cols()), (3, 4));
        assert_eq!((next.rows(), next.cols()), (3, 4));
        assert_eq!(current.live_count(), 0);

        store.seed(Species::Rabbit);
        store.swap();
        assert_eq!(store.current(), &Grid::new(3, 4));
    }
}
