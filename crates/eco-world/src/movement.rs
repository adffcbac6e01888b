//! Per-agent move resolution.
//!
//! Decisions read only the frozen source grid, so every agent of the active
//! species can be resolved independently and in any order.

use crate::grid::Grid;
use eco_core::{Cell, CellKind, EcosystemConfig, Position, Species};
use serde::{Deserialize, Serialize};

/// What one agent does this phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No eligible neighbour; the agent stays with updated ages.
    Stay(Cell),
    /// The agent moves to `to`. With `offspring`, a newborn is left at the origin.
    Move {
        to: Position,
        mover: Cell,
        offspring: Option<Cell>,
        ate: bool,
    },
    /// A fox with no prey in reach ran out of food. Nothing is written.
    Starve,
}

impl Outcome {
    /// Destination writes for an agent at `origin`, at most two.
    pub fn writes(&self, origin: Position) -> [Option<(Position, Cell)>; 2] {
        match *self {
            Outcome::Stay(cell) => [Some((origin, cell)), None],
            Outcome::Move {
                to,
                mover,
                offspring,
                ..
            } => [Some((to, mover)), offspring.map(|baby| (origin, baby))],
            Outcome::Starve => [None, None],
        }
    }
}

/// Per-phase tallies. Summation is commutative, so the totals do not depend
/// on how rows were split between workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub moved: u64,
    pub stayed: u64,
    pub births: u64,
    pub starved: u64,
    pub ate: u64,
}

impl PhaseStats {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Stay(_) => self.stayed += 1,
            Outcome::Move { offspring, ate, .. } => {
                self.moved += 1;
                self.births += u64::from(offspring.is_some());
                self.ate += u64::from(*ate);
            }
            Outcome::Starve => self.starved += 1,
        }
    }

    pub fn combine(self, other: Self) -> Self {
        Self {
            moved: self.moved + other.moved,
            stayed: self.stayed + other.stayed,
            births: self.births + other.births,
            starved: self.starved + other.starved,
            ate: self.ate + other.ate,
        }
    }
}

/// Up to four eligible neighbours, kept in North, East, South, West order.
#[derive(Debug, Clone, Copy)]
struct Candidates {
    slots: [Position; 4],
    len: usize,
}

impl Candidates {
    fn collect(source: &Grid, pos: Position, kind: CellKind) -> Self {
        let mut candidates = Self {
            slots: [pos; 4],
            len: 0,
        };
        for neighbor in source.neighbors(pos) {
            if source.get(neighbor).is(kind) {
                candidates.slots[candidates.len] = neighbor;
                candidates.len += 1;
            }
        }
        candidates
    }

    fn select(&self, generation: u64, pos: Position) -> Option<Position> {
        (self.len > 0).then(|| self.slots[choice_index(generation, pos, self.len)])
    }
}

/// `(generation + row + col) mod count`: varies with time and place, needs no
/// random state, and is the same on every thread.
pub fn choice_index(generation: u64, pos: Position, count: usize) -> usize {
    debug_assert!(count > 0);
    let seed = generation
        .wrapping_add(pos.row as u64)
        .wrapping_add(pos.col as u64);
    (seed % count as u64) as usize
}

/// Resolve the agent at `pos`, which must hold a member of `species`.
pub fn resolve(
    species: Species,
    source: &Grid,
    pos: Position,
    generation: u64,
    config: &EcosystemConfig,
) -> Outcome {
    match species {
        Species::Rabbit => resolve_rabbit(source, pos, generation, config),
        Species::Fox => resolve_fox(source, pos, generation, config),
    }
}

fn resolve_rabbit(source: &Grid, pos: Position, generation: u64, config: &EcosystemConfig) -> Outcome {
    let here = source.get(pos);
    debug_assert!(here.is(CellKind::Rabbit), "expected rabbit at {pos:?}, got {here:?}");

    let proc_age = here.proc_age.saturating_add(1);
    match Candidates::collect(source, pos, CellKind::Empty).select(generation, pos) {
        None => Outcome::Stay(Cell::rabbit(proc_age)),
        Some(to) if proc_age > config.rabbit_procreation => Outcome::Move {
            to,
            mover: Cell::rabbit(0),
            offspring: Some(Cell::rabbit(0)),
            ate: false,
        },
        Some(to) => Outcome::Move {
            to,
            mover: Cell::rabbit(proc_age),
            offspring: None,
            ate: false,
        },
    }
}

fn resolve_fox(source: &Grid, pos: Position, generation: u64, config: &EcosystemConfig) -> Outcome {
    let here = source.get(pos);
    debug_assert!(here.is(CellKind::Fox), "expected fox at {pos:?}, got {here:?}");

    let proc_age = here.proc_age.saturating_add(1);

    // Prey strictly dominates wandering, and starvation is only checked when
    // there is no prey in reach.
    let (target, food_age, ate) =
        match Candidates::collect(source, pos, CellKind::Rabbit).select(generation, pos) {
            Some(prey) => (Some(prey), 0, true),
            None => {
                let food_age = here.food_age.saturating_add(1);
                if food_age >= config.fox_starvation {
                    return Outcome::Starve;
                }
                let target = Candidates::collect(source, pos, CellKind::Empty).select(generation, pos);
                (target, food_age, false)
            }
        };

    match target {
        None => Outcome::Stay(Cell::fox(proc_age, food_age)),
        Some(to) if proc_age > config.fox_procreation => Outcome::Move {
            to,
            mover: Cell::fox(0, food_age),
            offspring: Some(Cell::fox(0, 0)),
            ate,
        },
        Some(to) => Outcome::Move {
            to,
            mover: Cell::fox(proc_age, food_age),
            offspring: None,
            ate,
        },
    }
}
