//! Striped locking for concurrent writes into a destination buffer.
//!
//! A fixed table of mutexes covers any number of cells: cell `i` is guarded
//! by stripe `hash(i) % len`. Two cells sharing a stripe only serialise each
//! other; they never need to.

use eco_core::{Cell, CellKind};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Fibonacci hashing multiplier (2^64 / golden ratio).
const FIB_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct StripedLockTable {
    stripes: Box<[Mutex<()>]>,
    bits: u32,
}

impl StripedLockTable {
    /// `requested` is rounded up to the next power of two, minimum one.
    pub fn new(requested: usize) -> Self {
        let len = requested.max(1).next_power_of_two();
        let stripes = (0..len).map(|_| Mutex::new(())).collect();
        Self {
            stripes,
            bits: len.trailing_zeros(),
        }
    }

    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }

    pub fn stripe_of(&self, index: usize) -> usize {
        if self.bits == 0 {
            return 0;
        }
        ((index as u64).wrapping_mul(FIB_MULTIPLIER) >> (64 - self.bits)) as usize
    }

    pub fn lock(&self, index: usize) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(index)].lock()
    }
}

impl std::fmt::Debug for StripedLockTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripedLockTable")
            .field("stripes", &self.stripes.len())
            .finish()
    }
}

/// A [`Cell`] held in atomics so a destination buffer can be shared across
/// workers. During a phase a slot is only written under its stripe lock,
/// which orders the two words, so the atomics themselves stay `Relaxed`.
#[derive(Debug, Default)]
pub struct SharedCell {
    kind: AtomicU8,
    /// `proc_age` in the high half, `food_age` in the low half
    ages: AtomicU64,
}

impl SharedCell {
    pub fn new(cell: Cell) -> Self {
        Self {
            kind: AtomicU8::new(encode_kind(cell.kind)),
            ages: AtomicU64::new(pack_ages(&cell)),
        }
    }

    pub fn load(&self) -> Cell {
        decode(
            self.kind.load(Ordering::Relaxed),
            self.ages.load(Ordering::Relaxed),
        )
    }

    fn store(&self, cell: Cell) {
        self.kind.store(encode_kind(cell.kind), Ordering::Relaxed);
        self.ages.store(pack_ages(&cell), Ordering::Relaxed);
    }

    /// Write through an exclusive borrow, skipping the atomic stores.
    pub fn store_mut(&mut self, cell: Cell) {
        *self.kind.get_mut() = encode_kind(cell.kind);
        *self.ages.get_mut() = pack_ages(&cell);
    }
}

fn encode_kind(kind: CellKind) -> u8 {
    match kind {
        CellKind::Empty => 0,
        CellKind::Rock => 1,
        CellKind::Rabbit => 2,
        CellKind::Fox => 3,
    }
}

fn pack_ages(cell: &Cell) -> u64 {
    (u64::from(cell.proc_age) << 32) | u64::from(cell.food_age)
}

fn decode(kind: u8, ages: u64) -> Cell {
    let kind = match kind {
        1 => CellKind::Rock,
        2 => CellKind::Rabbit,
        3 => CellKind::Fox,
        _ => CellKind::Empty,
    };
    Cell {
        kind,
        proc_age: (ages >> 32) as u32,
        food_age: ages as u32,
    }
}

/// A shared destination buffer whose slots are updated from many threads,
/// each update running under the slot's stripe lock.
pub struct StripedCells<'a> {
    cells: &'a [SharedCell],
    locks: &'a StripedLockTable,
}

impl<'a> StripedCells<'a> {
    pub fn new(cells: &'a [SharedCell], locks: &'a StripedLockTable) -> Self {
        Self { cells, locks }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Run `f` on cell `index` while holding its stripe lock, then write the
    /// result back before the lock is released.
    pub fn update<R>(&self, index: usize, f: impl FnOnce(&mut Cell) -> R) -> R {
        let slot = &self.cells[index];
        let _guard = self.locks.lock(index);
        let mut cell = slot.load();
        let result = f(&mut cell);
        slot.store(cell);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_table_rounds_to_power_of_two() {
        assert_eq!(StripedLockTable::new(0).len(), 1);
        assert_eq!(StripedLockTable::new(1).len(), 1);
        assert_eq!(StripedLockTable::new(5).len(), 8);
        assert_eq!(StripedLockTable::new(65_536).len(), 65_536);
    }

    #[test]
    fn test_stripe_in_range_and_stable() {
        let table = StripedLockTable::new(64);
        for index in 0..10_000 {
            let stripe = table.stripe_of(index);
            assert!(stripe < 64);
            assert_eq!(stripe, table.stripe_of(index));
        }
    }

    #[test]
    fn test_single_stripe_covers_everything() {
        let table = StripedLockTable::new(1);
        assert!((0..100).all(|i| table.stripe_of(i) == 0));
    }

    #[test]
    fn test_stripes_are_spread() {
        let table = StripedLockTable::new(16);
        let mut used = [false; 16];
        for index in 0..256 {
            used[table.stripe_of(index)] = true;
        }
        assert!(used.iter().all(|&u| u));
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let cells: Vec<SharedCell> = (0..8).map(|_| SharedCell::new(Cell::rabbit(0))).collect();
        // Fewer stripes than cells so stripes are shared.
        let table = StripedLockTable::new(2);
        let shared = StripedCells::new(&cells, &table);
        (0..8_000usize).into_par_iter().for_each(|i| {
            shared.update(i % 8, |c| c.proc_age += 1);
        });
        assert!(cells.iter().all(|c| c.load() == Cell::rabbit(1_000)));
    }

    #[test]
    fn test_update_returns_value() {
        let cells = vec![
            SharedCell::new(Cell::ROCK),
            SharedCell::new(Cell::rabbit(2)),
            SharedCell::default(),
        ];
        let table = StripedLockTable::new(4);
        let shared = StripedCells::new(&cells, &table);
        let old = shared.update(1, |c| std::mem::replace(c, Cell::fox(20, 1)));
        assert_eq!(old, Cell::rabbit(2));
        assert_eq!(cells[1].load(), Cell::fox(20, 1));
        assert_eq!(shared.len(), 3);
    }

    #[test]
    fn test_shared_cell_keeps_full_state() {
        let samples = [
            Cell::EMPTY,
            Cell::ROCK,
            Cell::rabbit(u32::MAX),
            Cell::fox(u32::MAX, u32::MAX),
            Cell::fox(0, u32::MAX),
            Cell::fox(7, 3),
        ];
        for cell in samples {
            let mut slot = SharedCell::default();
            assert_eq!(slot.load(), Cell::EMPTY);
            slot.store_mut(cell);
            assert_eq!(slot.load(), cell);
            assert_eq!(SharedCell::new(cell).load(), cell);
        }
    }
}
