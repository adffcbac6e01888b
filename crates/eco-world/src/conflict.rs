//! Merging concurrent writes into one destination cell.
//!
//! Every candidate written to a cell during a phase is folded into it with
//! [`merge`]. The fold is commutative and associative, so the final cell is
//! the same whichever order the writers arrive in.

use eco_core::{Cell, CellKind};
use std::cmp::Reverse;

/// Fold `incoming` into `dest`. Call under `dest`'s stripe lock.
pub fn merge(dest: &mut Cell, incoming: Cell) {
    match incoming.kind {
        CellKind::Rabbit => merge_rabbit(dest, incoming),
        CellKind::Fox => merge_fox(dest, incoming),
        CellKind::Empty | CellKind::Rock => {
            debug_assert!(false, "only animals are merged, got {incoming:?}");
        }
    }
}

/// Rabbits keep the oldest procreation age.
fn merge_rabbit(dest: &mut Cell, incoming: Cell) {
    match dest.kind {
        CellKind::Empty => *dest = Cell::rabbit(incoming.proc_age),
        CellKind::Rabbit => dest.proc_age = dest.proc_age.max(incoming.proc_age),
        CellKind::Rock | CellKind::Fox => {
            debug_assert!(false, "rabbit written over {dest:?}");
        }
    }
}

/// Foxes keep the oldest procreation age, then the lowest food age.
///
/// `(proc_age, food_age)` is the whole of a fox's state, so two candidates
/// that tie on this key are the same fox and either may win.
fn merge_fox(dest: &mut Cell, incoming: Cell) {
    match dest.kind {
        CellKind::Fox => {
            if fox_priority(&incoming) > fox_priority(dest) {
                *dest = incoming;
            }
        }
        // A fox landing on a rabbit eats it.
        CellKind::Empty | CellKind::Rabbit => *dest = Cell::fox(incoming.proc_age, incoming.food_age),
        CellKind::Rock => {
            debug_assert!(false, "fox written over {dest:?}");
        }
    }
}

fn fox_priority(fox: &Cell) -> (u32, Reverse<u32>) {
    (fox.proc_age, Reverse(fox.food_age))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fold(start: Cell, candidates: &[Cell]) -> Cell {
        let mut dest = start;
        for &candidate in candidates {
            merge(&mut dest, candidate);
        }
        dest
    }

    #[test]
    fn test_rabbit_into_empty() {
        assert_eq!(fold(Cell::EMPTY, &[Cell::rabbit(4)]), Cell::rabbit(4));
    }

    #[test]
    fn test_rabbits_keep_max_age_in_either_order() {
        let a = Cell::rabbit(4);
        let b = Cell::rabbit(6);
        assert_eq!(fold(Cell::EMPTY, &[a, b]), Cell::rabbit(6));
        assert_eq!(fold(Cell::EMPTY, &[b, a]), Cell::rabbit(6));
    }

    #[test]
    fn test_fox_eats_rabbit() {
        assert_eq!(fold(Cell::rabbit(9), &[Cell::fox(1, 0)]), Cell::fox(1, 0));
    }

    #[test]
    fn test_older_fox_wins() {
        let young = Cell::fox(2, 0);
        let old = Cell::fox(5, 3);
        assert_eq!(fold(Cell::EMPTY, &[young, old]), old);
        assert_eq!(fold(Cell::EMPTY, &[old, young]), old);
    }

    #[test]
    fn test_less_hungry_fox_wins_tie() {
        let hungry = Cell::fox(3, 4);
        let fed = Cell::fox(3, 1);
        assert_eq!(fold(Cell::EMPTY, &[hungry, fed]), fed);
        assert_eq!(fold(Cell::EMPTY, &[fed, hungry]), fed);
    }

    #[test]
    fn test_winner_keeps_its_own_food_age() {
        // The older fox wins even though it is hungrier; food ages are not mixed.
        let result = fold(Cell::EMPTY, &[Cell::fox(2, 0), Cell::fox(7, 5)]);
        assert_eq!(result, Cell::fox(7, 5));
    }

    fn rabbit_strategy() -> impl Strategy<Value = Cell> {
        (0u32..20).prop_map(Cell::rabbit)
    }

    fn fox_strategy() -> impl Strategy<Value = Cell> {
        (0u32..6, 0u32..6).prop_map(|(proc_age, food_age)| Cell::fox(proc_age, food_age))
    }

    proptest! {
        #[test]
        fn prop_rabbit_merge_order_independent(
            candidates in proptest::collection::vec(rabbit_strategy(), 1..8),
            start_rabbit in proptest::bool::ANY,
        ) {
            let start = if start_rabbit { Cell::rabbit(0) } else { Cell::EMPTY };
            let forward = fold(start, &candidates);
            let mut reversed = candidates.clone();
            reversed.reverse();
            let mut rotated = candidates.clone();
            rotated.rotate_left(candidates.len() / 2);

            prop_assert_eq!(forward, fold(start, &reversed));
            prop_assert_eq!(forward, fold(start, &rotated));
            let max_age = candidates.iter().map(|c| c.proc_age).max().unwrap_or(0);
            prop_assert_eq!(forward, Cell::rabbit(max_age));
        }

        #[test]
        fn prop_fox_merge_order_independent(
            candidates in proptest::collection::vec(fox_strategy(), 1..8),
            start in prop_oneof![Just(Cell::EMPTY), rabbit_strategy()],
        ) {
            let forward = fold(start, &candidates);
            let mut reversed = candidates.clone();
            reversed.reverse();
            let mut sorted = candidates.clone();
            sorted.sort_by_key(|c| (c.food_age, c.proc_age));

            prop_assert_eq!(forward, fold(start, &reversed));
            prop_assert_eq!(forward, fold(start, &sorted));
            let best = candidates.iter().copied().max_by_key(fox_priority).unwrap();
            prop_assert_eq!(forward, best);
        }

        #[test]
        fn prop_fox_merge_associative(
            left in proptest::collection::vec(fox_strategy(), 1..5),
            right in proptest::collection::vec(fox_strategy(), 1..5),
        ) {
            // Merging two partial results equals merging everything at once.
            let combined: Vec<Cell> = left.iter().chain(&right).copied().collect();
            let partial_left = fold(Cell::EMPTY, &left);
            let partial_right = fold(Cell::EMPTY, &right);

            prop_assert_eq!(
                fold(Cell::EMPTY, &combined),
                fold(partial_left, &[partial_right])
            );
        }
    }
}
