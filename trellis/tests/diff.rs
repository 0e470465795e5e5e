//! Tests for the keyed sequence differ.

use std::sync::Arc;

use proptest::prelude::*;
use trellis::{DiffKey, DiffOp, RenderRow, RenderRowCache, RowDef, RowsDiffer};

fn fresh_row(value: u32) -> Arc<RenderRow<u32>> {
    let def = RowDef::data(["c"]);
    let mut cache = RenderRowCache::new();
    cache.reconcile(&[value], &[vec![def]]).remove(0)
}

fn identity_keyed(rows: &[Arc<RenderRow<u32>>]) -> Vec<(DiffKey, Arc<RenderRow<u32>>)> {
    rows.iter()
        .map(|row| (DiffKey::Row(row.id()), Arc::clone(row)))
        .collect()
}

fn tracked_keyed(rows: &[Arc<RenderRow<u32>>]) -> Vec<(DiffKey, Arc<RenderRow<u32>>)> {
    rows.iter()
        .map(|row| (DiffKey::Tracked(row.record().to_string()), Arc::clone(row)))
        .collect()
}

/// Apply emitted operations to a copy of the previous instance sequence.
fn replay(
    prev: &[(DiffKey, Arc<RenderRow<u32>>)],
    ops: &[DiffOp<u32>],
) -> Vec<Arc<RenderRow<u32>>> {
    let mut rows: Vec<Arc<RenderRow<u32>>> =
        prev.iter().map(|(_, row)| Arc::clone(row)).collect();
    for op in ops {
        match op {
            DiffOp::Remove { index } => {
                rows.remove(*index);
            }
            DiffOp::Insert { index, row } => {
                rows.insert(*index, Arc::clone(row));
            }
            DiffOp::Move { from, to } => {
                let row = rows.remove(*from);
                rows.insert(*to, row);
            }
            DiffOp::Rebind { index, row } => {
                rows[*index] = Arc::clone(row);
            }
        }
    }
    rows
}

fn structural_count(ops: &[DiffOp<u32>]) -> (usize, usize, usize, usize) {
    let mut counts = (0, 0, 0, 0);
    for op in ops {
        match op {
            DiffOp::Remove { .. } => counts.0 += 1,
            DiffOp::Insert { .. } => counts.1 += 1,
            DiffOp::Move { .. } => counts.2 += 1,
            DiffOp::Rebind { .. } => counts.3 += 1,
        }
    }
    counts
}

#[test]
fn test_initial_diff_inserts_everything() {
    let rows: Vec<_> = [1, 2, 3].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();

    let ops = differ.diff(&identity_keyed(&rows));
    let (removes, inserts, moves, rebinds) = structural_count(&ops);
    assert_eq!((removes, inserts, moves, rebinds), (0, 3, 0, 0));

    let replayed = replay(&[], &ops);
    for (a, b) in replayed.iter().zip(&rows) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_identical_input_is_idempotent() {
    let rows: Vec<_> = [1, 2, 3].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();

    differ.diff(&identity_keyed(&rows));
    let ops = differ.diff(&identity_keyed(&rows));
    assert!(ops.is_empty());
}

#[test]
fn test_removals_emitted_high_to_low() {
    let rows: Vec<_> = [1, 2, 3].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();
    let prev = identity_keyed(&rows);
    differ.diff(&prev);

    // Keep only the middle entry.
    let new = identity_keyed(&rows[1..2]);
    let ops = differ.diff(&new);
    let indices: Vec<usize> = ops
        .iter()
        .filter_map(|op| match op {
            DiffOp::Remove { index } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![2, 0]);

    let replayed = replay(&prev, &ops);
    assert_eq!(replayed.len(), 1);
    assert!(Arc::ptr_eq(&replayed[0], &rows[1]));
}

#[test]
fn test_reversal_needs_at_most_two_moves() {
    let rows: Vec<_> = [1, 2, 3].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();
    let prev = identity_keyed(&rows);
    differ.diff(&prev);

    let reversed: Vec<_> = rows.iter().rev().cloned().collect();
    let new = identity_keyed(&reversed);
    let ops = differ.diff(&new);

    let (removes, inserts, moves, rebinds) = structural_count(&ops);
    assert_eq!((removes, inserts, rebinds), (0, 0, 0));
    assert!(moves <= 2, "reversal took {moves} moves");

    let replayed = replay(&prev, &ops);
    for (a, b) in replayed.iter().zip(&reversed) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_rotation_needs_one_move() {
    let rows: Vec<_> = [1, 2, 3, 4, 5].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();
    let prev = identity_keyed(&rows);
    differ.diff(&prev);

    // [1,2,3,4,5] -> [2,3,4,5,1]: only the head actually moves.
    let mut rotated = rows.clone();
    rotated.rotate_left(1);
    let ops = differ.diff(&identity_keyed(&rotated));

    let (_, _, moves, _) = structural_count(&ops);
    assert_eq!(moves, 1);

    let replayed = replay(&prev, &ops);
    for (a, b) in replayed.iter().zip(&rotated) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_mixed_edit_replays_exactly() {
    let rows: Vec<_> = [1, 2, 3].map(fresh_row).to_vec();
    let extra = fresh_row(9);
    let mut differ = RowsDiffer::new();
    let prev = identity_keyed(&rows);
    differ.diff(&prev);

    // [1,2,3] -> [3,9,1]: drop 2, insert 9, reorder the rest.
    let new_rows = vec![Arc::clone(&rows[2]), extra, Arc::clone(&rows[0])];
    let ops = differ.diff(&identity_keyed(&new_rows));

    let replayed = replay(&prev, &ops);
    assert_eq!(replayed.len(), 3);
    for (a, b) in replayed.iter().zip(&new_rows) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_tracked_key_rebinds_changed_instance() {
    let first = fresh_row(1);
    let mut differ = RowsDiffer::new();
    differ.diff(&tracked_keyed(&[Arc::clone(&first)]));

    // Same tracked key, different instance: data refresh, no structure.
    let replacement = fresh_row(1);
    let ops = differ.diff(&tracked_keyed(&[Arc::clone(&replacement)]));

    let (removes, inserts, moves, rebinds) = structural_count(&ops);
    assert_eq!((removes, inserts, moves, rebinds), (0, 0, 0, 1));
    match &ops[0] {
        DiffOp::Rebind { index, row } => {
            assert_eq!(*index, 0);
            assert!(Arc::ptr_eq(row, &replacement));
        }
        other => panic!("expected rebind, got {other:?}"),
    }
}

#[test]
fn test_duplicate_tracked_keys_match_fifo() {
    let rows: Vec<_> = [5, 5].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();
    differ.diff(&tracked_keyed(&rows));

    // Same instances in the same order: nothing to do.
    let ops = differ.diff(&tracked_keyed(&rows));
    assert!(ops.is_empty());

    // Swapping the duplicate instances matches them FIFO by occurrence,
    // so the structure is untouched and both slots rebind.
    let swapped = vec![Arc::clone(&rows[1]), Arc::clone(&rows[0])];
    let ops = differ.diff(&tracked_keyed(&swapped));
    let (removes, inserts, moves, rebinds) = structural_count(&ops);
    assert_eq!((removes, inserts, moves), (0, 0, 0));
    assert_eq!(rebinds, 2);
}

#[test]
fn test_clear_resets_baseline() {
    let rows: Vec<_> = [1, 2].map(fresh_row).to_vec();
    let mut differ = RowsDiffer::new();
    differ.diff(&identity_keyed(&rows));
    assert_eq!(differ.len(), 2);

    differ.clear();
    assert!(differ.is_empty());

    let ops = differ.diff(&identity_keyed(&rows));
    let (_, inserts, _, _) = structural_count(&ops);
    assert_eq!(inserts, 2);
}

proptest! {
    /// Replaying the emitted operations always reproduces the target
    /// sequence, including under duplicate keys and fresh instances.
    #[test]
    fn prop_replay_reproduces_target(
        prev_values in prop::collection::vec(0u32..6, 0..10),
        new_values in prop::collection::vec(0u32..6, 0..10),
    ) {
        let prev_rows: Vec<_> = prev_values.iter().map(|v| fresh_row(*v)).collect();
        let new_rows: Vec<_> = new_values.iter().map(|v| fresh_row(*v)).collect();
        let prev = tracked_keyed(&prev_rows);
        let new = tracked_keyed(&new_rows);

        let mut differ = RowsDiffer::new();
        differ.diff(&prev);
        let ops = differ.diff(&new);

        let replayed = replay(&prev, &ops);
        prop_assert_eq!(replayed.len(), new_rows.len());
        for (a, b) in replayed.iter().zip(&new_rows) {
            prop_assert!(Arc::ptr_eq(a, b));
        }
    }

    /// A pure permutation never inserts or removes.
    #[test]
    fn prop_permutation_only_moves(
        values in prop::collection::vec(0u32..100, 1..10),
        seed in 0u64..1000,
    ) {
        let rows: Vec<_> = values.iter().map(|v| fresh_row(*v)).collect();
        let mut differ = RowsDiffer::new();
        let prev = identity_keyed(&rows);
        differ.diff(&prev);

        // Deterministic shuffle driven by the seed.
        let mut shuffled = rows.clone();
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        let ops = differ.diff(&identity_keyed(&shuffled));
        let (removes, inserts, _, rebinds) = structural_count(&ops);
        prop_assert_eq!((removes, inserts, rebinds), (0, 0, 0));

        let replayed = replay(&prev, &ops);
        for (a, b) in replayed.iter().zip(&shuffled) {
            prop_assert!(Arc::ptr_eq(a, b));
        }
    }
}
