//! Keyed sequence diffing between render passes.
//!
//! The `RowsDiffer` retains the last applied keyed ordering and computes
//! the operations that transform it into the next one, preserving row
//! identity wherever the keys allow.
//!
//! # Algorithm
//!
//! 1. Match previous and new entries by key. Occurrences of a duplicate
//!    key are paired FIFO, the same discipline the render-row cache uses
//!    for duplicate records, so a weak track function degrades to
//!    positional matching instead of corrupting positions.
//! 2. Emit removals for unmatched previous entries, high-to-low, so the
//!    indices stay valid as the operations are applied one by one.
//! 3. Emit insertions for unmatched new entries, ascending, at their
//!    position in the new ordering.
//! 4. Emit moves for matched entries whose relative order changed. Entries
//!    on a longest increasing subsequence of target positions stay put;
//!    everything else is spliced into place back-to-front against a
//!    simulated copy of the sequence. The move count is therefore the
//!    minimum achievable with single-element moves.
//! 5. Emit rebinds for matched entries whose key survived but whose render
//!    row instance changed (possible only under a caller-supplied track
//!    function weaker than full identity). A rebind requires a data
//!    refresh at the surface, no structural operation.
//!
//! Identical input produces no operations.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::cache::{RenderRow, RowId};

/// Reconciliation key for one render row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiffKey {
    /// Render-row identity; the default.
    Row(RowId),
    /// Caller-tracked key from a track function.
    Tracked(String),
}

/// One operation against the rendered sequence.
///
/// Operations are emitted in apply order: removals, then insertions, then
/// moves, then rebinds. Indices always refer to the sequence as it stands
/// when the operation is applied. A move removes the entry at `from` and
/// reinserts it at `to` in the shortened sequence.
#[derive(Debug, Clone)]
pub enum DiffOp<T> {
    /// Remove the row at `index`.
    Remove {
        /// Position to remove at.
        index: usize,
    },
    /// Insert `row` at `index`.
    Insert {
        /// Position to insert at.
        index: usize,
        /// The row to materialize.
        row: Arc<RenderRow<T>>,
    },
    /// Move the row at `from` so it ends up at `to`.
    Move {
        /// Current position.
        from: usize,
        /// Position after reinsertion.
        to: usize,
    },
    /// Same key, different render row instance: refresh the data bound at
    /// `index` without touching structure.
    Rebind {
        /// Position whose binding changed.
        index: usize,
        /// The row now occupying that key.
        row: Arc<RenderRow<T>>,
    },
}

/// Stateful differ over keyed render-row sequences.
#[derive(Debug, Default)]
pub struct RowsDiffer<T> {
    prev: Vec<(DiffKey, Arc<RenderRow<T>>)>,
}

impl<T> RowsDiffer<T> {
    /// Create a differ with an empty baseline.
    pub fn new() -> Self {
        Self { prev: Vec::new() }
    }

    /// Reset the baseline to empty.
    ///
    /// The next diff reports every entry as an insertion; used for forced
    /// full rebuilds and when the data source goes away.
    pub fn clear(&mut self) {
        self.prev.clear();
    }

    /// Number of entries in the current baseline.
    pub fn len(&self) -> usize {
        self.prev.len()
    }

    /// Check if the baseline is empty.
    pub fn is_empty(&self) -> bool {
        self.prev.is_empty()
    }

    /// Diff the new keyed ordering against the baseline, then adopt it as
    /// the next baseline.
    pub fn diff(&mut self, new: &[(DiffKey, Arc<RenderRow<T>>)]) -> Vec<DiffOp<T>> {
        let mut ops = Vec::new();

        // Pair up entries by key, FIFO per key occurrence.
        let mut prev_by_key: HashMap<&DiffKey, VecDeque<usize>> = HashMap::new();
        for (prev_idx, (key, _)) in self.prev.iter().enumerate() {
            prev_by_key.entry(key).or_default().push_back(prev_idx);
        }

        let mut matched_prev: Vec<Option<usize>> = vec![None; new.len()];
        let mut prev_is_matched = vec![false; self.prev.len()];
        for (new_idx, (key, _)) in new.iter().enumerate() {
            if let Some(positions) = prev_by_key.get_mut(key) {
                if let Some(prev_idx) = positions.pop_front() {
                    matched_prev[new_idx] = Some(prev_idx);
                    prev_is_matched[prev_idx] = true;
                }
            }
        }

        // Removals, high-to-low over the previous ordering.
        for prev_idx in (0..self.prev.len()).rev() {
            if !prev_is_matched[prev_idx] {
                ops.push(DiffOp::Remove { index: prev_idx });
            }
        }

        // The evolving sequence, each entry represented by its position in
        // the new ordering. Starts as the retained entries in previous
        // order.
        let mut working: Vec<usize> = Vec::with_capacity(new.len());
        let mut final_of_prev: HashMap<usize, usize> = HashMap::new();
        for (new_idx, matched) in matched_prev.iter().enumerate() {
            if let Some(prev_idx) = matched {
                final_of_prev.insert(*prev_idx, new_idx);
            }
        }
        for prev_idx in 0..self.prev.len() {
            if let Some(&final_idx) = final_of_prev.get(&prev_idx) {
                working.push(final_idx);
            }
        }

        // Insertions, ascending over the new ordering.
        for (new_idx, matched) in matched_prev.iter().enumerate() {
            if matched.is_none() {
                ops.push(DiffOp::Insert {
                    index: new_idx,
                    row: Arc::clone(&new[new_idx].1),
                });
                debug_assert!(new_idx <= working.len());
                working.insert(new_idx, new_idx);
            }
        }

        // Moves. Entries on a longest increasing subsequence of target
        // positions are already in relative order; splice the rest into
        // place back-to-front, anchored on the entry that follows in the
        // new ordering.
        let keep = lis_keep_mask(&working);
        let mut stays = vec![false; new.len()];
        for (pos, &final_idx) in working.iter().enumerate() {
            if keep[pos] {
                stays[final_idx] = true;
            }
        }

        let mut anchor: Option<usize> = None;
        for final_idx in (0..new.len()).rev() {
            if stays[final_idx] {
                anchor = Some(final_idx);
                continue;
            }
            let from = position_of(&working, final_idx);
            working.remove(from);
            let to = match anchor {
                Some(a) => position_of(&working, a),
                None => working.len(),
            };
            working.insert(to, final_idx);
            if from != to {
                ops.push(DiffOp::Move { from, to });
            }
            anchor = Some(final_idx);
        }
        debug_assert!(working.iter().enumerate().all(|(pos, &f)| pos == f));

        // Rebinds: key survived, instance did not.
        for (new_idx, matched) in matched_prev.iter().enumerate() {
            if let Some(prev_idx) = matched {
                if !Arc::ptr_eq(&self.prev[*prev_idx].1, &new[new_idx].1) {
                    ops.push(DiffOp::Rebind {
                        index: new_idx,
                        row: Arc::clone(&new[new_idx].1),
                    });
                }
            }
        }

        if !ops.is_empty() {
            log::debug!(
                "diff: {} prev, {} new, {} ops",
                self.prev.len(),
                new.len(),
                ops.len()
            );
        }

        self.prev = new.to_vec();
        ops
    }
}

fn position_of(working: &[usize], final_idx: usize) -> usize {
    debug_assert!(working.contains(&final_idx));
    working.iter().position(|&f| f == final_idx).unwrap_or(0)
}

/// Mask of positions forming one longest strictly increasing subsequence.
fn lis_keep_mask(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        parent[i] = if slot > 0 { Some(tails[slot - 1]) } else { None };
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = parent[i];
    }
    keep
}
