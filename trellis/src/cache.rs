//! Render rows and the identity-preserving render-row cache.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::def::{DefId, RowDef};

/// Unique identifier for a render row instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(usize);

impl RowId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "__row_{}", self.0)
    }
}

/// One materialized (record, row definition) pairing scheduled for display.
///
/// Shared as `Arc<RenderRow<T>>`: the cache hands the same instance back
/// across passes as long as the pairing survives, so downstream consumers
/// can key off [`RowId`]. The record's position is stored in an atomic and
/// updated in place when the row is reclaimed at a new position, which is
/// what preserves identity across renders.
pub struct RenderRow<T> {
    id: RowId,
    record: T,
    data_index: AtomicUsize,
    def: Arc<RowDef<T>>,
}

impl<T> RenderRow<T> {
    fn new(record: T, data_index: usize, def: Arc<RowDef<T>>) -> Arc<Self> {
        Arc::new(Self {
            id: RowId::new(),
            record,
            data_index: AtomicUsize::new(data_index),
            def,
        })
    }

    /// This render row's identity.
    pub fn id(&self) -> RowId {
        self.id
    }

    /// The record this row displays.
    pub fn record(&self) -> &T {
        &self.record
    }

    /// The record's current position in the dataset.
    pub fn data_index(&self) -> usize {
        self.data_index.load(Ordering::SeqCst)
    }

    /// The row definition this row was materialized from.
    pub fn def(&self) -> &Arc<RowDef<T>> {
        &self.def
    }
}

impl<T: fmt::Debug> fmt::Debug for RenderRow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRow")
            .field("id", &self.id)
            .field("record", &self.record)
            .field("data_index", &self.data_index())
            .field("def", &self.def.id())
            .finish()
    }
}

type Pool<T> = HashMap<T, HashMap<DefId, VecDeque<Arc<RenderRow<T>>>>>;

/// Pool of render rows from the previous pass, reclaimed by
/// (record value, definition) and consumed FIFO.
///
/// The FIFO discipline is what disambiguates duplicate records: two equal
/// records selecting the same definition reclaim two distinct instances in
/// encounter order, so each stays independently trackable as long as the
/// relative order among the duplicates holds.
///
/// Anything left in the previous pool after a pass is dropped; an instance
/// not reclaimed is implicitly removed.
#[derive(Debug, Default)]
pub struct RenderRowCache<T> {
    pool: Pool<T>,
}

impl<T> RenderRowCache<T>
where
    T: Clone + Eq + Hash,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            pool: HashMap::new(),
        }
    }

    /// Produce the render-row sequence for a dataset, reusing pooled
    /// instances where the (record, definition) pairing survived.
    ///
    /// `selections[i]` is the ordered definition list the row selector
    /// produced for `dataset[i]`; selection runs (and fails) before this is
    /// called, so reconciliation itself is infallible and the pool is never
    /// left half-consumed.
    pub fn reconcile(
        &mut self,
        dataset: &[T],
        selections: &[Vec<Arc<RowDef<T>>>],
    ) -> Vec<Arc<RenderRow<T>>> {
        debug_assert_eq!(dataset.len(), selections.len());

        let mut previous = std::mem::take(&mut self.pool);
        let mut next: Pool<T> = HashMap::new();
        let mut rows = Vec::new();
        let mut reused = 0usize;

        for (index, (record, defs)) in dataset.iter().zip(selections).enumerate() {
            for def in defs {
                let row = match previous
                    .get_mut(record)
                    .and_then(|by_def| by_def.get_mut(&def.id()))
                    .and_then(VecDeque::pop_front)
                {
                    Some(row) => {
                        // Same pairing as last pass: keep the instance,
                        // refresh its position in place.
                        row.data_index.store(index, Ordering::SeqCst);
                        reused += 1;
                        row
                    }
                    None => RenderRow::new(record.clone(), index, Arc::clone(def)),
                };

                next.entry(record.clone())
                    .or_default()
                    .entry(def.id())
                    .or_default()
                    .push_back(Arc::clone(&row));
                rows.push(row);
            }
        }

        log::trace!(
            "render-row reconcile: {} rows ({} reused, {} fresh)",
            rows.len(),
            reused,
            rows.len() - reused
        );

        self.pool = next;
        rows
    }

    /// Drop every pooled instance.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}
