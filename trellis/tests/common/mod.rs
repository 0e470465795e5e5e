//! Shared test support: a recording render surface.

use std::collections::HashMap;
use std::sync::Arc;

use trellis::{DefId, RenderSurface, RowContext, RowDef};

/// A structural operation observed by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Insert { index: usize, def: DefId },
    Move { from: usize, to: usize },
    Remove { index: usize },
}

/// Handle to one materialized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(usize);

/// A render surface that records every operation and the latest context
/// per row, so tests can assert on both structure and data.
#[derive(Debug, Default)]
pub struct RecordingSurface<T> {
    next_slot: usize,
    rows: Vec<(Slot, DefId)>,
    contexts: HashMap<Slot, RowContext<T>>,
    ops: Vec<SurfaceOp>,
}

impl<T: Clone> RecordingSurface<T> {
    pub fn new() -> Self {
        Self {
            next_slot: 0,
            rows: Vec::new(),
            contexts: HashMap::new(),
            ops: Vec::new(),
        }
    }

    /// Drain the recorded structural operations.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    /// Definition ids of the materialized rows, in order.
    pub fn def_ids(&self) -> Vec<DefId> {
        self.rows.iter().map(|(_, def)| *def).collect()
    }

    /// Latest context per materialized row, in order.
    pub fn contexts(&self) -> Vec<RowContext<T>> {
        self.rows
            .iter()
            .map(|(slot, _)| self.contexts.get(slot).cloned().unwrap_or_default())
            .collect()
    }

    /// Records bound to the materialized rows, in order. Panics if a row
    /// has no record (header/footer/no-data rows).
    pub fn records(&self) -> Vec<T> {
        self.contexts()
            .into_iter()
            .map(|ctx| ctx.record.expect("row has no record bound"))
            .collect()
    }
}

impl<T: Clone> RenderSurface<T> for RecordingSurface<T> {
    type Handle = Slot;

    fn insert_at(
        &mut self,
        template: &Arc<RowDef<T>>,
        index: usize,
        context: &RowContext<T>,
    ) -> Slot {
        assert!(index <= self.rows.len(), "insert index out of bounds");
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        self.rows.insert(index, (slot, template.id()));
        self.contexts.insert(slot, context.clone());
        self.ops.push(SurfaceOp::Insert {
            index,
            def: template.id(),
        });
        slot
    }

    fn move_to(&mut self, handle: &Slot, from: usize, to: usize) {
        assert_eq!(self.rows[from].0, *handle, "move handle out of sync");
        let row = self.rows.remove(from);
        assert!(to <= self.rows.len(), "move target out of bounds");
        self.rows.insert(to, row);
        self.ops.push(SurfaceOp::Move { from, to });
    }

    fn remove_at(&mut self, index: usize) {
        let (slot, _) = self.rows.remove(index);
        self.contexts.remove(&slot);
        self.ops.push(SurfaceOp::Remove { index });
    }

    fn set_local_context(&mut self, handle: &Slot, context: &RowContext<T>) {
        self.contexts.insert(*handle, context.clone());
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}
