//! The rendering surface capability the controller drives.

use std::sync::Arc;

use crate::context::RowContext;
use crate::def::RowDef;

/// A surface that can materialize, move, and remove row instances.
///
/// The controller owns one surface per row category (header, data,
/// footer) and only ever talks to it through this trait: structural
/// operations by position, data updates through the handle returned at
/// insertion. Presentation is entirely the surface's business; the engine
/// hands it the row definition (template) and the row context and stops
/// there.
///
/// Positions always refer to the surface's current state at call time;
/// the controller orders its operations so they stay valid when applied
/// one by one.
pub trait RenderSurface<T> {
    /// Surface-specific handle to one materialized row.
    type Handle;

    /// Materialize a row from `template` at `index`, with its initial
    /// context. Rows at `index` and beyond shift one position down.
    fn insert_at(
        &mut self,
        template: &Arc<RowDef<T>>,
        index: usize,
        context: &RowContext<T>,
    ) -> Self::Handle;

    /// Move the row identified by `handle` from position `from` so it ends
    /// up at position `to` (its position after removal and reinsertion).
    fn move_to(&mut self, handle: &Self::Handle, from: usize, to: usize);

    /// Remove the row at `index`.
    fn remove_at(&mut self, index: usize);

    /// Publish a new context for the row identified by `handle`.
    fn set_local_context(&mut self, handle: &Self::Handle, context: &RowContext<T>);

    /// Number of rows currently materialized.
    fn len(&self) -> usize;

    /// Check whether no rows are materialized.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
