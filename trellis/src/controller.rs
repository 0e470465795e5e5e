//! The table controller: orchestration of a reconciliation pass.
//!
//! The controller owns the definition registries, the dataset, the
//! render-row cache, the sequence differ, and one rendering surface per
//! row category. Everything it renders goes through two entry points:
//!
//! - [`check`](TableController::check) — the maintenance pass: validates
//!   definitions, detects column-list changes, force-renders categories
//!   whose selection criteria changed, and connects the data source.
//! - [`render_rows`](TableController::render_rows) — reconciles the
//!   current dataset into render rows, diffs against the last applied
//!   ordering, applies the operations, and republishes positional context.
//!
//! Snapshots from an attached data source are drained by
//! [`poll`](TableController::poll), one complete pass per snapshot.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::cache::{RenderRow, RenderRowCache};
use crate::column::{ColumnDef, ColumnRegistry};
use crate::context::RowContext;
use crate::def::{ColumnChangeDetector, DefId, RowDef, RowDefRegistry, RowKind};
use crate::diff::{DiffKey, DiffOp, RowsDiffer};
use crate::error::TableError;
use crate::select::RowSelector;
use crate::source::DataSource;
use crate::surface::RenderSurface;

/// Caller-supplied track function mapping a record to a stable key.
///
/// Receives the record's dataset position and the record. When set, the
/// differ keys rows by the returned string instead of render-row identity.
pub type TrackBy<T> = Arc<dyn Fn(usize, &T) -> String + Send + Sync>;

/// Orchestrates row reconciliation over three rendering surfaces.
///
/// # Example
///
/// ```ignore
/// let mut table = TableController::new(header_surface, data_surface, footer_surface);
/// table.add_column(ColumnDef::new("name"))?;
/// table.add_data_def(RowDef::data(["name"]));
/// table.check()?;
/// table.set_dataset(records);
/// table.render_rows()?;
/// ```
pub struct TableController<T: 'static, S: RenderSurface<T>> {
    columns: ColumnRegistry,
    header_defs: RowDefRegistry<T>,
    data_defs: RowDefRegistry<T>,
    footer_defs: RowDefRegistry<T>,
    no_data_def: Option<Arc<RowDef<T>>>,
    multi_row: bool,
    track_by: Option<TrackBy<T>>,

    detector: ColumnChangeDetector,
    cache: RenderRowCache<T>,
    differ: RowsDiffer<T>,
    dataset: Vec<T>,

    source: Option<Box<dyn DataSource<T>>>,
    subscription: Option<Receiver<Vec<T>>>,

    header_surface: S,
    data_surface: S,
    footer_surface: S,
    rendered: Vec<(Arc<RenderRow<T>>, S::Handle)>,
    header_handles: Vec<S::Handle>,
    footer_handles: Vec<S::Handle>,
    no_data_rendered: Option<(DefId, S::Handle)>,

    data_rebuild_needed: bool,
    ready: bool,
}

impl<T, S> TableController<T, S>
where
    T: Clone + Eq + Hash + 'static,
    S: RenderSurface<T>,
{
    /// Create a controller over one surface per row category.
    pub fn new(header_surface: S, data_surface: S, footer_surface: S) -> Self {
        Self {
            columns: ColumnRegistry::new(),
            header_defs: RowDefRegistry::new(),
            data_defs: RowDefRegistry::new(),
            footer_defs: RowDefRegistry::new(),
            no_data_def: None,
            multi_row: false,
            track_by: None,
            detector: ColumnChangeDetector::new(),
            cache: RenderRowCache::new(),
            differ: RowsDiffer::new(),
            dataset: Vec::new(),
            source: None,
            subscription: None,
            header_surface,
            data_surface,
            footer_surface,
            rendered: Vec::new(),
            header_handles: Vec::new(),
            footer_handles: Vec::new(),
            no_data_rendered: None,
            data_rebuild_needed: false,
            ready: false,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a column definition. Duplicate names are rejected.
    pub fn add_column(&mut self, column: ColumnDef) -> Result<(), TableError> {
        self.columns.add(column)
    }

    /// Remove a column definition by name. Returns true if it existed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        self.columns.remove(name)
    }

    /// Register a header row definition; the header re-renders next pass.
    pub fn add_header_def(&mut self, def: Arc<RowDef<T>>) {
        debug_assert_eq!(def.kind(), RowKind::Header);
        self.header_defs.add(def);
    }

    /// Remove a header row definition. Returns true if it existed.
    pub fn remove_header_def(&mut self, id: DefId) -> bool {
        self.header_defs.remove(id)
    }

    /// Register a footer row definition; the footer re-renders next pass.
    pub fn add_footer_def(&mut self, def: Arc<RowDef<T>>) {
        debug_assert_eq!(def.kind(), RowKind::Footer);
        self.footer_defs.add(def);
    }

    /// Remove a footer row definition. Returns true if it existed.
    pub fn remove_footer_def(&mut self, id: DefId) -> bool {
        self.footer_defs.remove(id)
    }

    /// Register a data row definition; data rows rebuild next pass.
    pub fn add_data_def(&mut self, def: Arc<RowDef<T>>) {
        debug_assert_eq!(def.kind(), RowKind::Data);
        self.data_defs.add(def);
    }

    /// Remove a data row definition. Returns true if it existed.
    pub fn remove_data_def(&mut self, id: DefId) -> bool {
        self.data_defs.remove(id)
    }

    /// Set or clear the row shown while zero data rows are rendered.
    pub fn set_no_data_def(&mut self, def: Option<Arc<RowDef<T>>>) {
        self.no_data_def = def;
        if self.ready {
            self.update_no_data_row();
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Toggle multi-row-per-record mode. A change forces a data rebuild on
    /// the next pass, since it changes how definitions are selected.
    pub fn set_multi_row(&mut self, multi_row: bool) {
        if self.multi_row != multi_row {
            self.multi_row = multi_row;
            self.data_rebuild_needed = true;
        }
    }

    /// Whether multi-row-per-record mode is on.
    pub fn multi_row(&self) -> bool {
        self.multi_row
    }

    /// Set or clear the track function. Absent, rows are keyed by
    /// render-row identity.
    pub fn set_track_by(&mut self, track_by: Option<TrackBy<T>>) {
        self.track_by = track_by;
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Replace the dataset wholesale. Takes effect on the next
    /// [`render_rows`](TableController::render_rows) or forced rebuild.
    pub fn set_dataset(&mut self, dataset: Vec<T>) {
        self.dataset = dataset;
    }

    /// Attach a data source, disconnecting any previous one first. The
    /// subscription is established on the next pass.
    pub fn attach_source(&mut self, source: Box<dyn DataSource<T>>) {
        self.subscription = None;
        if let Some(mut old) = self.source.take() {
            old.disconnect();
        }
        self.source = Some(source);
        log::debug!("data source attached");
    }

    /// Detach the data source: disconnect, clear the rendered data rows,
    /// and reset the differ to an empty baseline.
    pub fn detach_source(&mut self) {
        self.subscription = None;
        if let Some(mut source) = self.source.take() {
            source.disconnect();
        }
        self.dataset.clear();
        self.clear_data_rows();
        self.cache.clear();
        if self.ready {
            self.update_no_data_row();
        }
        log::debug!("data source detached");
    }

    /// Drain pending snapshots from the subscription, running one complete
    /// reconciliation pass per snapshot. Returns how many were processed.
    pub fn poll(&mut self) -> Result<usize, TableError> {
        let Some(subscription) = &self.subscription else {
            return Ok(0);
        };
        let mut snapshots = Vec::new();
        while let Ok(snapshot) = subscription.try_recv() {
            snapshots.push(snapshot);
        }
        let count = snapshots.len();
        for snapshot in snapshots {
            self.dataset = snapshot;
            self.render_rows()?;
        }
        Ok(count)
    }

    // =========================================================================
    // Passes
    // =========================================================================

    /// The maintenance pass.
    ///
    /// Validates the definition sets, detects column-list changes,
    /// force-renders categories whose selection criteria changed, and
    /// connects the data source when one is attached, data definitions
    /// exist, and no subscription is active. All validation happens before
    /// any surface mutation, so an error leaves rendered content as it was.
    pub fn check(&mut self) -> Result<(), TableError> {
        if self.header_defs.is_empty() && self.data_defs.is_empty() && self.footer_defs.is_empty()
        {
            return Err(TableError::NoRowDefinitions);
        }
        self.validate_columns()?;
        let selections = self.select_all()?;

        let mut header_force = self.header_defs.take_dirty();
        let mut footer_force = self.footer_defs.take_dirty();
        let mut data_force =
            self.data_defs.take_dirty() || self.data_rebuild_needed || !self.ready;

        let mut known = HashSet::new();
        for def in self.header_defs.current() {
            known.insert(def.id());
            if self.detector.has_changed(def) {
                header_force = true;
            }
        }
        for def in self.footer_defs.current() {
            known.insert(def.id());
            if self.detector.has_changed(def) {
                footer_force = true;
            }
        }
        for def in self.data_defs.current() {
            known.insert(def.id());
            if self.detector.has_changed(def) {
                data_force = true;
            }
        }
        self.detector.retain_known(known);

        if header_force {
            self.render_header_rows();
        }
        if footer_force {
            self.render_footer_rows();
        }

        if self.subscription.is_none() && !self.data_defs.is_empty() {
            if let Some(source) = self.source.as_mut() {
                self.subscription = Some(source.connect());
                log::debug!("data source subscribed");
            }
        }

        if data_force {
            self.data_rebuild_needed = false;
            self.render_with(selections, true);
        }

        self.ready = true;
        Ok(())
    }

    /// Reconcile the current dataset into rendered rows.
    ///
    /// Selection runs first and is the only fallible phase; on error the
    /// cache, the differ baseline, and the surfaces are untouched.
    pub fn render_rows(&mut self) -> Result<(), TableError> {
        let selections = self.select_all()?;
        self.render_with(selections, false);
        Ok(())
    }

    /// Tear down: clear all surfaces, release the cache, disconnect.
    pub fn destroy(&mut self) {
        self.clear_data_rows();
        for i in (0..self.header_handles.len()).rev() {
            self.header_surface.remove_at(i);
        }
        self.header_handles.clear();
        for i in (0..self.footer_handles.len()).rev() {
            self.footer_surface.remove_at(i);
        }
        self.footer_handles.clear();
        self.cache.clear();
        self.detector.clear();
        self.subscription = None;
        if let Some(mut source) = self.source.take() {
            source.disconnect();
        }
        self.ready = false;
        log::debug!("controller destroyed");
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Whether the first successful pass has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The currently rendered data rows, in render order.
    pub fn rendered_rows(&self) -> impl Iterator<Item = &Arc<RenderRow<T>>> {
        self.rendered.iter().map(|(row, _)| row)
    }

    /// The current dataset.
    pub fn dataset(&self) -> &[T] {
        &self.dataset
    }

    /// The registered columns.
    pub fn columns(&self) -> &[ColumnDef] {
        self.columns.current()
    }

    /// The header surface.
    pub fn header_surface(&self) -> &S {
        &self.header_surface
    }

    /// The header surface, mutably.
    pub fn header_surface_mut(&mut self) -> &mut S {
        &mut self.header_surface
    }

    /// The data surface.
    pub fn data_surface(&self) -> &S {
        &self.data_surface
    }

    /// The data surface, mutably.
    pub fn data_surface_mut(&mut self) -> &mut S {
        &mut self.data_surface
    }

    /// The footer surface.
    pub fn footer_surface(&self) -> &S {
        &self.footer_surface
    }

    /// The footer surface, mutably.
    pub fn footer_surface_mut(&mut self) -> &mut S {
        &mut self.footer_surface
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Check every definition's column references against the registry.
    fn validate_columns(&self) -> Result<(), TableError> {
        let defs = self
            .header_defs
            .current()
            .iter()
            .chain(self.data_defs.current())
            .chain(self.footer_defs.current())
            .chain(self.no_data_def.as_ref());
        for def in defs {
            let columns = def.columns();
            self.columns
                .verify_references(columns.iter().map(String::as_str))?;
        }
        Ok(())
    }

    /// Run the row selector over the whole dataset. Pure; any error leaves
    /// the controller untouched.
    fn select_all(&self) -> Result<Vec<Vec<Arc<RowDef<T>>>>, TableError> {
        let selector = RowSelector::new(self.data_defs.current(), self.multi_row)?;
        let mut selections = Vec::with_capacity(self.dataset.len());
        for (index, record) in self.dataset.iter().enumerate() {
            selections.push(selector.select(index, record)?);
        }
        Ok(selections)
    }

    /// The infallible tail of a render pass: reconcile, diff, apply,
    /// republish context, refresh the no-data row.
    ///
    /// With `rebuild` set, the rendered data rows and the differ baseline
    /// are dropped first, so the whole dataset re-renders from scratch.
    fn render_with(&mut self, selections: Vec<Vec<Arc<RowDef<T>>>>, rebuild: bool) {
        if rebuild {
            log::debug!("data rows: full rebuild");
            self.clear_data_rows();
        }

        let rows = self.cache.reconcile(&self.dataset, &selections);

        let keyed: Vec<(DiffKey, Arc<RenderRow<T>>)> = rows
            .iter()
            .map(|row| {
                let key = match &self.track_by {
                    Some(track) => DiffKey::Tracked(track(row.data_index(), row.record())),
                    None => DiffKey::Row(row.id()),
                };
                (key, Arc::clone(row))
            })
            .collect();

        // Structural inserts are about to land at the no-data row's
        // position; retire it first.
        if !keyed.is_empty() && self.no_data_rendered.take().is_some() {
            self.data_surface.remove_at(0);
        }

        let ops = self.differ.diff(&keyed);
        self.apply_ops(ops);
        self.publish_contexts();
        self.update_no_data_row();
    }

    /// Apply diff operations to the data surface and the rendered-row
    /// bookkeeping, in emission order.
    fn apply_ops(&mut self, ops: Vec<DiffOp<T>>) {
        for op in ops {
            match op {
                DiffOp::Remove { index } => {
                    self.data_surface.remove_at(index);
                    self.rendered.remove(index);
                }
                DiffOp::Insert { index, row } => {
                    let context = data_row_context(&row, index, 0, self.multi_row);
                    let handle = self.data_surface.insert_at(row.def(), index, &context);
                    self.rendered.insert(index, (row, handle));
                }
                DiffOp::Move { from, to } => {
                    let entry = self.rendered.remove(from);
                    self.data_surface.move_to(&entry.1, from, to);
                    self.rendered.insert(to, entry);
                }
                DiffOp::Rebind { index, row } => {
                    // Data refresh only; the context republish below hands
                    // the surface the new record.
                    self.rendered[index].0 = row;
                }
            }
        }
    }

    /// Republish positional context for every rendered data row.
    fn publish_contexts(&mut self) {
        let count = self.rendered.len();
        for (render_index, (row, handle)) in self.rendered.iter().enumerate() {
            let context = data_row_context(row, render_index, count, self.multi_row);
            self.data_surface.set_local_context(handle, &context);
        }
    }

    /// Remove all rendered data rows (and the no-data row) and reset the
    /// differ baseline.
    fn clear_data_rows(&mut self) {
        if self.no_data_rendered.take().is_some() {
            self.data_surface.remove_at(0);
        }
        for index in (0..self.rendered.len()).rev() {
            self.data_surface.remove_at(index);
        }
        self.rendered.clear();
        self.differ.clear();
    }

    /// Insert or remove the no-data row to match the rendered row count.
    fn update_no_data_row(&mut self) {
        let show = self.rendered.is_empty() && self.no_data_def.is_some();
        if show {
            let Some(def) = self.no_data_def.clone() else {
                return;
            };
            let stale = self
                .no_data_rendered
                .as_ref()
                .is_some_and(|(id, _)| *id != def.id());
            if stale && self.no_data_rendered.take().is_some() {
                self.data_surface.remove_at(0);
            }
            if self.no_data_rendered.is_none() {
                let context = RowContext::chrome(0, 1);
                let handle = self.data_surface.insert_at(&def, 0, &context);
                self.no_data_rendered = Some((def.id(), handle));
                log::debug!("no-data row shown");
            }
        } else if self.no_data_rendered.take().is_some() {
            self.data_surface.remove_at(0);
            log::debug!("no-data row removed");
        }
    }

    /// Clear and fully re-render the header rows.
    fn render_header_rows(&mut self) {
        for index in (0..self.header_handles.len()).rev() {
            self.header_surface.remove_at(index);
        }
        self.header_handles.clear();
        let defs: Vec<_> = self.header_defs.current().to_vec();
        let count = defs.len();
        for (index, def) in defs.iter().enumerate() {
            let context = RowContext::chrome(index, count);
            let handle = self.header_surface.insert_at(def, index, &context);
            self.header_handles.push(handle);
        }
        log::debug!("header rows rendered: {count}");
    }

    /// Clear and fully re-render the footer rows.
    fn render_footer_rows(&mut self) {
        for index in (0..self.footer_handles.len()).rev() {
            self.footer_surface.remove_at(index);
        }
        self.footer_handles.clear();
        let defs: Vec<_> = self.footer_defs.current().to_vec();
        let count = defs.len();
        for (index, def) in defs.iter().enumerate() {
            let context = RowContext::chrome(index, count);
            let handle = self.footer_surface.insert_at(def, index, &context);
            self.footer_handles.push(handle);
        }
        log::debug!("footer rows rendered: {count}");
    }
}

/// Build the context for a rendered data row.
fn data_row_context<T: Clone>(
    row: &RenderRow<T>,
    render_index: usize,
    count: usize,
    multi_row: bool,
) -> RowContext<T> {
    let mut context = RowContext::positional(render_index, count);
    context.record = Some(row.record().clone());
    if multi_row {
        context.data_index = Some(row.data_index());
        context.render_index = Some(render_index);
    } else {
        context.index = Some(row.data_index());
    }
    context
}
