//! Row definitions, per-category registries, and column-change detection.
//!
//! A row definition is a template for one category of row (header, footer,
//! or data) plus the ordered list of column names it renders. Data
//! definitions may carry a predicate deciding which records they apply to;
//! the predicate-less one is the table's default.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// The category a row definition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// Rendered once per definition above the data rows.
    Header,
    /// Rendered once per definition below the data rows.
    Footer,
    /// Rendered per record, as decided by the row selector.
    Data,
}

/// Unique identifier for a row definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(usize);

impl DefId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "__def_{}", self.0)
    }
}

/// Predicate deciding whether a data row definition applies to a record.
///
/// Receives the record's position in the dataset and the record itself.
pub type RowPredicate<T> = Arc<dyn Fn(usize, &T) -> bool + Send + Sync>;

/// A row definition: kind, ordered column list, optional predicate.
///
/// Column ordering is meaningful render order, not just membership. The
/// column list can be swapped at runtime with [`set_columns`]; the
/// [`ColumnChangeDetector`] picks that up on the next pass and forces a
/// full re-render of the owning category.
///
/// Definitions are shared as `Arc<RowDef<T>>`; their [`DefId`] is the
/// identity used by the render-row cache and the column-change detector.
///
/// [`set_columns`]: RowDef::set_columns
///
/// # Examples
///
/// ```
/// use trellis::RowDef;
///
/// let default = RowDef::<u32>::data(["name", "age"]);
/// let minors = RowDef::data_when(["name"], |_, age: &u32| *age < 18);
/// assert!(default.is_default());
/// assert!(!minors.is_default());
/// ```
pub struct RowDef<T> {
    id: DefId,
    kind: RowKind,
    columns: RwLock<Vec<String>>,
    predicate: Option<RowPredicate<T>>,
}

impl<T> RowDef<T> {
    fn new(kind: RowKind, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: DefId::new(),
            kind,
            columns: RwLock::new(columns.into_iter().map(Into::into).collect()),
            predicate: None,
        }
    }

    /// Create a header row definition.
    pub fn header(columns: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Arc::new(Self::new(RowKind::Header, columns))
    }

    /// Create a footer row definition.
    pub fn footer(columns: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Arc::new(Self::new(RowKind::Footer, columns))
    }

    /// Create a data row definition without a predicate (the default).
    pub fn data(columns: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Arc::new(Self::new(RowKind::Data, columns))
    }

    /// Create a data row definition guarded by a predicate.
    pub fn data_when(
        columns: impl IntoIterator<Item = impl Into<String>>,
        predicate: impl Fn(usize, &T) -> bool + Send + Sync + 'static,
    ) -> Arc<Self> {
        let mut def = Self::new(RowKind::Data, columns);
        def.predicate = Some(Arc::new(predicate));
        Arc::new(def)
    }

    /// This definition's identity.
    pub fn id(&self) -> DefId {
        self.id
    }

    /// The category this definition belongs to.
    pub fn kind(&self) -> RowKind {
        self.kind
    }

    /// The ordered column names this definition currently renders.
    pub fn columns(&self) -> Vec<String> {
        self.columns.read().map(|g| g.clone()).unwrap_or_default()
    }

    /// Replace the ordered column list.
    ///
    /// Takes effect on the next pass, when the column-change detector
    /// forces a re-render of this definition's category.
    pub fn set_columns(&self, columns: impl IntoIterator<Item = impl Into<String>>) {
        if let Ok(mut guard) = self.columns.write() {
            *guard = columns.into_iter().map(Into::into).collect();
        }
    }

    /// Whether this definition has no predicate.
    pub fn is_default(&self) -> bool {
        self.predicate.is_none()
    }

    /// Evaluate the predicate for a record. No predicate counts as a match.
    pub fn matches(&self, index: usize, record: &T) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(index, record),
            None => true,
        }
    }
}

impl<T> fmt::Debug for RowDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowDef")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("columns", &self.columns())
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Registry for one category of row definitions.
///
/// The controller consults registries, never framework introspection, so
/// declared and programmatically added definitions go through the same
/// `add`/`remove` calls. Mutation sets a dirty bit the controller reads
/// (and clears) once per pass to decide on forced re-renders.
#[derive(Debug)]
pub struct RowDefRegistry<T> {
    defs: Vec<Arc<RowDef<T>>>,
    dirty: bool,
}

impl<T> Default for RowDefRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RowDefRegistry<T> {
    /// Create an empty registry. A fresh registry reports dirty so the
    /// category renders at least once.
    pub fn new() -> Self {
        Self {
            defs: Vec::new(),
            dirty: true,
        }
    }

    /// Register a definition at the end of the declared order.
    pub fn add(&mut self, def: Arc<RowDef<T>>) {
        log::trace!("row definition registered: {} ({:?})", def.id(), def.kind());
        self.defs.push(def);
        self.dirty = true;
    }

    /// Remove a definition by identity. Returns true if it existed.
    pub fn remove(&mut self, id: DefId) -> bool {
        let before = self.defs.len();
        self.defs.retain(|d| d.id() != id);
        let removed = before != self.defs.len();
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// The registered definitions in declared order.
    pub fn current(&self) -> &[Arc<RowDef<T>>] {
        &self.defs
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Read and clear the dirty bit.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Detects column-list changes per row definition.
///
/// Retains the column list last seen for each definition and compares by
/// sequence equality, so both membership and order changes trigger. The
/// first observation of a definition counts as a change; that is what makes
/// every category render at least once on the first pass.
#[derive(Debug, Default)]
pub struct ColumnChangeDetector {
    seen: HashMap<DefId, Vec<String>>,
}

impl ColumnChangeDetector {
    /// Create an empty detector.
    pub fn new() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }

    /// Diff a definition's current column list against the retained one.
    ///
    /// On change the retained list is replaced. Only a boolean comes out;
    /// a change means the owning category needs a full re-render, not an
    /// incremental patch.
    pub fn has_changed<T>(&mut self, def: &RowDef<T>) -> bool {
        let current = def.columns();
        match self.seen.get(&def.id()) {
            Some(prev) if *prev == current => false,
            _ => {
                self.seen.insert(def.id(), current);
                true
            }
        }
    }

    /// Drop retained lists for definitions no longer registered.
    pub fn retain_known(&mut self, known: impl IntoIterator<Item = DefId>) {
        let known: HashSet<DefId> = known.into_iter().collect();
        self.seen.retain(|id, _| known.contains(id));
    }

    /// Forget everything, as if no definition had ever been observed.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
