//! Column definitions and the column registry.

use std::collections::HashSet;

use crate::error::TableError;

/// A named column definition.
///
/// The name is the id row definitions refer to; it must be unique within a
/// table. The cell flags describe which row categories the rendering
/// surface can instantiate a cell for. The engine itself only validates
/// names; the flags are metadata for the surface.
///
/// # Examples
///
/// ```
/// use trellis::ColumnDef;
///
/// let col = ColumnDef::new("age").footer_cell(false);
/// assert!(col.has_data_cell());
/// assert!(!col.has_footer_cell());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    has_header_cell: bool,
    has_footer_cell: bool,
    has_data_cell: bool,
}

impl ColumnDef {
    /// Create a new column definition with all cell categories enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_header_cell: true,
            has_footer_cell: true,
            has_data_cell: true,
        }
    }

    /// Set whether this column provides a header cell.
    pub fn header_cell(mut self, yes: bool) -> Self {
        self.has_header_cell = yes;
        self
    }

    /// Set whether this column provides a footer cell.
    pub fn footer_cell(mut self, yes: bool) -> Self {
        self.has_footer_cell = yes;
        self
    }

    /// Set whether this column provides a data cell.
    pub fn data_cell(mut self, yes: bool) -> Self {
        self.has_data_cell = yes;
        self
    }

    /// The unique column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this column provides a header cell.
    pub fn has_header_cell(&self) -> bool {
        self.has_header_cell
    }

    /// Whether this column provides a footer cell.
    pub fn has_footer_cell(&self) -> bool {
        self.has_footer_cell
    }

    /// Whether this column provides a data cell.
    pub fn has_data_cell(&self) -> bool {
        self.has_data_cell
    }
}

/// Registry of column definitions.
///
/// Declared and programmatically added columns all go through here; the
/// registry is the single source of truth consulted on every pass.
/// Duplicate names are rejected at registration time.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDef>,
}

impl ColumnRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Register a column definition.
    ///
    /// Returns `DuplicateColumnName` if a column with the same name is
    /// already registered.
    pub fn add(&mut self, column: ColumnDef) -> Result<(), TableError> {
        if self.contains(column.name()) {
            return Err(TableError::DuplicateColumnName(column.name().to_string()));
        }
        log::trace!("column registered: {}", column.name());
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column definition by name. Returns true if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c.name() != name);
        before != self.columns.len()
    }

    /// The currently registered columns, in registration order.
    pub fn current(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Check whether a column with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    /// Number of registered columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Verify that every name in `referenced` is registered.
    ///
    /// Returns `UnknownColumnReference` for the first missing name.
    pub fn verify_references<'a>(
        &self,
        referenced: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), TableError> {
        let known: HashSet<&str> = self.columns.iter().map(|c| c.name()).collect();
        for name in referenced {
            if !known.contains(name) {
                return Err(TableError::UnknownColumnReference(name.to_string()));
            }
        }
        Ok(())
    }
}
