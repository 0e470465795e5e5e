//! Error types for reconciliation passes.

use thiserror::Error;

/// Errors that abort a reconciliation pass.
///
/// All of these are fatal: the pass that detects one stops before touching
/// the rendering surface, so previously rendered content stays as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Header, footer, and data definition sets are all empty.
    #[error("No row definitions registered: add at least one header, footer, or data row definition")]
    NoRowDefinitions,

    /// Two column definitions share a name.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumnName(String),

    /// More than one predicate-less data row definition while multi-row
    /// mode is off.
    #[error("Multiple default row definitions: only one data row definition may omit its predicate")]
    MultipleDefaultRowDefinitions,

    /// No row definition matched the record at the given data index.
    #[error("No row definition matched the record at index {0}")]
    NoMatchingRowDefinition(usize),

    /// A row definition references a column id that is not registered.
    #[error("Row definition references unknown column '{0}'")]
    UnknownColumnReference(String),
}
