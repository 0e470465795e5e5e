//! Row selection: which data row definitions apply to a record.

use std::sync::Arc;

use crate::def::RowDef;
use crate::error::TableError;

/// Per-pass view over the data row definitions.
///
/// Built fresh from the registry at the start of each pass. Construction
/// validates the default-definition invariant; [`select`](RowSelector::select)
/// then resolves the ordered definition list per record.
///
/// Selection policy:
/// - exactly one registered definition applies to every record, predicate
///   or not;
/// - multi-row mode takes the prefix of definitions whose predicate passes
///   (a predicate-less definition passes) and stops at the first failure,
///   so definitions after a failing one are never consulted;
/// - single-row mode takes the first definition whose predicate passes,
///   falling back to the predicate-less default.
#[derive(Debug)]
pub struct RowSelector<'a, T> {
    defs: &'a [Arc<RowDef<T>>],
    default: Option<&'a Arc<RowDef<T>>>,
    multi_row: bool,
}

impl<'a, T> RowSelector<'a, T> {
    /// Build a selector over the registered data definitions.
    ///
    /// With multi-row mode off, more than one predicate-less definition is
    /// `MultipleDefaultRowDefinitions`.
    pub fn new(defs: &'a [Arc<RowDef<T>>], multi_row: bool) -> Result<Self, TableError> {
        let mut defaults = defs.iter().filter(|d| d.is_default());
        let default = defaults.next();
        if !multi_row && defaults.next().is_some() {
            return Err(TableError::MultipleDefaultRowDefinitions);
        }
        Ok(Self {
            defs,
            default,
            multi_row,
        })
    }

    /// Resolve the ordered row definitions for a record.
    ///
    /// Never returns an empty list: an empty selection is
    /// `NoMatchingRowDefinition`.
    pub fn select(&self, index: usize, record: &T) -> Result<Vec<Arc<RowDef<T>>>, TableError> {
        // A single registered definition always applies, predicate or not.
        if self.defs.len() == 1 {
            return Ok(vec![Arc::clone(&self.defs[0])]);
        }

        let selected: Vec<Arc<RowDef<T>>> = if self.multi_row {
            self.defs
                .iter()
                .take_while(|def| def.matches(index, record))
                .cloned()
                .collect()
        } else {
            self.defs
                .iter()
                .find(|def| !def.is_default() && def.matches(index, record))
                .or(self.default)
                .cloned()
                .into_iter()
                .collect()
        };

        if selected.is_empty() {
            return Err(TableError::NoMatchingRowDefinition(index));
        }
        Ok(selected)
    }
}
