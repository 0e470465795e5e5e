//! Positional context published to rendered rows.

/// Context the controller publishes for one rendered row.
///
/// Republished for every rendered data row after each apply, so the
/// positional fields are always consistent with the final ordering. Header
/// and footer rows receive a record-less context with only `index` and the
/// positional flags set relative to their own category.
///
/// In single-row-per-record mode `index` is set; in multi-row mode a row
/// instead carries `data_index` (position of its record in the dataset)
/// and `render_index` (position of the row among all rendered rows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContext<T> {
    /// The record this row displays; `None` for header and footer rows.
    pub record: Option<T>,
    /// Total number of rendered rows in this category.
    pub count: usize,
    /// Whether this is the first row.
    pub first: bool,
    /// Whether this is the last row.
    pub last: bool,
    /// Whether the row position is even.
    pub even: bool,
    /// Whether the row position is odd.
    pub odd: bool,
    /// Row position; set when multi-row mode is off.
    pub index: Option<usize>,
    /// Position of the record in the dataset; set in multi-row mode.
    pub data_index: Option<usize>,
    /// Position among all rendered rows; set in multi-row mode.
    pub render_index: Option<usize>,
}

impl<T> Default for RowContext<T> {
    fn default() -> Self {
        Self {
            record: None,
            count: 0,
            first: false,
            last: false,
            even: false,
            odd: false,
            index: None,
            data_index: None,
            render_index: None,
        }
    }
}

impl<T> RowContext<T> {
    /// Context for a header or footer row at `index` of `count` rows.
    pub fn chrome(index: usize, count: usize) -> Self {
        Self {
            record: None,
            index: Some(index),
            ..Self::positional(index, count)
        }
    }

    /// Positional flags for position `index` out of `count`.
    pub fn positional(index: usize, count: usize) -> Self {
        Self {
            record: None,
            count,
            first: index == 0,
            last: index + 1 == count,
            even: index % 2 == 0,
            odd: index % 2 == 1,
            index: None,
            data_index: None,
            render_index: None,
        }
    }
}
