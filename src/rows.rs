//! # Row Data Source
//!
//! The index row codec reads column values out of a stored row while
//! populating an index entry. `RowSource` is the seam between this crate and
//! whatever owns the row bytes: the executor's decoded row, a record view
//! over a page, or a plain vector of values in tests.
//!
//! Access is positional. The index descriptor records, for every column it
//! touches, that column's position in the owning table's stored row; the
//! codec never resolves column names.

use crate::types::Value;
use eyre::{eyre, Result};

/// Random access to a stored row's column values by position.
pub trait RowSource {
    /// Number of columns in the row.
    fn column_count(&self) -> usize;

    /// Value of the column at `position`. Fails if `position` is outside the
    /// row.
    fn column_value(&self, position: usize) -> Result<Value<'_>>;
}

impl<'a> RowSource for [Value<'a>] {
    fn column_count(&self) -> usize {
        self.len()
    }

    fn column_value(&self, position: usize) -> Result<Value<'_>> {
        self.get(position)
            .map(Value::borrowed)
            .ok_or_else(|| eyre!("column position {} out of bounds ({} columns)", position, self.len()))
    }
}

impl<'a> RowSource for Vec<Value<'a>> {
    fn column_count(&self) -> usize {
        self.len()
    }

    fn column_value(&self, position: usize) -> Result<Value<'_>> {
        self.as_slice().column_value(position)
    }
}
