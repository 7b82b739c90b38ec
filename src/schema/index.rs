//! # Index Definitions
//!
//! An `IndexDef` describes one SQL-visible index: its kind, its declared key
//! columns, the undeclared hkey-derived columns appended to locate the owning
//! row, and two declarative mappings consumed by the codec:
//!
//! - `row_composition` — for each logical field of the index row, where the
//!   value comes from (a stored-row column or an hkey segment)
//! - `index_to_hkey` — for each segment of the owning row's hkey, how to
//!   rebuild it from an index entry (a literal table ordinal or an index-row
//!   field)
//!
//! ## Index Kinds
//!
//! | Kind | Description |
//! |------|-------------|
//! | Table | non-unique secondary index on one table |
//! | Primary | primary key index (columns are NOT NULL) |
//! | Unique | unique secondary index, may contain nullable columns |
//! | Group | index spanning columns of multiple tables in one group |
//! | Spatial | index over linearized coordinates |
//!
//! Group indexes are never unique and never spatial; a spatial index's
//! partitioner must have exactly one dimension per declared column.
//! `validate` enforces these invariants when a definition is bound to a row
//! buffer.

use crate::indexrow::spatial::SpaceCurve;
use crate::types::DataType;
use eyre::{ensure, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Table,
    Primary,
    Unique,
    Group,
    Spatial,
}

/// One column of an index: declared or hkey-derived.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    name: String,
    data_type: DataType,
    nullable: bool,
    row_position: usize,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>, data_type: DataType, row_position: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            row_position,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Position of this column in the owning table's stored row.
    pub fn row_position(&self) -> usize {
        self.row_position
    }
}

/// Source of one logical field of an index row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Value of the stored row's column at this position.
    RowColumn(usize),
    /// Verbatim copy of this segment of the row's hkey.
    HKeySegment(usize),
}

/// One segment of the reconstructed hkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HKeyElement {
    /// Literal table ordinal within the group hierarchy.
    Ordinal(u32),
    /// Copy of the index row's field at this logical position.
    IndexField(usize),
}

#[derive(Debug, Clone)]
pub struct IndexDef {
    id: u64,
    name: String,
    kind: IndexKind,
    key_columns: Vec<IndexColumn>,
    hkey_columns: Vec<IndexColumn>,
    row_composition: Vec<FieldSource>,
    index_to_hkey: Vec<HKeyElement>,
    space: Option<Arc<dyn SpaceCurve>>,
}

impl IndexDef {
    /// `key_columns` are the declared index columns; `hkey_columns` are the
    /// undeclared hkey-derived columns appended after them.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        kind: IndexKind,
        key_columns: Vec<IndexColumn>,
        hkey_columns: Vec<IndexColumn>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            key_columns,
            hkey_columns,
            row_composition: Vec::new(),
            index_to_hkey: Vec::new(),
            space: None,
        }
    }

    pub fn with_row_composition(mut self, composition: Vec<FieldSource>) -> Self {
        self.row_composition = composition;
        self
    }

    pub fn with_hkey_map(mut self, map: Vec<HKeyElement>) -> Self {
        self.index_to_hkey = map;
        self
    }

    pub fn with_space(mut self, space: Arc<dyn SpaceCurve>) -> Self {
        self.space = Some(space);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Declared index columns.
    pub fn key_columns(&self) -> &[IndexColumn] {
        &self.key_columns
    }

    /// Undeclared hkey-derived columns.
    pub fn hkey_columns(&self) -> &[IndexColumn] {
        &self.hkey_columns
    }

    /// Declared plus undeclared column count.
    pub fn all_column_count(&self) -> usize {
        self.key_columns.len() + self.hkey_columns.len()
    }

    pub fn row_composition(&self) -> &[FieldSource] {
        &self.row_composition
    }

    pub fn index_to_hkey(&self) -> &[HKeyElement] {
        &self.index_to_hkey
    }

    pub fn space(&self) -> Option<&Arc<dyn SpaceCurve>> {
        self.space.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.kind == IndexKind::Unique
    }

    pub fn is_group(&self) -> bool {
        self.kind == IndexKind::Group
    }

    pub fn is_spatial(&self) -> bool {
        self.kind == IndexKind::Spatial
    }

    /// True for the one layout that needs null disambiguation: a unique
    /// index with at least one nullable declared column. Primary keys are
    /// excluded because their columns are NOT NULL.
    pub fn unique_and_may_contain_nulls(&self) -> bool {
        self.is_unique() && self.key_columns.iter().any(IndexColumn::is_nullable)
    }

    /// Structural invariants checked when a definition is bound to an index
    /// row buffer.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            IndexKind::Spatial => {
                let space = self.space.as_ref();
                ensure!(
                    space.is_some(),
                    "spatial index '{}' has no space partitioner",
                    self.name
                );
                if let Some(space) = space {
                    ensure!(
                        space.dimensions() == self.key_columns.len(),
                        "spatial index '{}' declares {} columns but its space has {} dimensions",
                        self.name,
                        self.key_columns.len(),
                        space.dimensions()
                    );
                }
            }
            IndexKind::Group => {
                ensure!(
                    self.space.is_none(),
                    "group index '{}' cannot be spatial",
                    self.name
                );
            }
            _ => {
                ensure!(
                    self.space.is_none(),
                    "index '{}' is not spatial but has a space partitioner",
                    self.name
                );
            }
        }
        Ok(())
    }
}
