//! # Index Row Layout Planning
//!
//! `RowLayout` answers, for one index descriptor: how many logical fields
//! does an index row have, how many of them live in the KEY buffer, does the
//! row begin with a linearized spatial field, and does the layout split
//! fields across KEY and VALUE at all. The answers are fixed per binding —
//! the row buffer computes a layout once at reset time and never re-derives
//! it mid-population.

use crate::schema::IndexDef;

/// Physical field layout of one index row. Pure function of the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    total_fields: usize,
    key_field_count: usize,
    spatial_dimensions: Option<usize>,
    splits: bool,
}

impl RowLayout {
    pub fn plan(index: &IndexDef) -> Self {
        if index.is_spatial() {
            // One linearized field stands in for all declared columns;
            // spatial rows never split across KEY and VALUE.
            let dimensions = index.key_columns().len();
            let total_fields = index.all_column_count() - dimensions + 1;
            Self {
                total_fields,
                key_field_count: total_fields,
                spatial_dimensions: Some(dimensions),
                splits: false,
            }
        } else if index.is_unique() {
            Self {
                total_fields: index.all_column_count(),
                key_field_count: index.key_columns().len(),
                spatial_dimensions: None,
                splits: true,
            }
        } else {
            let total_fields = index.all_column_count();
            Self {
                total_fields,
                key_field_count: total_fields,
                spatial_dimensions: None,
                splits: false,
            }
        }
    }

    /// Logical field count of the row (the null separator, when present, is
    /// physical only and not counted here).
    pub fn total_fields(&self) -> usize {
        self.total_fields
    }

    /// How many leading logical fields live in the KEY buffer.
    pub fn key_field_count(&self) -> usize {
        self.key_field_count
    }

    pub fn spatial_dimensions(&self) -> Option<usize> {
        self.spatial_dimensions
    }

    /// True when trailing fields live in the VALUE buffer (unique table
    /// indexes only).
    pub fn splits(&self) -> bool {
        self.splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexrow::spatial::ZOrderCurve;
    use crate::schema::{IndexColumn, IndexDef, IndexKind};
    use crate::types::DataType;
    use std::sync::Arc;

    fn col(name: &str, pos: usize) -> IndexColumn {
        IndexColumn::new(name, DataType::Int8, pos)
    }

    fn def(kind: IndexKind, key: usize, hkey: usize) -> IndexDef {
        let key_columns = (0..key).map(|i| col(&format!("k{}", i), i)).collect();
        let hkey_columns = (0..hkey).map(|i| col(&format!("h{}", i), key + i)).collect();
        IndexDef::new(1, "idx", kind, key_columns, hkey_columns)
    }

    #[test]
    fn non_unique_table_index_keeps_all_fields_in_key() {
        let layout = RowLayout::plan(&def(IndexKind::Table, 2, 1));
        assert_eq!(layout.total_fields(), 3);
        assert_eq!(layout.key_field_count(), 3);
        assert!(!layout.splits());
    }

    #[test]
    fn primary_index_keeps_all_fields_in_key() {
        let layout = RowLayout::plan(&def(IndexKind::Primary, 1, 0));
        assert_eq!(layout.total_fields(), 1);
        assert_eq!(layout.key_field_count(), 1);
        assert!(!layout.splits());
    }

    #[test]
    fn unique_index_splits_at_declared_column_count() {
        let layout = RowLayout::plan(&def(IndexKind::Unique, 2, 3));
        assert_eq!(layout.total_fields(), 5);
        assert_eq!(layout.key_field_count(), 2);
        assert!(layout.splits());
    }

    #[test]
    fn group_index_keeps_all_fields_in_key() {
        let layout = RowLayout::plan(&def(IndexKind::Group, 3, 2));
        assert_eq!(layout.total_fields(), 5);
        assert_eq!(layout.key_field_count(), 5);
        assert!(!layout.splits());
    }

    #[test]
    fn spatial_index_collapses_coordinates_into_one_field() {
        let index = def(IndexKind::Spatial, 2, 2).with_space(Arc::new(ZOrderCurve::new(2).unwrap()));
        let layout = RowLayout::plan(&index);
        // 4 columns - 2 coordinates + 1 z-value
        assert_eq!(layout.total_fields(), 3);
        assert_eq!(layout.key_field_count(), 3);
        assert_eq!(layout.spatial_dimensions(), Some(2));
        assert!(!layout.splits());
    }
}
