//! # Index Row Buffer
//!
//! `IndexRowBuffer` is the reusable aggregate that builds, inspects, and
//! decomposes one index row at a time. It is bound to one index descriptor
//! per `reset`, populated field-by-field in strictly increasing logical
//! order, finalized by `close`, and then either persisted through its
//! `key_bytes`/`value_bytes` surface or refilled from persisted bytes for
//! scanning.
//!
//! ## Field Routing
//!
//! Logical fields and physical buffers do not line up one-to-one. An index
//! row's fields are addressed by logical position as if KEY and VALUE were
//! one contiguous sequence; the layout's `key_field_count` is the split
//! point. While `appended_fields < key_field_count`, appends land in the KEY
//! buffer; from then on they land permanently in the VALUE staging buffer
//! for the remainder of the row. `resolve_field` applies the same split for
//! every positional read, so population, cross-copy, typed reads, and hkey
//! reconstruction all share one boundary rule.
//!
//! For layouts that split (unique table indexes), the staged undeclared
//! fields are encoded exactly like key fields — that is what makes the
//! cross-buffer byte comparison in `compare_to` possible — and `close`
//! materializes their bytes into the opaque VALUE payload in one step.
//!
//! ## Lifecycle
//!
//! ```text
//! reset_for_write ──> initialize_from_row / append_column_value ──> close
//!      ^                                                             |
//!      |                                                      key_bytes /
//!      |                                                      value_bytes
//!      +── reset_for_read <── persisted entry ── ordered store <─────+
//! ```
//!
//! A reset fully overwrites all lifecycle state from the previous row;
//! abandoning a half-populated buffer and resetting it leaves no residue.

use crate::encoding::FieldBuffer;
use crate::rows::RowSource;
use crate::schema::{FieldSource, HKeyElement, IndexColumn, IndexDef};
use crate::types::Value;
use eyre::{ensure, Result};
use std::sync::Arc;

use super::layout::RowLayout;
use super::null_separator::NullSeparatorAllocator;
use super::spatial;

pub struct IndexRowBuffer {
    index: Arc<IndexDef>,
    layout: RowLayout,
    key: FieldBuffer,
    value_fields: FieldBuffer,
    value: Vec<u8>,
    appended_fields: usize,
    writable: bool,
    allocator: Arc<NullSeparatorAllocator>,
}

impl IndexRowBuffer {
    /// Creates a buffer bound to `index` in write mode.
    pub fn new(index: Arc<IndexDef>, allocator: Arc<NullSeparatorAllocator>) -> Result<Self> {
        index.validate()?;
        let layout = RowLayout::plan(&index);
        Ok(Self {
            index,
            layout,
            key: FieldBuffer::new(),
            value_fields: FieldBuffer::new(),
            value: Vec::new(),
            appended_fields: 0,
            writable: true,
            allocator,
        })
    }

    /// Rebinds this buffer to a table-shaped index for writing.
    pub fn reset_for_write(&mut self, index: Arc<IndexDef>) -> Result<()> {
        ensure!(
            !index.is_group(),
            "group index '{}' requires reset_for_group_write",
            index.name()
        );
        self.rebind(index, true)
    }

    /// Rebinds this buffer to a group index for writing.
    pub fn reset_for_group_write(&mut self, index: Arc<IndexDef>) -> Result<()> {
        ensure!(
            index.is_group(),
            "index '{}' is not a group index",
            index.name()
        );
        self.rebind(index, true)
    }

    /// Rebinds this buffer over a persisted index entry for reading.
    pub fn reset_for_read(
        &mut self,
        index: Arc<IndexDef>,
        key_bytes: &[u8],
        value_bytes: &[u8],
    ) -> Result<()> {
        self.rebind(index, false)?;
        self.key.attach(key_bytes)?;
        if self.layout.splits() {
            self.value_fields.attach(value_bytes)?;
        } else {
            self.value.extend_from_slice(value_bytes);
        }
        Ok(())
    }

    pub fn index(&self) -> &IndexDef {
        &self.index
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn key_field_count(&self) -> usize {
        self.layout.key_field_count()
    }

    /// Populates the row from stored row data and the owning row's hkey,
    /// following the index's composition mapping. For spatial indexes the
    /// coordinate columns are first collapsed into one linearized field.
    pub fn initialize_from_row(&mut self, row: &dyn RowSource, hkey: &FieldBuffer) -> Result<()> {
        ensure!(
            self.writable,
            "index row buffer for '{}' is not writable",
            self.index.name()
        );
        let index = Arc::clone(&self.index);
        let composition = index.row_composition();
        let expected = match self.layout.spatial_dimensions() {
            // spatial composition covers the original coordinate columns
            Some(dims) => self.layout.total_fields() + dims - 1,
            None => self.layout.total_fields(),
        };
        ensure!(
            composition.len() == expected,
            "invalid index row composition for '{}': {} entries, expected {}",
            index.name(),
            composition.len(),
            expected
        );
        self.appended_fields = 0;
        let mut field = 0;
        if let Some(dims) = self.layout.spatial_dimensions() {
            let z = spatial::linearized_coordinate(&index, row)?;
            self.append_routed_value(&Value::Int(z))?;
            field = dims;
        }
        while field < composition.len() {
            match composition[field] {
                FieldSource::RowColumn(position) => {
                    let value = row.column_value(position)?;
                    self.append_routed_value(&value)?;
                }
                FieldSource::HKeySegment(segment) => {
                    self.append_routed_segment(hkey, segment)?;
                }
            }
            field += 1;
        }
        Ok(())
    }

    /// Appends one column value directly. This is the group-index population
    /// path; other kinds populate through `initialize_from_row`.
    pub fn append_column_value(&mut self, column: &IndexColumn, value: &Value) -> Result<()> {
        ensure!(
            self.writable,
            "index row buffer for '{}' is not writable",
            self.index.name()
        );
        ensure!(
            self.index.is_group(),
            "direct column append requires a group index, '{}' is {:?}",
            self.index.name(),
            self.index.kind()
        );
        ensure!(
            value.matches_type(column.data_type()),
            "value type mismatch for column '{}' of group index '{}'",
            column.name(),
            self.index.name()
        );
        self.append_routed_value(value)
    }

    /// Finalizes the physical layout: appends the null separator when the
    /// index needs one, then materializes the staged undeclared fields into
    /// the VALUE payload. Terminal step before persistence.
    pub fn close(&mut self) -> Result<()> {
        ensure!(
            self.writable,
            "index row buffer for '{}' is not writable",
            self.index.name()
        );
        if self.index.unique_and_may_contain_nulls() {
            let declared = self.index.key_columns().len();
            let mut has_null = false;
            for field in 0..declared {
                if self.key.is_null_field(field)? {
                    has_null = true;
                    break;
                }
            }
            let separator = if has_null {
                self.allocator.next_value(self.index.id()) as i64
            } else {
                0
            };
            // The separator lives in the KEY, after the declared fields.
            self.key.append_int(separator);
        }
        if self.layout.splits() {
            self.value.clear();
            self.value.extend_from_slice(self.value_fields.encoded_bytes());
        }
        Ok(())
    }

    /// Copies the already-encoded field at logical `position` into `target`,
    /// crossing the KEY/VALUE split transparently.
    pub fn append_field_to(&self, position: usize, target: &mut FieldBuffer) -> Result<()> {
        let (buffer, resolved) = self.resolve_field(position)?;
        target.append_field_from(buffer, resolved)
    }

    /// Typed read of the field at logical `position`.
    pub fn field_value(&self, position: usize) -> Result<Value<'_>> {
        let (buffer, resolved) = self.resolve_field(position)?;
        buffer.read_field(resolved)
    }

    /// Rebuilds the owning row's hkey from this index entry into `dest`,
    /// following the declarative index-to-hkey mapping: literal table
    /// ordinals are appended directly, everything else is a verbatim copy of
    /// an index-row field.
    pub fn construct_hkey(&self, dest: &mut FieldBuffer, map: &[HKeyElement]) -> Result<()> {
        dest.clear();
        for element in map {
            match *element {
                HKeyElement::Ordinal(ordinal) => dest.append_int(ordinal as i64),
                HKeyElement::IndexField(position) => {
                    let resolved = if self.index.is_spatial() {
                        // The single z-value field stands in for all
                        // declared columns.
                        let adjusted =
                            position as i64 - self.index.key_columns().len() as i64 + 1;
                        ensure!(
                            adjusted >= 0,
                            "malformed index-to-hkey mapping for '{}': field {} resolves to {}",
                            self.index.name(),
                            position,
                            adjusted
                        );
                        adjusted as usize
                    } else {
                        position
                    };
                    let (buffer, field) = self.resolve_field(resolved)?;
                    dest.append_field_from(buffer, field)?;
                }
            }
        }
        Ok(())
    }

    /// Compares this row to `other` treating KEY and VALUE as one contiguous
    /// field sequence, without copying.
    ///
    /// Returns `0` when `field_count` fields starting at the given positions
    /// match. Otherwise the magnitude is `matched_fields + 1` — callers rely
    /// on recovering how many leading fields were equal — and the sign is
    /// that of the first differing byte (unsigned order). Not supported for
    /// spatial indexes.
    pub fn compare_to(
        &self,
        other: &IndexRowBuffer,
        self_start: usize,
        other_start: usize,
        field_count: usize,
    ) -> Result<i32> {
        super::compare::compare_rows(self, self_start, other, other_start, field_count)
    }

    /// Stores the table-membership bitmap in the VALUE payload of a group
    /// index row.
    pub fn set_table_bitmap(&mut self, bitmap: u64) -> Result<()> {
        ensure!(
            self.index.is_group(),
            "table bitmap requires a group index, '{}' is {:?}",
            self.index.name(),
            self.index.kind()
        );
        self.value.clear();
        self.value.extend_from_slice(&bitmap.to_le_bytes());
        Ok(())
    }

    /// Reads the table-membership bitmap back from a group index row.
    pub fn table_bitmap(&self) -> Result<u64> {
        ensure!(
            self.index.is_group(),
            "table bitmap requires a group index, '{}' is {:?}",
            self.index.name(),
            self.index.kind()
        );
        ensure!(
            self.value.len() == 8,
            "group index '{}' value holds {} bytes, expected 8",
            self.index.name(),
            self.value.len()
        );
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.value);
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn key_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Encoded KEY bytes, the sortable half of the persisted entry.
    pub fn key_bytes(&self) -> &[u8] {
        self.key.encoded_bytes()
    }

    /// Opaque VALUE payload. Populated by `close` for split layouts and by
    /// `set_table_bitmap` for group indexes.
    pub fn value_bytes(&self) -> &[u8] {
        &self.value
    }

    pub(crate) fn key_buffer(&self) -> &FieldBuffer {
        &self.key
    }

    pub(crate) fn value_field_buffer(&self) -> &FieldBuffer {
        &self.value_fields
    }

    fn rebind(&mut self, index: Arc<IndexDef>, writable: bool) -> Result<()> {
        index.validate()?;
        self.layout = RowLayout::plan(&index);
        self.index = index;
        self.key.clear();
        self.value_fields.clear();
        self.value.clear();
        self.appended_fields = 0;
        self.writable = writable;
        Ok(())
    }

    /// Resolves a logical field position to its physical buffer and the
    /// position within it. One split rule for every positional operation.
    fn resolve_field(&self, position: usize) -> Result<(&FieldBuffer, usize)> {
        let key_fields = self.layout.key_field_count();
        let (buffer, resolved) = if position < key_fields {
            (&self.key, position)
        } else {
            (&self.value_fields, position - key_fields)
        };
        ensure!(
            resolved < buffer.field_count(),
            "index field {} out of bounds for '{}' ({} fields present)",
            position,
            self.index.name(),
            buffer.field_count()
        );
        Ok((buffer, resolved))
    }

    fn append_routed_value(&mut self, value: &Value) -> Result<()> {
        self.ensure_append_capacity()?;
        self.active_buffer().append(value);
        self.appended_fields += 1;
        Ok(())
    }

    fn append_routed_segment(&mut self, source: &FieldBuffer, segment: usize) -> Result<()> {
        self.ensure_append_capacity()?;
        self.active_buffer().append_field_from(source, segment)?;
        self.appended_fields += 1;
        Ok(())
    }

    fn ensure_append_capacity(&self) -> Result<()> {
        ensure!(
            self.appended_fields < self.layout.total_fields(),
            "index row for '{}' already has all {} fields",
            self.index.name(),
            self.layout.total_fields()
        );
        Ok(())
    }

    fn active_buffer(&mut self) -> &mut FieldBuffer {
        if self.appended_fields < self.layout.key_field_count() {
            &mut self.key
        } else {
            &mut self.value_fields
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexKind;
    use crate::types::DataType;

    fn allocator() -> Arc<NullSeparatorAllocator> {
        Arc::new(NullSeparatorAllocator::new())
    }

    fn int_col(name: &str, pos: usize) -> IndexColumn {
        IndexColumn::new(name, DataType::Int8, pos)
    }

    /// Table index on (a, b) over a row also carrying the hkey-derived id.
    fn table_index() -> Arc<IndexDef> {
        Arc::new(
            IndexDef::new(
                1,
                "idx_ab",
                IndexKind::Table,
                vec![int_col("a", 0).not_null(), int_col("b", 1).not_null()],
                vec![int_col("id", 2).not_null()],
            )
            .with_row_composition(vec![
                FieldSource::RowColumn(0),
                FieldSource::RowColumn(1),
                FieldSource::HKeySegment(1),
            ])
            .with_hkey_map(vec![HKeyElement::Ordinal(1), HKeyElement::IndexField(2)]),
        )
    }

    fn unique_index() -> Arc<IndexDef> {
        Arc::new(
            IndexDef::new(
                2,
                "idx_u",
                IndexKind::Unique,
                vec![int_col("a", 0)],
                vec![int_col("id", 2).not_null()],
            )
            .with_row_composition(vec![
                FieldSource::RowColumn(0),
                FieldSource::HKeySegment(1),
            ])
            .with_hkey_map(vec![HKeyElement::Ordinal(1), HKeyElement::IndexField(1)]),
        )
    }

    fn hkey_for(id: i64) -> FieldBuffer {
        let mut hkey = FieldBuffer::new();
        hkey.append_int(1); // table ordinal
        hkey.append_int(id);
        hkey
    }

    #[test]
    fn table_index_row_puts_both_fields_in_key() {
        let mut row = IndexRowBuffer::new(table_index(), allocator()).unwrap();
        let data = vec![Value::Int(3), Value::Int(7), Value::Int(100)];
        row.initialize_from_row(&data, &hkey_for(100)).unwrap();
        row.close().unwrap();

        assert!(!row.key_empty());
        assert_eq!(row.key_buffer().field_count(), 3);
        assert!(row.value_bytes().is_empty());
        assert_eq!(row.field_value(0).unwrap(), Value::Int(3));
        assert_eq!(row.field_value(1).unwrap(), Value::Int(7));
        assert_eq!(row.field_value(2).unwrap(), Value::Int(100));
    }

    #[test]
    fn unique_index_routes_undeclared_fields_to_value() {
        let mut row = IndexRowBuffer::new(unique_index(), allocator()).unwrap();
        let data = vec![Value::Int(5), Value::Int(0), Value::Int(42)];
        row.initialize_from_row(&data, &hkey_for(42)).unwrap();
        row.close().unwrap();

        // declared field + separator in KEY, undeclared field in VALUE
        assert_eq!(row.key_buffer().field_count(), 2);
        assert_eq!(row.value_field_buffer().field_count(), 1);
        assert!(!row.value_bytes().is_empty());
        assert_eq!(
            row.value_bytes(),
            row.value_field_buffer().encoded_bytes()
        );
        assert_eq!(row.field_value(0).unwrap(), Value::Int(5));
        assert_eq!(row.field_value(1).unwrap(), Value::Int(42));
    }

    #[test]
    fn no_null_key_gets_zero_separator() {
        let mut row = IndexRowBuffer::new(unique_index(), allocator()).unwrap();
        let data = vec![Value::Int(5), Value::Int(0), Value::Int(42)];
        row.initialize_from_row(&data, &hkey_for(42)).unwrap();
        row.close().unwrap();
        assert_eq!(row.key_buffer().read_field(1).unwrap(), Value::Int(0));
    }

    #[test]
    fn null_keys_get_distinct_nonzero_separators() {
        let shared = allocator();
        let mut first = IndexRowBuffer::new(unique_index(), Arc::clone(&shared)).unwrap();
        let data = vec![Value::Null, Value::Int(0), Value::Int(42)];
        first.initialize_from_row(&data, &hkey_for(42)).unwrap();
        first.close().unwrap();

        let mut second = IndexRowBuffer::new(unique_index(), shared).unwrap();
        let data = vec![Value::Null, Value::Int(0), Value::Int(43)];
        second.initialize_from_row(&data, &hkey_for(43)).unwrap();
        second.close().unwrap();

        let sep_a = first.key_buffer().read_field(1).unwrap();
        let sep_b = second.key_buffer().read_field(1).unwrap();
        assert_ne!(sep_a, Value::Int(0));
        assert_ne!(sep_b, Value::Int(0));
        assert_ne!(sep_a, sep_b);
        assert_ne!(first.key_bytes(), second.key_bytes());
    }

    #[test]
    fn group_index_appends_directly_and_carries_bitmap() {
        let index = Arc::new(IndexDef::new(
            3,
            "gidx",
            IndexKind::Group,
            vec![int_col("c.x", 0), int_col("o.y", 1)],
            vec![],
        ));
        let mut row = IndexRowBuffer::new(Arc::clone(&index), allocator()).unwrap();
        row.reset_for_group_write(Arc::clone(&index)).unwrap();
        row.append_column_value(&int_col("c.x", 0), &Value::Int(10))
            .unwrap();
        row.append_column_value(&int_col("o.y", 1), &Value::Int(20))
            .unwrap();
        row.set_table_bitmap(0b101).unwrap();
        row.close().unwrap();

        assert_eq!(row.key_buffer().field_count(), 2);
        assert_eq!(row.table_bitmap().unwrap(), 0b101);
    }

    #[test]
    fn direct_append_rejects_non_group_index() {
        let mut row = IndexRowBuffer::new(table_index(), allocator()).unwrap();
        let err = row
            .append_column_value(&int_col("a", 0), &Value::Int(1))
            .unwrap_err();
        assert!(err.to_string().contains("group index"));
    }

    #[test]
    fn direct_append_rejects_mismatched_value_type() {
        let index = Arc::new(IndexDef::new(
            3,
            "gidx",
            IndexKind::Group,
            vec![int_col("x", 0)],
            vec![],
        ));
        let mut row = IndexRowBuffer::new(index, allocator()).unwrap();
        let err = row
            .append_column_value(&int_col("x", 0), &Value::Text("oops".into()))
            .unwrap_err();
        assert!(err.to_string().contains("type mismatch"));
    }

    #[test]
    fn composition_arity_mismatch_is_invalid() {
        let index = Arc::new(
            IndexDef::new(
                4,
                "idx_bad",
                IndexKind::Table,
                vec![int_col("a", 0)],
                vec![int_col("id", 1)],
            )
            .with_row_composition(vec![FieldSource::RowColumn(0)]),
        );
        let mut row = IndexRowBuffer::new(index, allocator()).unwrap();
        let data = vec![Value::Int(1), Value::Int(2)];
        let err = row.initialize_from_row(&data, &hkey_for(2)).unwrap_err();
        assert!(err.to_string().contains("invalid index row composition"));
    }

    #[test]
    fn reset_for_write_rejects_group_index() {
        let group = Arc::new(IndexDef::new(
            5,
            "gidx",
            IndexKind::Group,
            vec![int_col("x", 0)],
            vec![],
        ));
        let mut row = IndexRowBuffer::new(table_index(), allocator()).unwrap();
        assert!(row.reset_for_write(group).is_err());
    }

    #[test]
    fn abandoned_population_leaves_no_residue_after_reset() {
        let index = table_index();
        let shared = allocator();
        let mut row = IndexRowBuffer::new(Arc::clone(&index), Arc::clone(&shared)).unwrap();

        // populate partially, abandon without close
        let data = vec![Value::Int(999), Value::Int(998), Value::Int(997)];
        row.initialize_from_row(&data, &hkey_for(997)).unwrap();

        row.reset_for_write(Arc::clone(&index)).unwrap();
        let data = vec![Value::Int(3), Value::Int(7), Value::Int(100)];
        row.initialize_from_row(&data, &hkey_for(100)).unwrap();
        row.close().unwrap();

        let mut fresh = IndexRowBuffer::new(index, shared).unwrap();
        fresh.initialize_from_row(&data, &hkey_for(100)).unwrap();
        fresh.close().unwrap();

        assert_eq!(row.key_bytes(), fresh.key_bytes());
        assert_eq!(row.value_bytes(), fresh.value_bytes());
    }

    #[test]
    fn read_mode_rejects_population() {
        let index = table_index();
        let mut writer = IndexRowBuffer::new(Arc::clone(&index), allocator()).unwrap();
        let data = vec![Value::Int(3), Value::Int(7), Value::Int(100)];
        writer.initialize_from_row(&data, &hkey_for(100)).unwrap();
        writer.close().unwrap();

        let mut reader = IndexRowBuffer::new(Arc::clone(&index), allocator()).unwrap();
        reader
            .reset_for_read(index, writer.key_bytes(), writer.value_bytes())
            .unwrap();
        let err = reader.initialize_from_row(&data, &hkey_for(100)).unwrap_err();
        assert!(err.to_string().contains("not writable"));
        assert!(reader.close().is_err());
    }

    #[test]
    fn construct_hkey_rebuilds_segments_from_key_and_value() {
        let index = unique_index();
        let mut row = IndexRowBuffer::new(Arc::clone(&index), allocator()).unwrap();
        let data = vec![Value::Int(5), Value::Int(0), Value::Int(42)];
        let hkey = hkey_for(42);
        row.initialize_from_row(&data, &hkey).unwrap();
        row.close().unwrap();

        let mut rebuilt = FieldBuffer::new();
        row.construct_hkey(&mut rebuilt, index.index_to_hkey())
            .unwrap();
        assert_eq!(rebuilt.encoded_bytes(), hkey.encoded_bytes());
    }

    #[test]
    fn construct_hkey_bounds_violation_is_structural_error() {
        let index = table_index();
        let mut row = IndexRowBuffer::new(index, allocator()).unwrap();
        let data = vec![Value::Int(3), Value::Int(7), Value::Int(100)];
        row.initialize_from_row(&data, &hkey_for(100)).unwrap();
        row.close().unwrap();

        let mut dest = FieldBuffer::new();
        let err = row
            .construct_hkey(&mut dest, &[HKeyElement::IndexField(9)])
            .unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn append_field_to_crosses_the_split() {
        let index = unique_index();
        let mut row = IndexRowBuffer::new(index, allocator()).unwrap();
        let data = vec![Value::Int(5), Value::Int(0), Value::Int(42)];
        row.initialize_from_row(&data, &hkey_for(42)).unwrap();
        row.close().unwrap();

        let mut target = FieldBuffer::new();
        row.append_field_to(1, &mut target).unwrap(); // undeclared, in VALUE
        row.append_field_to(0, &mut target).unwrap(); // declared, in KEY
        assert_eq!(target.read_field(0).unwrap(), Value::Int(42));
        assert_eq!(target.read_field(1).unwrap(), Value::Int(5));
    }

    #[test]
    fn table_bitmap_rejected_on_non_group_index() {
        let mut row = IndexRowBuffer::new(table_index(), allocator()).unwrap();
        assert!(row.set_table_bitmap(1).is_err());
        assert!(row.table_bitmap().is_err());
    }
}
