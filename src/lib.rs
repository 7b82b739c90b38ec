//! # ArborDB Index Row Codec
//!
//! This crate maps every SQL-visible index of an ArborDB group — primary
//! key, secondary table index, unique index, cross-table group index,
//! spatial index — onto the two physical byte buffers of the underlying
//! hierarchical ordered store: a sortable KEY and an opaque VALUE. It also
//! provides the reverse mapping that reconstructs a row's hierarchical key
//! (hkey) purely from an index entry, and the comparison algorithm that
//! treats KEY and VALUE as one contiguous field sequence.
//!
//! ## Quick Start
//!
//! ```ignore
//! use arbordb::{FieldBuffer, IndexRowBuffer, NullSeparatorAllocator};
//! use std::sync::Arc;
//!
//! let allocator = Arc::new(NullSeparatorAllocator::new());
//! let mut row = IndexRowBuffer::new(index, allocator)?;
//!
//! row.initialize_from_row(&stored_row, &hkey)?;
//! row.close()?;
//! store.put(row.key_bytes(), row.value_bytes())?;
//!
//! // later, over a scanned entry
//! row.reset_for_read(index, entry_key, entry_value)?;
//! let mut hkey = FieldBuffer::new();
//! row.construct_hkey(&mut hkey, index.index_to_hkey())?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │   Write / Scan Paths (callers)         │
//! ├────────────────────────────────────────┤
//! │   IndexRowBuffer                       │
//! │   population · close · comparison ·    │
//! │   hkey reconstruction                  │
//! ├──────────────┬─────────────┬───────────┤
//! │  RowLayout   │ SpaceCurve  │ Null      │
//! │  (planner)   │ (z-values)  │ Separator │
//! ├──────────────┴─────────────┴───────────┤
//! │   FieldBuffer (self-delimiting,        │
//! │   order-preserving field encoding)     │
//! └────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`encoding`]: self-delimiting byte-comparable field encoding
//! - [`schema`]: index descriptors consumed by the codec
//! - [`indexrow`]: row buffer lifecycle, layout planning, comparison,
//!   hkey reconstruction, spatial linearization, null separators
//! - [`rows`]: the row-data access seam
//! - [`types`]: the column value model
//!
//! The KEY/VALUE byte layout this crate produces is the wire contract with
//! the ordered store; it must remain stable across versions or existing
//! stored indexes silently corrupt.

pub mod encoding;
pub mod indexrow;
pub mod rows;
pub mod schema;
pub mod types;

pub use encoding::FieldBuffer;
pub use indexrow::{IndexRowBuffer, NullSeparatorAllocator, RowLayout, SpaceCurve, ZOrderCurve};
pub use rows::RowSource;
pub use schema::{FieldSource, HKeyElement, IndexColumn, IndexDef, IndexKind};
pub use types::{DataType, Value};
