//! # Index Row Module
//!
//! This module maps every SQL-visible index entry onto the two physical byte
//! buffers of the underlying ordered store — a sortable KEY and an opaque
//! VALUE — and back. The layout differs by index kind:
//!
//! ## Index Row Formats
//!
//! | Kind | KEY | VALUE |
//! |------|-----|-------|
//! | non-unique table / primary | all declared and undeclared fields | empty |
//! | unique table | declared fields + null separator | undeclared fields |
//! | group | all fields | table-membership bitmap |
//! | spatial | z-value + remaining non-key fields | empty |
//!
//! The null separator is one extra integer field on unique indexes whose key
//! columns are nullable: zero when the row has no NULL key column, otherwise
//! a value unique within the index. Without it, two rows that look equal but
//! hold NULLs would collide, and SQL NULL is not self-equal.
//!
//! ## Components
//!
//! - [`RowLayout`] — per-kind field-count planning, computed once per binding
//! - [`IndexRowBuffer`] — the reusable row under construction or inspection
//! - [`NullSeparatorAllocator`] — process-wide per-index separator counters
//! - [`SpaceCurve`] / [`ZOrderCurve`] — pluggable coordinate linearization
//!
//! Comparison treats KEY and VALUE as one contiguous field sequence (see
//! `IndexRowBuffer::compare_to`); spatial rows cannot be compared
//! positionally and fail fast.

pub mod buffer;
mod compare;
pub mod layout;
pub mod null_separator;
pub mod spatial;

pub use buffer::IndexRowBuffer;
pub use layout::RowLayout;
pub use null_separator::NullSeparatorAllocator;
pub use spatial::{SpaceCurve, ZOrderCurve};
