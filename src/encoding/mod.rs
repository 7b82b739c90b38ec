//! # Encoding Module
//!
//! This module provides the field-level encoding substrate for ArborDB's
//! index rows:
//!
//! - **Field encoding**: self-delimiting, byte-comparable encoding of typed
//!   values, one terminated segment per field
//! - **Field buffers**: reusable sequences of encoded fields with O(1)
//!   boundary lookup, the physical shape of both index keys and hkeys

pub mod field;

pub use field::{type_prefix, FieldBuffer, TERMINATOR};
