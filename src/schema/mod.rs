//! # Index Schema Module
//!
//! This module provides the descriptor types the index row codec consumes:
//! index definitions with their declared and hkey-derived columns, the
//! composition mapping that drives row population, and the declarative
//! index-to-hkey mapping that drives hkey reconstruction. Descriptors are
//! produced by the catalog layer and are read-only to the codec.

pub mod index;

pub use index::{FieldSource, HKeyElement, IndexColumn, IndexDef, IndexKind};
