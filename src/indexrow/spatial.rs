//! # Spatial Coordinate Linearization
//!
//! A spatial index stores one sortable scalar per row in place of its
//! coordinate columns. `SpaceCurve` is the seam to the space-partitioning
//! strategy that produces the scalar; the crate ships `ZOrderCurve`, a
//! bit-interleaved z-value with a per-dimension budget of `63 / dimensions`
//! bits, sign-biased so negative coordinates sort below positive ones.
//!
//! Coordinates are read from the row's declared key columns through the
//! typed `RowSource` accessor. Only integer-valued coordinates are
//! supported; any other value fails fast rather than silently truncating.
//! Coordinate bits outside the per-dimension budget are masked off.

use crate::rows::RowSource;
use crate::schema::IndexDef;
use eyre::{bail, ensure, eyre, Result};
use smallvec::SmallVec;

/// Order-preserving linearization of N coordinates into one scalar.
pub trait SpaceCurve: std::fmt::Debug + Send + Sync {
    fn dimensions(&self) -> usize;

    /// Linearizes one coordinate per dimension into a non-negative scalar
    /// whose ordering preserves spatial locality. `coords.len()` must equal
    /// `dimensions()`.
    fn linearize(&self, coords: &[i64]) -> i64;
}

/// Z-order (Morton) curve: interleaves the coordinates' bits MSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZOrderCurve {
    dimensions: usize,
    bits_per_dimension: u32,
}

impl ZOrderCurve {
    pub fn new(dimensions: usize) -> Result<Self> {
        ensure!(
            (1..=8).contains(&dimensions),
            "z-order curve supports 1 to 8 dimensions, got {}",
            dimensions
        );
        Ok(Self {
            dimensions,
            bits_per_dimension: (63 / dimensions) as u32,
        })
    }

    pub fn bits_per_dimension(&self) -> u32 {
        self.bits_per_dimension
    }
}

impl SpaceCurve for ZOrderCurve {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn linearize(&self, coords: &[i64]) -> i64 {
        let bits = self.bits_per_dimension;
        let bias = 1u64 << (bits - 1);
        let mask = (1u64 << bits) - 1;
        let mut z = 0u64;
        for bit in (0..bits).rev() {
            for &coord in coords {
                let biased = (coord as u64).wrapping_add(bias) & mask;
                z = (z << 1) | ((biased >> bit) & 1);
            }
        }
        // at most 63 bits: always representable
        z as i64
    }
}

/// Reads the coordinate vector from the row's declared key columns and
/// linearizes it through the index's space partitioner.
pub(crate) fn linearized_coordinate(index: &IndexDef, row: &dyn RowSource) -> Result<i64> {
    let space = index
        .space()
        .ok_or_else(|| eyre!("spatial index '{}' has no space partitioner", index.name()))?;
    let mut coords: SmallVec<[i64; 4]> = SmallVec::new();
    for column in index.key_columns() {
        let value = row.column_value(column.row_position())?;
        match value {
            crate::types::Value::Int(coord) => coords.push(coord),
            crate::types::Value::Null => bail!(
                "null coordinate in column '{}' of spatial index '{}'",
                column.name(),
                index.name()
            ),
            _ => bail!(
                "unsupported coordinate type in column '{}' of spatial index '{}'",
                column.name(),
                index.name()
            ),
        }
    }
    Ok(space.linearize(&coords))
}
