//! # Cross-Buffer Row Comparison
//!
//! Compares two index rows field-by-field as if each row's KEY and VALUE
//! were one contiguous byte array, without copying. The codec guarantees
//! that fields compare bytewise in logical order and that `0x00` appears
//! only as a field terminator, so the walk needs no decoding: bytes are
//! compared in lock-step, a simultaneous terminator on both sides ends one
//! matched field, and a side whose next field crosses its `key_field_count`
//! boundary switches its byte source from KEY to the VALUE staging buffer.
//!
//! The return convention carries more than a sign: the magnitude is
//! `matched_fields + 1`, letting callers recover how many leading fields
//! were equal even on inequality. This is a documented contract, not an
//! implementation detail.

use crate::encoding::field::TERMINATOR;
use eyre::{ensure, Result};

use super::buffer::IndexRowBuffer;

struct FieldCursor<'a> {
    row: &'a IndexRowBuffer,
    start: usize,
    bytes: &'a [u8],
    position: usize,
    in_key: bool,
}

impl<'a> FieldCursor<'a> {
    fn resolve(row: &'a IndexRowBuffer, start: usize, field_count: usize) -> Result<Self> {
        let key_fields = row.key_field_count();
        // fields actually present, not counting the null separator
        let present = row.key_buffer().field_count().min(key_fields)
            + row.value_field_buffer().field_count();
        ensure!(
            start + field_count <= present,
            "field range {}..{} out of bounds for '{}' ({} fields present)",
            start,
            start + field_count,
            row.index().name(),
            present
        );
        if start < key_fields {
            Ok(Self {
                row,
                start,
                bytes: row.key_buffer().encoded_bytes(),
                position: row.key_buffer().byte_offset(start)?,
                in_key: true,
            })
        } else {
            let value_fields = row.value_field_buffer();
            Ok(Self {
                row,
                start,
                bytes: value_fields.encoded_bytes(),
                position: value_fields.byte_offset(start - key_fields)?,
                in_key: false,
            })
        }
    }

    fn next_byte(&mut self) -> u8 {
        let byte = self.bytes[self.position];
        self.position += 1;
        byte
    }

    /// Called after each fully matched field: a cursor still reading KEY
    /// whose next field lies past the split jumps to the VALUE staging
    /// buffer.
    fn advance_field(&mut self, matched: usize) {
        if self.in_key && self.start + matched == self.row.key_field_count() {
            self.bytes = self.row.value_field_buffer().encoded_bytes();
            self.position = 0;
            self.in_key = false;
        }
    }
}

pub(crate) fn compare_rows(
    this: &IndexRowBuffer,
    this_start: usize,
    that: &IndexRowBuffer,
    that_start: usize,
    field_count: usize,
) -> Result<i32> {
    ensure!(
        !this.index().is_spatial(),
        "row comparison is not supported for spatial index '{}'",
        this.index().name()
    );
    ensure!(
        !that.index().is_spatial(),
        "row comparison is not supported for spatial index '{}'",
        that.index().name()
    );
    if field_count == 0 {
        return Ok(0);
    }
    let mut a = FieldCursor::resolve(this, this_start, field_count)?;
    let mut b = FieldCursor::resolve(that, that_start, field_count)?;
    let mut matched = 0usize;
    loop {
        let byte_a = a.next_byte();
        let byte_b = b.next_byte();
        if byte_a != byte_b {
            let magnitude = (matched + 1) as i32;
            return Ok(if byte_a > byte_b { magnitude } else { -magnitude });
        }
        if byte_a == TERMINATOR {
            matched += 1;
            if matched == field_count {
                return Ok(0);
            }
            a.advance_field(matched);
            b.advance_field(matched);
        }
    }
}
