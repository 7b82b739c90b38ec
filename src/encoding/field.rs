//! # Self-Delimiting Field Encoding
//!
//! This module provides byte-comparable encoding of typed values into field
//! sequences. All encoded fields can be compared using a single `memcmp`
//! call, and a reserved terminator byte marks every field boundary, so a
//! sequence of fields can be walked, compared, and sliced without decoding.
//!
//! ## Design Goals
//!
//! 1. **Byte-comparable**: encoded fields preserve sort order when compared
//!    as unsigned bytes
//! 2. **Self-delimiting**: the byte `0x00` terminates a field and never
//!    appears inside one
//! 3. **Type-aware ordering**: NULL < numbers < text < blobs
//! 4. **Invertible**: every encoding decodes back to the original value
//! 5. **Reusable**: buffers are cleared and refilled without reallocation
//!
//! ## Field Layout
//!
//! ```text
//! +--------------+------------------+------------+
//! | type prefix  | escaped payload  | terminator |
//! | (1 byte)     | (0..n bytes)     | (0x00)     |
//! +--------------+------------------+------------+
//! ```
//!
//! ## Type Prefix Scheme
//!
//! ```text
//! 0x01  NULL
//! 0x12  negative float
//! 0x13  negative integer
//! 0x14  integer zero
//! 0x15  positive integer
//! 0x16  positive float (and float zero)
//! 0x20  TEXT
//! 0x21  BLOB
//! ```
//!
//! ## Number Encoding Strategy
//!
//! Integers are sign-split. A positive integer encodes as a length marker
//! (`0x10 + n` for an n-byte magnitude) followed by the magnitude in
//! big-endian with leading zero bytes stripped; longer magnitudes therefore
//! sort after shorter ones, and equal-length magnitudes compare bytewise. A
//! negative integer encodes the *inverted* length marker (`0x10 + 9 - n`) and
//! the complemented magnitude bytes, so wider (more negative) values sort
//! first and the ordering mirrors the positive case.
//!
//! Floats use IEEE 754 bit manipulation: negative floats store the
//! complemented bit pattern, non-negative floats store the pattern with the
//! sign bit flipped. Within each prefix the 8-byte big-endian pattern
//! compares in numeric order.
//!
//! ## Escape Scheme
//!
//! Payload bytes `0x00` and `0x01` are escaped as `0x01 0x20` and
//! `0x01 0x21`. The escape marker `0x01` is below every unescaped payload
//! byte and the two escape codes preserve the order of the bytes they stand
//! for, so escaping never perturbs lexicographic comparison — and a `0x00`
//! byte in the encoded stream is always a field terminator.

use crate::types::Value;
use eyre::{bail, ensure, Result};
use smallvec::SmallVec;
use std::borrow::Cow;

pub mod type_prefix {
    pub const NULL: u8 = 0x01;
    pub const NEG_FLOAT: u8 = 0x12;
    pub const NEG_INT: u8 = 0x13;
    pub const ZERO: u8 = 0x14;
    pub const POS_INT: u8 = 0x15;
    pub const POS_FLOAT: u8 = 0x16;
    pub const TEXT: u8 = 0x20;
    pub const BLOB: u8 = 0x21;
}

/// Field terminator. Never appears inside an encoded field.
pub const TERMINATOR: u8 = 0x00;

const ESCAPE: u8 = 0x01;
const ESCAPED_ZERO: u8 = 0x20;
const ESCAPED_ONE: u8 = 0x21;
const LENGTH_BASE: u8 = 0x10;
const SIGN_BIT: u64 = 1 << 63;

/// A reusable sequence of encoded fields with O(1) boundary lookup.
///
/// `FieldBuffer` is the physical shape of every sortable byte sequence in
/// this crate: index keys, the staged undeclared fields of a unique index,
/// and hkeys are all field buffers. The boundary table records the exclusive
/// end offset of each field, so positional access never rescans the bytes.
#[derive(Debug, Clone, Default)]
pub struct FieldBuffer {
    bytes: Vec<u8>,
    bounds: SmallVec<[u32; 16]>,
}

impl FieldBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all fields, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.bounds.clear();
    }

    pub fn field_count(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The full encoded byte image, suitable for persistence.
    pub fn encoded_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte offset at which the field at `position` starts. `position` may
    /// equal the field count, addressing the end of the buffer.
    pub fn byte_offset(&self, position: usize) -> Result<usize> {
        ensure!(
            position <= self.bounds.len(),
            "field position {} out of bounds ({} fields)",
            position,
            self.bounds.len()
        );
        Ok(if position == 0 {
            0
        } else {
            self.bounds[position - 1] as usize
        })
    }

    /// The encoded bytes of one field, terminator included.
    pub fn field_bytes(&self, position: usize) -> Result<&[u8]> {
        ensure!(
            position < self.bounds.len(),
            "field position {} out of bounds ({} fields)",
            position,
            self.bounds.len()
        );
        let start = if position == 0 {
            0
        } else {
            self.bounds[position - 1] as usize
        };
        Ok(&self.bytes[start..self.bounds[position] as usize])
    }

    /// Returns true if the field at `position` encodes NULL.
    pub fn is_null_field(&self, position: usize) -> Result<bool> {
        Ok(self.field_bytes(position)?[0] == type_prefix::NULL)
    }

    /// Appends one typed value as a new field.
    pub fn append(&mut self, value: &Value) {
        match value {
            Value::Null => self.append_null(),
            Value::Int(i) => self.append_int(*i),
            Value::Float(f) => self.append_float(*f),
            Value::Text(s) => self.append_text(s),
            Value::Blob(b) => self.append_blob(b),
        }
    }

    pub fn append_null(&mut self) {
        self.bytes.push(type_prefix::NULL);
        self.finish_field();
    }

    pub fn append_int(&mut self, value: i64) {
        if value == 0 {
            self.bytes.push(type_prefix::ZERO);
        } else if value > 0 {
            let magnitude = value as u64;
            let width = magnitude_width(magnitude);
            self.bytes.push(type_prefix::POS_INT);
            self.bytes.push(LENGTH_BASE + width as u8);
            let be = magnitude.to_be_bytes();
            for &b in &be[8 - width..] {
                self.push_escaped(b);
            }
        } else {
            let magnitude = value.unsigned_abs();
            let width = magnitude_width(magnitude);
            self.bytes.push(type_prefix::NEG_INT);
            self.bytes.push(LENGTH_BASE + (9 - width) as u8);
            let be = magnitude.to_be_bytes();
            for &b in &be[8 - width..] {
                self.push_escaped(!b);
            }
        }
        self.finish_field();
    }

    pub fn append_float(&mut self, value: f64) {
        let bits = value.to_bits();
        let (prefix, stored) = if bits & SIGN_BIT != 0 {
            (type_prefix::NEG_FLOAT, !bits)
        } else {
            (type_prefix::POS_FLOAT, bits ^ SIGN_BIT)
        };
        self.bytes.push(prefix);
        for &b in &stored.to_be_bytes() {
            self.push_escaped(b);
        }
        self.finish_field();
    }

    pub fn append_text(&mut self, value: &str) {
        self.bytes.push(type_prefix::TEXT);
        for &b in value.as_bytes() {
            self.push_escaped(b);
        }
        self.finish_field();
    }

    pub fn append_blob(&mut self, value: &[u8]) {
        self.bytes.push(type_prefix::BLOB);
        for &b in value {
            self.push_escaped(b);
        }
        self.finish_field();
    }

    /// Copies the already-encoded field at `position` of `source` into this
    /// buffer verbatim, terminator included.
    pub fn append_field_from(&mut self, source: &FieldBuffer, position: usize) -> Result<()> {
        let segment = source.field_bytes(position)?;
        self.bytes.extend_from_slice(segment);
        self.bounds.push(self.bytes.len() as u32);
        Ok(())
    }

    /// Decodes the field at `position` back into a value. Text and blob
    /// payloads borrow from the buffer when no escape sequences are present.
    pub fn read_field(&self, position: usize) -> Result<Value<'_>> {
        let field = self.field_bytes(position)?;
        // field_bytes returns at least [prefix, terminator]
        let body = &field[..field.len() - 1];
        let payload = &body[1..];
        match body[0] {
            type_prefix::NULL => {
                ensure!(payload.is_empty(), "NULL field carries a payload");
                Ok(Value::Null)
            }
            type_prefix::ZERO => {
                ensure!(payload.is_empty(), "zero field carries a payload");
                Ok(Value::Int(0))
            }
            type_prefix::POS_INT => {
                let magnitude = decode_magnitude(payload, false)?;
                ensure!(
                    magnitude <= i64::MAX as u64,
                    "integer field overflows i64: {}",
                    magnitude
                );
                Ok(Value::Int(magnitude as i64))
            }
            type_prefix::NEG_INT => {
                let magnitude = decode_magnitude(payload, true)?;
                ensure!(
                    magnitude <= SIGN_BIT,
                    "integer field overflows i64: -{}",
                    magnitude
                );
                Ok(Value::Int((magnitude as i64).wrapping_neg()))
            }
            type_prefix::NEG_FLOAT => {
                let stored = decode_float_bits(payload)?;
                Ok(Value::Float(f64::from_bits(!stored)))
            }
            type_prefix::POS_FLOAT => {
                let stored = decode_float_bits(payload)?;
                Ok(Value::Float(f64::from_bits(stored ^ SIGN_BIT)))
            }
            type_prefix::TEXT => match unescape(payload)? {
                Cow::Borrowed(b) => {
                    let s = std::str::from_utf8(b)
                        .map_err(|e| eyre::eyre!("text field is not valid UTF-8: {}", e))?;
                    Ok(Value::Text(Cow::Borrowed(s)))
                }
                Cow::Owned(v) => {
                    let s = String::from_utf8(v)
                        .map_err(|e| eyre::eyre!("text field is not valid UTF-8: {}", e))?;
                    Ok(Value::Text(Cow::Owned(s)))
                }
            },
            type_prefix::BLOB => Ok(Value::Blob(unescape(payload)?)),
            other => bail!("invalid type prefix in encoded field: {:#04x}", other),
        }
    }

    /// Re-attaches this buffer over previously persisted field bytes,
    /// rebuilding the boundary table. The bytes must be a whole number of
    /// terminated fields.
    pub fn attach(&mut self, encoded: &[u8]) -> Result<()> {
        self.clear();
        if encoded.is_empty() {
            return Ok(());
        }
        ensure!(
            encoded[encoded.len() - 1] == TERMINATOR,
            "encoded field bytes are truncated (no trailing terminator)"
        );
        let mut start = 0usize;
        for (i, &b) in encoded.iter().enumerate() {
            if b == TERMINATOR {
                ensure!(i > start, "zero-length field at byte offset {}", i);
                self.bounds.push((i + 1) as u32);
                start = i + 1;
            }
        }
        self.bytes.extend_from_slice(encoded);
        Ok(())
    }

    fn push_escaped(&mut self, byte: u8) {
        match byte {
            0x00 => {
                self.bytes.push(ESCAPE);
                self.bytes.push(ESCAPED_ZERO);
            }
            0x01 => {
                self.bytes.push(ESCAPE);
                self.bytes.push(ESCAPED_ONE);
            }
            other => self.bytes.push(other),
        }
    }

    fn finish_field(&mut self) {
        self.bytes.push(TERMINATOR);
        self.bounds.push(self.bytes.len() as u32);
    }
}

fn magnitude_width(magnitude: u64) -> usize {
    ((64 - magnitude.leading_zeros() as usize) + 7) / 8
}

fn decode_magnitude(payload: &[u8], negative: bool) -> Result<u64> {
    ensure!(!payload.is_empty(), "integer field missing length marker");
    let marker = payload[0];
    ensure!(
        marker > LENGTH_BASE && marker <= LENGTH_BASE + 8,
        "invalid integer length marker: {:#04x}",
        marker
    );
    let width = if negative {
        9 - (marker - LENGTH_BASE) as usize
    } else {
        (marker - LENGTH_BASE) as usize
    };
    let raw = unescape(&payload[1..])?;
    ensure!(
        raw.len() == width,
        "integer field magnitude is {} bytes, expected {}",
        raw.len(),
        width
    );
    let mut be = [0u8; 8];
    for (i, &b) in raw.iter().enumerate() {
        be[8 - width + i] = if negative { !b } else { b };
    }
    Ok(u64::from_be_bytes(be))
}

fn decode_float_bits(payload: &[u8]) -> Result<u64> {
    let raw = unescape(payload)?;
    ensure!(
        raw.len() == 8,
        "float field payload is {} bytes, expected 8",
        raw.len()
    );
    let mut be = [0u8; 8];
    be.copy_from_slice(&raw);
    Ok(u64::from_be_bytes(be))
}

fn unescape(payload: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !payload.contains(&ESCAPE) {
        return Ok(Cow::Borrowed(payload));
    }
    let mut out = Vec::with_capacity(payload.len());
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        if b == ESCAPE {
            i += 1;
            match payload.get(i) {
                Some(&ESCAPED_ZERO) => out.push(0x00),
                Some(&ESCAPED_ONE) => out.push(0x01),
                other => bail!("invalid escape sequence in encoded field: {:?}", other),
            }
        } else {
            out.push(b);
        }
        i += 1;
    }
    Ok(Cow::Owned(out))
}
