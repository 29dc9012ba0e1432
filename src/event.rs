//! Event model and binary wire codec.
//!
//! An [`Event`] is one decoded telemetry record: a category identifier, an
//! ordered list of typed field values, and a capture timestamp. Events are
//! immutable once decoded; the processor owns each event for exactly one
//! evaluation pass.
//!
//! # Wire format
//!
//! One record is laid out as:
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 4 | `category_id`, u32 little-endian |
//! | 8 | `timestamp_ns`, i64 little-endian |
//! | 2 | field count, u16 little-endian |
//! | .. | fields, each a tag byte followed by its payload |
//!
//! Field payloads by tag: `0x01` i32 LE, `0x02` i64 LE, `0x03` f64 LE,
//! `0x04` u16 LE length plus UTF-8 bytes, `0x05` one byte (0 or 1).
//!
//! Decoding is all-or-nothing: truncation, an unknown tag, a malformed bool,
//! invalid UTF-8 or trailing bytes all fail with a [`DecodeError`] and no
//! partial event is ever produced.

use serde::Serialize;

use crate::error::{DecodeError, EncodeError};

const TAG_INT32: u8 = 0x01;
const TAG_INT64: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_BOOL: u8 = 0x05;

/// One typed field of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int32(i32),
    Int64(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl FieldValue {
    /// Static label of the contained type.
    pub const fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int32(_) => "int32",
            FieldValue::Int64(_) => "int64",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "str",
            FieldValue::Bool(_) => "bool",
        }
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// One decoded telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub category_id: u32,
    pub fields: Vec<FieldValue>,
    pub timestamp_ns: i64,
}

impl Event {
    pub fn new(category_id: u32, fields: Vec<FieldValue>, timestamp_ns: i64) -> Self {
        Self {
            category_id,
            fields,
            timestamp_ns,
        }
    }

    /// Returns the field at `position`, or `None` past the end.
    pub fn field(&self, position: usize) -> Option<&FieldValue> {
        self.fields.get(position)
    }

    /// Decodes exactly one wire record.
    ///
    /// The slice must contain one whole record and nothing else; the outer
    /// transport is responsible for record framing.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(bytes);

        let category_id = u32::from_le_bytes(cur.read_array::<4>()?);
        let timestamp_ns = i64::from_le_bytes(cur.read_array::<8>()?);
        let field_count = u16::from_le_bytes(cur.read_array::<2>()?);

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let tag_offset = cur.pos;
            let tag = cur.read_u8()?;
            let value = match tag {
                TAG_INT32 => FieldValue::Int32(i32::from_le_bytes(cur.read_array::<4>()?)),
                TAG_INT64 => FieldValue::Int64(i64::from_le_bytes(cur.read_array::<8>()?)),
                TAG_FLOAT => FieldValue::Float(f64::from_le_bytes(cur.read_array::<8>()?)),
                TAG_STR => {
                    let len = u16::from_le_bytes(cur.read_array::<2>()?) as usize;
                    let payload_offset = cur.pos;
                    let raw = cur.read_bytes(len)?;
                    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 {
                        offset: payload_offset,
                    })?;
                    FieldValue::Str(text.to_string())
                }
                TAG_BOOL => match cur.read_u8()? {
                    0 => FieldValue::Bool(false),
                    1 => FieldValue::Bool(true),
                    byte => return Err(DecodeError::InvalidBool { byte }),
                },
                tag => {
                    return Err(DecodeError::UnknownFieldTag {
                        tag,
                        offset: tag_offset,
                    })
                }
            };
            fields.push(value);
        }

        if cur.remaining() > 0 {
            return Err(DecodeError::TrailingBytes {
                count: cur.remaining(),
            });
        }

        Ok(Event {
            category_id,
            fields,
            timestamp_ns,
        })
    }

    /// Encodes this event as one wire record, the inverse of [`Event::decode`].
    ///
    /// Provided for producers, tests and benchmarks. The format carries the
    /// field count and each string length as u16, so an event with more than
    /// 65535 fields or a longer string fails with an [`EncodeError`] instead
    /// of producing a record the decoder would misread.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.fields.len() > u16::MAX as usize {
            return Err(EncodeError::TooManyFields {
                count: self.fields.len(),
            });
        }

        let mut out = Vec::with_capacity(14 + self.fields.len() * 9);
        out.extend_from_slice(&self.category_id.to_le_bytes());
        out.extend_from_slice(&self.timestamp_ns.to_le_bytes());
        out.extend_from_slice(&(self.fields.len() as u16).to_le_bytes());

        for (position, field) in self.fields.iter().enumerate() {
            match field {
                FieldValue::Int32(v) => {
                    out.push(TAG_INT32);
                    out.extend_from_slice(&v.to_le_bytes());
                }
                FieldValue::Int64(v) => {
                    out.push(TAG_INT64);
                    out.extend_from_slice(&v.to_le_bytes());
                }
                FieldValue::Float(v) => {
                    out.push(TAG_FLOAT);
                    out.extend_from_slice(&v.to_le_bytes());
                }
                FieldValue::Str(s) => {
                    if s.len() > u16::MAX as usize {
                        return Err(EncodeError::StringTooLong {
                            position,
                            len: s.len(),
                        });
                    }
                    out.push(TAG_STR);
                    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                FieldValue::Bool(b) => {
                    out.push(TAG_BOOL);
                    out.push(u8::from(*b));
                }
            }
        }

        Ok(out)
    }
}

/// Byte reader tracking the absolute offset for error reporting.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
