//! Cursor-based BSER decoder.
//!
//! A [`Response`] owns the bytes of one received PDU. Each read either
//! consumes exactly one value and advances the cursor past it, or fails and
//! leaves the cursor where it was. Nothing is ever read past the end cursor.

use crate::error::{Error, Result};
use crate::markers;
use crate::value::Value;

/// Deepest container nesting accepted by [`Response::skip_value`] and
/// [`Response::read_value`].
pub const MAX_DEPTH: usize = 256;

/// Received PDU bytes plus a read cursor.
#[derive(Debug, Clone)]
pub struct Response {
    buf: Vec<u8>,
    pos: usize,
    end: usize,
}

impl Response {
    /// Decode `bytes` from the start. Use this for a bare payload.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::with_offset(bytes, 0)
    }

    /// Decode `bytes` starting at `offset`, typically just past the PDU
    /// header. Offsets beyond the buffer leave nothing to read.
    #[must_use]
    pub fn with_offset(bytes: Vec<u8>, offset: usize) -> Self {
        let end = bytes.len();
        Self {
            buf: bytes,
            pos: offset.min(end),
            end,
        }
    }

    /// Cursor position within the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// True once every byte has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.end
    }

    /// The marker at the cursor, without consuming it.
    pub fn peek_marker(&self) -> Result<u8> {
        self.buf[..self.end]
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::truncated(1, 0))
    }

    /// Read an integer of any of the four widths.
    pub fn read_int(&mut self) -> Result<i64> {
        let marker = self.peek_marker()?;
        let width =
            markers::int_width(marker).ok_or_else(|| Error::bad_marker("integer", marker))?;
        self.ensure(1 + width)?;
        self.pos += 1;
        let n = match width {
            1 => i64::from(i8::from_ne_bytes(self.take()?)),
            2 => i64::from(i16::from_ne_bytes(self.take()?)),
            4 => i64::from(i32::from_ne_bytes(self.take()?)),
            _ => i64::from_ne_bytes(self.take()?),
        };
        Ok(n)
    }

    /// Read an IEEE-754 double.
    pub fn read_double(&mut self) -> Result<f64> {
        self.ensure(1 + 8)?;
        let marker = self.peek_marker()?;
        if marker != markers::DOUBLE {
            return Err(Error::bad_marker("double", marker));
        }
        self.pos += 1;
        Ok(f64::from_ne_bytes(self.take()?))
    }

    /// Read a byte string into an owned copy.
    pub fn read_string(&mut self) -> Result<Vec<u8>> {
        self.atomically(|r| {
            let len = r.string_header()?;
            if len == 0 {
                return Ok(Vec::new());
            }
            r.ensure(len)?;
            let bytes = r.buf[r.pos..r.pos + len].to_vec();
            r.pos += len;
            Ok(bytes)
        })
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> Result<bool> {
        let value = match self.peek_marker()? {
            markers::TRUE => true,
            markers::FALSE => false,
            other => return Err(Error::bad_marker("boolean", other)),
        };
        self.pos += 1;
        Ok(value)
    }

    /// Read a null.
    pub fn read_nil(&mut self) -> Result<()> {
        match self.peek_marker()? {
            markers::NIL => {
                self.pos += 1;
                Ok(())
            }
            other => Err(Error::bad_marker("nil", other)),
        }
    }

    /// Read an array header, returning the number of values that follow.
    pub fn read_array(&mut self) -> Result<usize> {
        self.container_header(markers::ARRAY, "array")
    }

    /// Read an object header, returning the number of key/value pairs that
    /// follow.
    pub fn read_object(&mut self) -> Result<usize> {
        self.container_header(markers::OBJECT, "object")
    }

    /// Step over one value of any type without materializing it.
    pub fn skip_value(&mut self) -> Result<()> {
        self.atomically(|r| r.skip_nested(0))
    }

    /// Decode one value of any type into an owned tree.
    ///
    /// Templates are expanded into an array of objects; a skip marker in a
    /// template row leaves that key out of the row's object.
    pub fn read_value(&mut self) -> Result<Value> {
        self.atomically(|r| r.value_nested(0))
    }

    fn skip_nested(&mut self, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded(MAX_DEPTH));
        }
        match self.peek_marker()? {
            markers::ARRAY => {
                let count = self.read_array()?;
                for _ in 0..count {
                    self.skip_nested(depth + 1)?;
                }
            }
            markers::OBJECT => {
                let count = self.read_object()?;
                for _ in 0..count {
                    self.skip_string()?;
                    self.skip_nested(depth + 1)?;
                }
            }
            markers::STRING => self.skip_string()?,
            markers::INT8 | markers::INT16 | markers::INT32 | markers::INT64 => {
                self.read_int()?;
            }
            markers::DOUBLE => {
                self.read_double()?;
            }
            markers::TRUE | markers::FALSE | markers::NIL | markers::SKIP => self.pos += 1,
            markers::TEMPLATE => {
                self.pos += 1;
                let keys = self.read_array()?;
                for _ in 0..keys {
                    self.skip_nested(depth + 1)?;
                }
                let rows = self.read_array()?;
                // Rows of an empty template carry no bytes at all.
                if keys > 0 {
                    for _ in 0..rows {
                        for _ in 0..keys {
                            self.skip_nested(depth + 1)?;
                        }
                    }
                }
            }
            other => return Err(Error::UnsupportedType(other)),
        }
        Ok(())
    }

    fn value_nested(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded(MAX_DEPTH));
        }
        let value = match self.peek_marker()? {
            markers::ARRAY => {
                let count = self.read_array()?;
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.value_nested(depth + 1)?);
                }
                Value::Array(items)
            }
            markers::OBJECT => {
                let count = self.read_object()?;
                let mut pairs = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let key = self.read_string()?;
                    pairs.push((key, self.value_nested(depth + 1)?));
                }
                Value::Object(pairs)
            }
            markers::STRING => Value::String(self.read_string()?),
            markers::INT8 | markers::INT16 | markers::INT32 | markers::INT64 => {
                Value::Int(self.read_int()?)
            }
            markers::DOUBLE => Value::Double(self.read_double()?),
            markers::TRUE | markers::FALSE => Value::Bool(self.read_bool()?),
            markers::NIL => {
                self.read_nil()?;
                Value::Nil
            }
            markers::TEMPLATE => self.template(depth)?,
            markers::SKIP => return Err(Error::bad_marker("value", markers::SKIP)),
            other => return Err(Error::UnsupportedType(other)),
        };
        Ok(value)
    }

    fn template(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1;
        let key_count = self.read_array()?;
        let mut keys = Vec::with_capacity(key_count.min(self.remaining()));
        for _ in 0..key_count {
            keys.push(self.read_string()?);
        }
        let rows = self.read_array()?;
        if keys.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        let mut objects = Vec::with_capacity(rows.min(self.remaining()));
        for _ in 0..rows {
            let mut pairs = Vec::with_capacity(keys.len());
            for key in &keys {
                if self.peek_marker()? == markers::SKIP {
                    self.pos += 1;
                    continue;
                }
                pairs.push((key.clone(), self.value_nested(depth + 1)?));
            }
            objects.push(Value::Object(pairs));
        }
        Ok(Value::Array(objects))
    }

    fn container_header(&mut self, marker: u8, name: &'static str) -> Result<usize> {
        self.atomically(|r| {
            let found = r.peek_marker()?;
            if found != marker {
                return Err(Error::bad_marker(name, found));
            }
            // Smallest possible count field is an int8: marker plus one byte.
            r.ensure(1 + 2)?;
            r.pos += 1;
            let count = r.read_int()?;
            if count < 0 {
                return Err(Error::NegativeCount(count));
            }
            usize::try_from(count).map_err(|_| Error::truncated(usize::MAX, r.remaining()))
        })
    }

    /// Consume a string marker and length, returning the length.
    fn string_header(&mut self) -> Result<usize> {
        let marker = self.peek_marker()?;
        if marker != markers::STRING {
            return Err(Error::bad_marker("string", marker));
        }
        self.pos += 1;
        let len = self.read_int()?;
        if len < 0 {
            return Err(Error::NegativeCount(len));
        }
        usize::try_from(len).map_err(|_| Error::truncated(usize::MAX, self.remaining()))
    }

    fn skip_string(&mut self) -> Result<()> {
        self.atomically(|r| {
            let len = r.string_header()?;
            r.ensure(len)?;
            r.pos += len;
            Ok(())
        })
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            Err(Error::truncated(needed, available))
        } else {
            Ok(())
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Run a multi-step read, restoring the cursor if any step fails.
    fn atomically<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let start = self.pos;
        let result = read(self);
        if result.is_err() {
            self.pos = start;
        }
        result
    }
}
