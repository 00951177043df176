//! Append-only BSER request builder.
//!
//! A [`Request`] opens with [`REQUEST_HEADER`]; the length placeholder is left
//! zeroed here and patched by [`crate::seal`] just before the bytes go out.
//! The builder performs no structural validation: after `write_array(n)` the
//! caller must append exactly `n` values, and `2 * n` after `write_object(n)`.

use crate::markers::{self, DEFAULT_STORAGE, REQUEST_HEADER};
use crate::value::Value;

/// Growable buffer holding one outbound PDU.
#[derive(Debug, Clone)]
pub struct Request {
    buf: Vec<u8>,
}

impl Request {
    /// Start a request with the fixed header and no payload.
    #[must_use]
    pub fn new() -> Self {
        let mut request = Self {
            buf: Vec::with_capacity(DEFAULT_STORAGE),
        };
        request.append(&REQUEST_HEADER);
        request
    }

    /// Copy `bytes` onto the end of the buffer.
    ///
    /// When the buffer is full, capacity grows by at least
    /// [`DEFAULT_STORAGE`] bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        let spare = self.buf.capacity() - self.buf.len();
        if bytes.len() > spare {
            self.buf.reserve(bytes.len().max(DEFAULT_STORAGE));
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Append `n` using the narrowest integer encoding that holds it.
    pub fn write_int(&mut self, n: i64) {
        if let Ok(v) = i8::try_from(n) {
            self.append(&[markers::INT8]);
            self.append(&v.to_ne_bytes());
        } else if let Ok(v) = i16::try_from(n) {
            self.append(&[markers::INT16]);
            self.append(&v.to_ne_bytes());
        } else if let Ok(v) = i32::try_from(n) {
            self.append(&[markers::INT32]);
            self.append(&v.to_ne_bytes());
        } else {
            self.append(&[markers::INT64]);
            self.append(&n.to_ne_bytes());
        }
    }

    /// Append a length-prefixed byte string. No terminator is written.
    pub fn write_string(&mut self, s: impl AsRef<[u8]>) {
        let s = s.as_ref();
        self.append(&[markers::STRING]);
        self.write_len(s.len());
        self.append(s);
    }

    /// Open an array of `len` values.
    pub fn write_array(&mut self, len: usize) {
        self.append(&[markers::ARRAY]);
        self.write_len(len);
    }

    /// Open an object of `len` key/value pairs.
    pub fn write_object(&mut self, len: usize) {
        self.append(&[markers::OBJECT]);
        self.write_len(len);
    }

    /// Append an IEEE-754 double.
    pub fn write_double(&mut self, d: f64) {
        self.append(&[markers::DOUBLE]);
        self.append(&d.to_ne_bytes());
    }

    /// Append a boolean.
    pub fn write_bool(&mut self, b: bool) {
        self.append(&[if b { markers::TRUE } else { markers::FALSE }]);
    }

    /// Append a null.
    pub fn write_nil(&mut self) {
        self.append(&[markers::NIL]);
    }

    /// Serialize a whole value tree.
    pub fn write_value(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                self.write_array(items.len());
                for item in items {
                    self.write_value(item);
                }
            }
            Value::Object(pairs) => {
                self.write_object(pairs.len());
                for (key, item) in pairs {
                    self.write_string(key);
                    self.write_value(item);
                }
            }
            Value::String(bytes) => self.write_string(bytes),
            Value::Int(n) => self.write_int(*n),
            Value::Double(d) => self.write_double(*d),
            Value::Bool(b) => self.write_bool(*b),
            Value::Nil => self.write_nil(),
        }
    }

    /// The whole PDU, header included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the request, returning the PDU bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Bytes after the header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf[REQUEST_HEADER.len()..]
    }

    /// Total length, header included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing but the header has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }

    /// Allocated capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub(crate) fn header_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..REQUEST_HEADER.len()]
    }

    // Vec lengths never exceed isize::MAX, so the cast is lossless.
    fn write_len(&mut self, len: usize) {
        self.write_int(len as i64);
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(f: impl FnOnce(&mut Request)) -> Vec<u8> {
        let mut r = Request::new();
        f(&mut r);
        r.payload().to_vec()
    }

    #[test]
    fn test_new_holds_only_header() {
        let r = Request::new();
        assert_eq!(r.as_bytes(), &REQUEST_HEADER);
        assert!(r.is_empty());
        assert!(r.capacity() >= r.len());
    }

    #[test]
    fn test_write_int_picks_narrowest_width() {
        assert_eq!(payload_of(|r| r.write_int(127)), vec![markers::INT8, 127]);

        let mut expected = vec![markers::INT16];
        expected.extend_from_slice(&128i16.to_ne_bytes());
        assert_eq!(payload_of(|r| r.write_int(128)), expected);

        let mut expected = vec![markers::INT16];
        expected.extend_from_slice(&(-129i16).to_ne_bytes());
        assert_eq!(payload_of(|r| r.write_int(-129)), expected);

        assert_eq!(payload_of(|r| r.write_int(-128)), vec![markers::INT8, 0x80]);
        assert_eq!(payload_of(|r| r.write_int(40_000))[0], markers::INT32);
        assert_eq!(payload_of(|r| r.write_int(i64::from(i32::MAX) + 1))[0], markers::INT64);
        assert_eq!(payload_of(|r| r.write_int(i64::MIN)).len(), 9);
    }

    #[test]
    fn test_write_string_has_no_terminator() {
        assert_eq!(
            payload_of(|r| r.write_string("query")),
            vec![markers::STRING, markers::INT8, 5, b'q', b'u', b'e', b'r', b'y']
        );
        assert_eq!(
            payload_of(|r| r.write_string("")),
            vec![markers::STRING, markers::INT8, 0]
        );
    }

    #[test]
    fn test_containers_and_scalars() {
        assert_eq!(payload_of(|r| r.write_array(3)), vec![markers::ARRAY, markers::INT8, 3]);
        assert_eq!(payload_of(|r| r.write_object(2)), vec![markers::OBJECT, markers::INT8, 2]);
        assert_eq!(payload_of(|r| r.write_bool(true)), vec![markers::TRUE]);
        assert_eq!(payload_of(|r| r.write_bool(false)), vec![markers::FALSE]);
        assert_eq!(payload_of(|r| r.write_nil()), vec![markers::NIL]);
        assert_eq!(payload_of(|r| r.write_double(1.5)).len(), 9);
    }

    #[test]
    fn test_growth_preserves_content() {
        let big = vec![b'x'; DEFAULT_STORAGE * 3];
        let mut r = Request::new();
        r.write_string("head");
        r.append(&big);
        r.write_string("tail");

        assert!(r.capacity() >= r.len());
        assert_eq!(&r.as_bytes()[..REQUEST_HEADER.len()], &REQUEST_HEADER);
        assert_eq!(&r.payload()[..7], &[markers::STRING, markers::INT8, 4, b'h', b'e', b'a', b'd']);
        assert!(r.payload().ends_with(b"tail"));
    }

    #[test]
    fn test_write_value_matches_manual_encoding() {
        let value = Value::Array(vec![
            Value::from("watch-project"),
            Value::object([("k", Value::Int(1))]),
        ]);
        let manual = payload_of(|r| {
            r.write_array(2);
            r.write_string("watch-project");
            r.write_object(1);
            r.write_string("k");
            r.write_int(1);
        });
        assert_eq!(payload_of(|r| r.write_value(&value)), manual);
    }
}
