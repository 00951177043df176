//! PDU framing helpers: header parsing, sealing and whole-buffer decode.
//!
//! A PDU is laid out as:
//! - 2 bytes: binary marker `00 01`
//! - 1 byte: integer marker selecting the width of the length field
//! - 1, 2, 4 or 8 bytes: payload length (signed, native byte order)
//! - N bytes: one encoded value

use crate::decode::Response;
use crate::encode::Request;
use crate::error::{Error, Result};
use crate::markers::{self, BINARY_MARKER, LENGTH_OFFSET, SNIFF_SIZE};
use crate::value::Value;

/// Total header length implied by the first [`SNIFF_SIZE`] bytes of a PDU.
///
/// Fails with `BadMarker` if the binary marker is missing or the width
/// selector is not one of the four integer markers.
pub fn header_len(sniff: &[u8]) -> Result<usize> {
    if sniff.len() < SNIFF_SIZE {
        return Err(Error::Truncated {
            needed: SNIFF_SIZE,
            available: sniff.len(),
        });
    }
    if sniff[..BINARY_MARKER.len()] != BINARY_MARKER {
        return Err(Error::BadMarker {
            expected: "binary marker",
            found: sniff[0],
        });
    }
    let selector = sniff[BINARY_MARKER.len()];
    let width = markers::int_width(selector).ok_or(Error::BadMarker {
        expected: "length width",
        found: selector,
    })?;
    Ok(SNIFF_SIZE + width)
}

/// Payload length declared by a complete header.
pub fn payload_len(header: &[u8]) -> Result<usize> {
    let len = header_len(header)?;
    if header.len() < len {
        return Err(Error::Truncated {
            needed: len,
            available: header.len(),
        });
    }
    let mut reader = Response::new(header[BINARY_MARKER.len()..len].to_vec());
    let declared = reader.read_int()?;
    if declared < 0 {
        return Err(Error::NegativeCount(declared));
    }
    if declared == 0 {
        return Err(Error::ProtocolViolation("empty payload".into()));
    }
    usize::try_from(declared).map_err(|_| {
        Error::ProtocolViolation(format!("payload length {declared} does not fit in memory"))
    })
}

/// Patch the length placeholder of `request` with its payload size.
pub fn seal(request: &mut Request) {
    // Vec lengths never exceed isize::MAX, so the cast is lossless.
    let len = request.payload().len() as i64;
    request.header_mut()[LENGTH_OFFSET..].copy_from_slice(&len.to_ne_bytes());
}

/// Encode `value` as a complete, sealed PDU.
#[must_use]
pub fn dump(value: &Value) -> Vec<u8> {
    let mut request = Request::new();
    request.write_value(value);
    seal(&mut request);
    request.into_bytes()
}

/// Decode one complete PDU held in memory.
///
/// The declared length must match the bytes present exactly, and the payload
/// must hold exactly one value.
pub fn load(bytes: &[u8]) -> Result<Value> {
    let header = header_len(bytes)?;
    let declared = payload_len(bytes)?;
    let actual = bytes.len() - header;
    if declared != actual {
        return Err(Error::SizeMismatch { declared, actual });
    }

    let mut reader = Response::with_offset(bytes.to_vec(), header);
    let value = reader.read_value()?;
    if !reader.is_exhausted() {
        return Err(Error::SizeMismatch {
            declared,
            actual: declared - reader.remaining(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{INT8, INT16, REQUEST_HEADER};

    #[test]
    fn test_seal_writes_payload_length() {
        let mut request = Request::new();
        request.write_array(2);
        request.write_string("watch-project");
        request.write_string("/r");
        seal(&mut request);

        let bytes = request.as_bytes();
        assert_eq!(header_len(bytes).unwrap(), REQUEST_HEADER.len());
        assert_eq!(payload_len(bytes).unwrap(), request.payload().len());
    }

    #[test]
    fn test_header_len_by_selector() {
        assert_eq!(header_len(&[0, 1, INT8]).unwrap(), 4);
        assert_eq!(header_len(&[0, 1, INT16]).unwrap(), 5);
        assert_eq!(header_len(&[0, 1, markers::INT32]).unwrap(), 7);
        assert_eq!(header_len(&[0, 1, markers::INT64]).unwrap(), 11);
    }

    #[test]
    fn test_header_len_rejects_container_selectors() {
        for selector in [markers::ARRAY, markers::OBJECT, markers::STRING, markers::DOUBLE] {
            assert!(matches!(
                header_len(&[0, 1, selector]),
                Err(Error::BadMarker { expected: "length width", .. })
            ));
        }
        assert!(matches!(
            header_len(&[0, 2, INT8]),
            Err(Error::BadMarker { expected: "binary marker", .. })
        ));
        assert!(matches!(header_len(&[0, 1]), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_payload_len_rejects_empty_and_negative() {
        assert!(matches!(
            payload_len(&[0, 1, INT8, 0]),
            Err(Error::ProtocolViolation(_))
        ));
        assert_eq!(payload_len(&[0, 1, INT8, 0xff]), Err(Error::NegativeCount(-1)));
        assert!(matches!(payload_len(&[0, 1, INT16, 1]), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_load_dump() {
        let value = Value::object([
            ("version", Value::from("2024.01.01.00")),
            ("capabilities", Value::Array(vec![Value::Int(1), Value::Bool(false)])),
        ]);
        assert_eq!(load(&dump(&value)).unwrap(), value);
    }

    #[test]
    fn test_load_compact_header() {
        // Daemon responses use the narrowest length width.
        let bytes = [0, 1, INT8, 3, markers::STRING, INT8, 0];
        assert_eq!(load(&bytes).unwrap(), Value::String(Vec::new()));
    }

    #[test]
    fn test_load_size_mismatch() {
        let mut bytes = dump(&Value::Int(5));
        bytes.push(0);
        assert!(matches!(load(&bytes), Err(Error::SizeMismatch { .. })));

        // Declared length matches, but the value ends early.
        let bytes = [0, 1, INT8, 3, markers::INT8, 7, markers::NIL];
        assert_eq!(
            load(&bytes),
            Err(Error::SizeMismatch { declared: 3, actual: 2 })
        );
    }
}
