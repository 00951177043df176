//! BSER type markers and header constants.
//!
//! Every value on the wire opens with a single marker byte. These match the
//! daemon's encoding exactly.

/// Two-byte sequence that opens every PDU.
pub const BINARY_MARKER: [u8; 2] = [0x00, 0x01];

/// Array of N values.
pub const ARRAY: u8 = 0x00;
/// Object of N key/value pairs.
pub const OBJECT: u8 = 0x01;
/// Length-prefixed byte string.
pub const STRING: u8 = 0x02;
/// Signed 8-bit integer.
pub const INT8: u8 = 0x03;
/// Signed 16-bit integer.
pub const INT16: u8 = 0x04;
/// Signed 32-bit integer.
pub const INT32: u8 = 0x05;
/// Signed 64-bit integer.
pub const INT64: u8 = 0x06;
/// IEEE-754 double.
pub const DOUBLE: u8 = 0x07;
/// Boolean true.
pub const TRUE: u8 = 0x08;
/// Boolean false.
pub const FALSE: u8 = 0x09;
/// Null.
pub const NIL: u8 = 0x0a;
/// Compact array of homogeneous objects.
pub const TEMPLATE: u8 = 0x0b;
/// Missing value; only valid inside a template row.
pub const SKIP: u8 = 0x0c;

/// Request header: binary marker, int64 length selector, and an 8-byte
/// placeholder for the payload length.
pub const REQUEST_HEADER: [u8; 11] = [0x00, 0x01, INT64, 0, 0, 0, 0, 0, 0, 0, 0];

/// Offset of the length placeholder inside [`REQUEST_HEADER`].
pub const LENGTH_OFFSET: usize = BINARY_MARKER.len() + 1;

/// Bytes needed to learn the width of a PDU's length field.
pub const SNIFF_SIZE: usize = BINARY_MARKER.len() + 1;

/// Upper bound on a PDU header: marker, selector and an int64 length.
pub const MAX_HEADER_SIZE: usize = SNIFF_SIZE + 8;

/// Growth chunk for request and response buffers.
pub const DEFAULT_STORAGE: usize = 4096;

/// Width in bytes of the integer introduced by `marker`, if it is one of the
/// four integer markers.
#[must_use]
pub const fn int_width(marker: u8) -> Option<usize> {
    match marker {
        INT8 => Some(1),
        INT16 => Some(2),
        INT32 => Some(4),
        INT64 => Some(8),
        _ => None,
    }
}
