//! bserlink Protocol - BSER encoding and decoding for the file-watching daemon.
//!
//! This crate provides:
//! - [`Request`], an append-only builder for outbound PDUs
//! - [`Response`], a bounds-checked cursor over a received PDU
//! - [`Value`], an owned tree for callers that want the whole response
//! - PDU header helpers via [`header_len`], [`payload_len`] and [`seal`]
//!
//! # Wire Format
//!
//! Every PDU opens with the binary marker `00 01`, one byte selecting the
//! width of the length field, the payload length in native byte order, and
//! then exactly one encoded value. See [`markers`] for the type markers.
//!
//! # Example
//!
//! ```rust
//! use bserlink_protocol::{Request, Response, seal};
//!
//! // ["watch-project", "/tmp/project"]
//! let mut request = Request::new();
//! request.write_array(2);
//! request.write_string("watch-project");
//! request.write_string("/tmp/project");
//! seal(&mut request);
//!
//! // Decode the payload back.
//! let mut response = Response::new(request.payload().to_vec());
//! assert_eq!(response.read_array().unwrap(), 2);
//! assert_eq!(response.read_string().unwrap(), b"watch-project");
//! response.skip_value().unwrap();
//! assert!(response.is_exhausted());
//! ```

mod decode;
mod encode;
mod error;
pub mod markers;
mod pdu;
mod value;

pub use decode::{MAX_DEPTH, Response};
pub use encode::Request;
pub use error::{Error, Result};
pub use pdu::{dump, header_len, load, payload_len, seal};
pub use value::Value;
