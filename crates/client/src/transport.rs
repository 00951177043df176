//! Blocking Unix socket transport with peek-then-read PDU framing.
//!
//! One call moves exactly one request and one response. Receiving happens in
//! three steps:
//! 1. Peek the binary marker and the width selector of the length field.
//! 2. Peek the whole header and decode the payload length.
//! 3. Allocate for header plus payload and read it all in one blocking call.
//!
//! Nothing is allocated for the payload until its length has been read and
//! checked. Any short peek, read or write fails the call; there is no resume,
//! so the connection should be dropped afterwards.

use crate::error::{Error, Result};
use bserlink_protocol::markers::{MAX_HEADER_SIZE, SNIFF_SIZE};
use bserlink_protocol::{Request, Response, header_len, payload_len, seal};
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::Path;

/// Largest response accepted by default (256 MiB).
pub const DEFAULT_MAX_PDU_SIZE: usize = 256 * 1024 * 1024;

/// Byte stream a [`Connection`] runs over.
pub trait Wire {
    /// Write some of `buf`, returning how many bytes were accepted.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Copy pending bytes into `buf` without consuming them, waiting for the
    /// whole of `buf` where the platform allows it.
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Consume bytes into `buf`, blocking until it is full or the peer
    /// closes.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl Wire for UnixStream {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            match self.write(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        recv_with_flags(self.as_raw_fd(), buf, libc::MSG_PEEK | libc::MSG_WAITALL)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        recv_with_flags(self.as_raw_fd(), buf, libc::MSG_WAITALL)
    }
}

fn recv_with_flags(fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> io::Result<usize> {
    loop {
        // SAFETY: buf is valid for writes of buf.len() bytes for the whole call.
        let received = unsafe { libc::recv(fd, buf.as_mut_ptr().cast(), buf.len(), flags) };
        if received >= 0 {
            return Ok(received as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// A connection to the daemon carrying one exchange at a time.
///
/// There is no internal locking: share a connection between threads only
/// behind a mutex, or give each caller its own.
#[derive(Debug)]
pub struct Connection<S = UnixStream> {
    wire: S,
    max_pdu_size: usize,
}

impl Connection<UnixStream> {
    /// Connect to the daemon's socket at `path` in blocking mode.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let connection_error = |source| Error::Connection {
            path: path.to_path_buf(),
            source,
        };

        let stream = UnixStream::connect(path).map_err(connection_error)?;
        // Blocking I/O keeps the framing logic linear.
        stream.set_nonblocking(false).map_err(connection_error)?;

        tracing::debug!(socket = %path.display(), "Connected to daemon");
        Ok(Self::from_wire(stream))
    }

    /// Close the connection, reporting the OS error if close fails.
    pub fn disconnect(self) -> Result<()> {
        let fd = self.wire.into_raw_fd();
        // SAFETY: fd was just released by the stream and is closed exactly once.
        if unsafe { libc::close(fd) } == 0 {
            tracing::debug!("Disconnected from daemon");
            Ok(())
        } else {
            Err(Error::Transport(io::Error::last_os_error()))
        }
    }
}

impl<S: Wire> Connection<S> {
    /// Wrap an already-connected byte stream.
    pub fn from_wire(wire: S) -> Self {
        Self {
            wire,
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
        }
    }

    /// Reject responses whose payload exceeds `max` bytes.
    #[must_use]
    pub fn with_max_pdu_size(mut self, max: usize) -> Self {
        self.max_pdu_size = max;
        self
    }

    /// Largest payload this connection will accept.
    #[must_use]
    pub fn max_pdu_size(&self) -> usize {
        self.max_pdu_size
    }

    /// The underlying stream.
    pub fn wire_mut(&mut self) -> &mut S {
        &mut self.wire
    }

    /// Seal `request` and write it in a single call.
    pub fn send_request(&mut self, request: &mut Request) -> Result<()> {
        seal(request);
        let bytes = request.as_bytes();
        let sent = self.wire.send(bytes)?;
        if sent != bytes.len() {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {sent} of {} bytes", bytes.len()),
            )));
        }
        tracing::trace!(bytes = sent, "Request sent");
        Ok(())
    }

    /// Read one complete response PDU.
    ///
    /// The returned cursor sits just past the header, on the top-level value.
    pub fn receive_response(&mut self) -> Result<Response> {
        let mut sniff = [0u8; SNIFF_SIZE];
        self.peek_exact(&mut sniff)?;
        let header_size = header_len(&sniff)?;

        let mut header = [0u8; MAX_HEADER_SIZE];
        let header = &mut header[..header_size];
        self.peek_exact(header)?;
        let payload_size = payload_len(header)?;

        if payload_size > self.max_pdu_size {
            tracing::warn!(
                payload = payload_size,
                max = self.max_pdu_size,
                "Response too large"
            );
            return Err(Error::violation(format!(
                "response payload of {payload_size} bytes exceeds limit of {}",
                self.max_pdu_size
            )));
        }

        let total = header_size + payload_size;
        let mut buf = vec![0u8; total];
        let received = self.wire.recv(&mut buf)?;
        if received != total {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read: {received} of {total} bytes"),
            )));
        }
        tracing::trace!(bytes = total, "Response received");

        Ok(Response::with_offset(buf, header_size))
    }

    /// Send `request` and wait for the matching response.
    pub fn round_trip(&mut self, request: &mut Request) -> Result<Response> {
        self.send_request(request)?;
        self.receive_response()
    }

    fn peek_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let peeked = self.wire.peek(buf)?;
        if peeked != buf.len() {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short peek: {peeked} of {} bytes", buf.len()),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bserlink_protocol::{Value, dump, load, markers};
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::thread;
    use std::time::Duration;

    /// Read one complete request PDU off `stream`, as the daemon would.
    pub(crate) fn read_request(stream: &mut UnixStream) -> Value {
        let mut pdu = vec![0u8; SNIFF_SIZE];
        stream.read_exact(&mut pdu).unwrap();
        let header_size = header_len(&pdu).unwrap();
        pdu.resize(header_size, 0);
        stream.read_exact(&mut pdu[SNIFF_SIZE..]).unwrap();
        let payload_size = payload_len(&pdu).unwrap();
        pdu.resize(header_size + payload_size, 0);
        stream.read_exact(&mut pdu[header_size..]).unwrap();
        load(&pdu).unwrap()
    }

    /// In-memory wire where inbound bytes trickle in `chunk` bytes per call
    /// and peeks never wait for more.
    struct TrickleWire {
        inbound: Vec<u8>,
        arrived: usize,
        consumed: usize,
        chunk: usize,
        accept: Option<usize>,
        sent: Vec<u8>,
    }

    impl TrickleWire {
        fn new(inbound: Vec<u8>, chunk: usize) -> Self {
            Self {
                inbound,
                arrived: 0,
                consumed: 0,
                chunk,
                accept: None,
                sent: Vec::new(),
            }
        }

        fn arrive(&mut self) -> &[u8] {
            self.arrived = (self.arrived + self.chunk).min(self.inbound.len());
            &self.inbound[self.consumed..self.arrived]
        }
    }

    impl Wire for TrickleWire {
        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.accept.unwrap_or(buf.len()).min(buf.len());
            self.sent.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let pending = self.arrive();
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            Ok(n)
        }

        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.peek(buf)?;
            self.consumed += n;
            Ok(n)
        }
    }

    fn sample() -> Value {
        Value::object([("watch", Value::from("/a/b")), ("version", Value::from("1.0"))])
    }

    #[test]
    fn test_receive_when_everything_has_arrived() {
        let pdu = dump(&sample());
        let mut conn = Connection::from_wire(TrickleWire::new(pdu.clone(), pdu.len()));
        let mut response = conn.receive_response().unwrap();
        assert_eq!(response.read_value().unwrap(), sample());
        assert!(response.is_exhausted());
    }

    #[test]
    fn test_trickled_response_never_uses_partial_size() {
        let pdu = dump(&sample());
        for chunk in 1..pdu.len() {
            let mut conn = Connection::from_wire(TrickleWire::new(pdu.clone(), chunk));
            match conn.receive_response() {
                Ok(mut response) => assert_eq!(response.read_value().unwrap(), sample()),
                Err(e) => assert!(e.is_transport(), "chunk {chunk}: {e}"),
            }
        }
    }

    #[test]
    fn test_short_write_is_fatal() {
        let mut wire = TrickleWire::new(Vec::new(), 1);
        wire.accept = Some(4);
        let mut conn = Connection::from_wire(wire);
        let mut request = Request::new();
        request.write_string("version");
        let err = conn.send_request(&mut request).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_send_seals_header() {
        let mut conn = Connection::from_wire(TrickleWire::new(Vec::new(), 1));
        let mut request = Request::new();
        request.write_array(1);
        request.write_string("version");
        conn.send_request(&mut request).unwrap();

        let sent = &conn.wire_mut().sent;
        assert_eq!(
            load(sent).unwrap(),
            Value::Array(vec![Value::from("version")])
        );
    }

    #[test]
    fn test_oversized_response_rejected_before_read() {
        let pdu = dump(&Value::string(vec![b'x'; 1024]));
        let mut conn =
            Connection::from_wire(TrickleWire::new(pdu.clone(), pdu.len())).with_max_pdu_size(64);
        let err = conn.receive_response().unwrap_err();
        assert!(err.is_protocol(), "{err}");
        assert_eq!(conn.wire_mut().consumed, 0);
    }

    #[test]
    fn test_bad_width_selector() {
        let bytes = vec![0, 1, markers::STRING, 1, markers::NIL];
        let mut conn = Connection::from_wire(TrickleWire::new(bytes, 16));
        let err = conn.receive_response().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(bserlink_protocol::Error::BadMarker { .. })
        ));
    }

    #[test]
    fn test_socket_round_trip() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || {
            let request = read_request(&mut daemon);
            daemon.write_all(&dump(&sample())).unwrap();
            request
        });

        let mut conn = Connection::from_wire(client);
        let mut request = Request::new();
        request.write_array(1);
        request.write_string("version");
        let mut response = conn.round_trip(&mut request).unwrap();

        assert_eq!(response.read_value().unwrap(), sample());
        assert_eq!(
            handle.join().unwrap(),
            Value::Array(vec![Value::from("version")])
        );
    }

    #[test]
    fn test_socket_chunked_delivery() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        let pdu = dump(&sample());
        let writer = thread::spawn(move || {
            for piece in pdu.chunks(3) {
                if daemon.write_all(piece).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(2));
            }
            daemon
        });

        let mut conn = Connection::from_wire(client);
        match conn.receive_response() {
            Ok(mut response) => assert_eq!(response.read_value().unwrap(), sample()),
            Err(e) => assert!(e.is_transport(), "{e}"),
        }
        drop(writer.join().unwrap());
    }

    #[test]
    fn test_peer_closes_mid_header() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        daemon.write_all(&[0, 1, markers::INT32, 9]).unwrap();
        drop(daemon);

        let mut conn = Connection::from_wire(client);
        let err = conn.receive_response().unwrap_err();
        assert!(err.is_transport(), "{err}");
    }

    #[test]
    fn test_peer_closes_mid_payload() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        let pdu = dump(&sample());
        daemon.write_all(&pdu[..pdu.len() - 2]).unwrap();
        drop(daemon);

        let mut conn = Connection::from_wire(client);
        let err = conn.receive_response().unwrap_err();
        assert!(err.is_transport(), "{err}");
    }

    #[test]
    fn test_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let err = Connection::connect(dir.path().join("absent.sock")).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn test_connect_and_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let conn = Connection::connect(&path).unwrap();
        let (_accepted, _) = listener.accept().unwrap();
        assert_eq!(conn.max_pdu_size(), DEFAULT_MAX_PDU_SIZE);
        conn.disconnect().unwrap();
    }
}
