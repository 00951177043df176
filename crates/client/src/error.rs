//! Error type for client operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for transport and RPC operations.
///
/// The variants separate malformed data from the daemon's own errors and
/// from a broken connection, so callers can decide whether reconnecting is
/// worth it.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unexpected BSER data.
    #[error(transparent)]
    Protocol(#[from] bserlink_protocol::Error),

    /// Socket setup failed.
    #[error("failed to connect to {}: {source}", .path.display())]
    Connection {
        /// Socket path that was dialled.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// I/O failure on an established connection, including short reads
    /// and writes.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The daemon answered with an `error` field.
    #[error("daemon error: {0}")]
    Daemon(String),
}

impl Error {
    /// True for connection and transport failures. The connection should be
    /// dropped and, if desired, re-established.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Transport(_))
    }

    /// True if the daemon reported an application-level error.
    #[must_use]
    pub fn is_daemon(&self) -> bool {
        matches!(self, Self::Daemon(_))
    }

    /// True if the response was malformed or broke a post-condition.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    pub(crate) fn violation(message: impl Into<String>) -> Self {
        Self::Protocol(bserlink_protocol::Error::ProtocolViolation(message.into()))
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
