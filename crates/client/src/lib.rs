//! bserlink Client - talks to the file-watching daemon over its Unix socket.
//!
//! This crate provides:
//! - [`Connection`], blocking peek-then-read PDU framing over a [`Wire`]
//! - [`Client`], the `watch-project` and `query` calls built on top of it
//! - [`Error`], which separates transport, protocol and daemon failures
//!
//! The socket path is always supplied by the caller.
//!
//! # Example
//!
//! ```no_run
//! use bserlink_client::Client;
//! use std::path::Path;
//!
//! let mut client = Client::connect("/tmp/daemon.sock")?;
//! let watched = client.watch_project(Path::new("/home/me/project"))?;
//! let listing = client.query(&watched.watch, watched.relative_path.as_deref())?;
//! for file in &listing.files {
//!     println!("{}", file.display());
//! }
//! client.disconnect()?;
//! # Ok::<(), bserlink_client::Error>(())
//! ```

mod error;
mod rpc;
mod transport;

pub use error::{Error, Result};
pub use rpc::{
    Client, QueryResult, WatchProjectResult, parse_query, parse_watch_project, query_request,
    version_request, watch_project_request,
};
pub use transport::{Connection, DEFAULT_MAX_PDU_SIZE, Wire};
