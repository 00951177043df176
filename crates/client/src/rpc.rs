//! `watch-project` and `query` requests.
//!
//! Responses are open-ended objects. Only the keys listed here are decoded;
//! everything else is stepped over with [`Response::skip_value`].

use crate::error::{Error, Result};
use crate::transport::{Connection, Wire};
use bserlink_protocol::{Request, Response, Value, markers};
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Result of `watch-project`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchProjectResult {
    /// Root the daemon is actually watching.
    pub watch: PathBuf,
    /// Requested directory relative to `watch`, when they differ.
    pub relative_path: Option<PathBuf>,
}

/// Result of `query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Matching file names, relative to the queried root.
    pub files: Vec<PathBuf>,
    /// Daemon clock at the time of the query.
    pub clock: Option<String>,
}

/// Build `["watch-project", root]`.
#[must_use]
pub fn watch_project_request(root: &Path) -> Request {
    let mut request = Request::new();
    request.write_array(2);
    request.write_string("watch-project");
    request.write_string(root.as_os_str().as_bytes());
    request
}

/// Build `["query", root, {expression, fields[, relative_root]}]`, asking for
/// the names of regular files.
#[must_use]
pub fn query_request(root: &Path, relative_root: Option<&Path>) -> Request {
    let mut request = Request::new();
    request.write_array(3);
    request.write_string("query");
    request.write_string(root.as_os_str().as_bytes());
    request.write_object(if relative_root.is_some() { 3 } else { 2 });
    request.write_string("expression");
    request.write_array(2);
    request.write_string("type");
    request.write_string("f");
    request.write_string("fields");
    request.write_array(1);
    request.write_string("name");
    if let Some(relative_root) = relative_root {
        request.write_string("relative_root");
        request.write_string(relative_root.as_os_str().as_bytes());
    }
    request
}

/// Build `["version"]`.
#[must_use]
pub fn version_request() -> Request {
    let mut request = Request::new();
    request.write_array(1);
    request.write_string("version");
    request
}

/// Extract `watch` and `relative_path` from a `watch-project` response.
pub fn parse_watch_project(response: &mut Response) -> Result<WatchProjectResult> {
    let mut watch = None;
    let mut relative_path = None;

    let count = response.read_object()?;
    for _ in 0..count {
        let key = response.read_string()?;
        match key.as_slice() {
            b"watch" => watch = Some(read_path(response)?),
            b"relative_path" => relative_path = Some(read_path(response)?),
            b"error" => return Err(daemon_error(response)?),
            _ => response.skip_value()?,
        }
    }

    let watch = watch.ok_or_else(|| Error::violation("watch-project response has no watch"))?;
    Ok(WatchProjectResult {
        watch,
        relative_path,
    })
}

/// Extract `files` and `clock` from a `query` response.
pub fn parse_query(response: &mut Response) -> Result<QueryResult> {
    let mut files = None;
    let mut clock = None;

    let count = response.read_object()?;
    for _ in 0..count {
        let key = response.read_string()?;
        match key.as_slice() {
            b"files" => files = Some(read_files(response)?),
            b"clock" if response.peek_marker()? == markers::STRING => {
                clock = Some(String::from_utf8_lossy(&response.read_string()?).into_owned());
            }
            b"error" => return Err(daemon_error(response)?),
            _ => response.skip_value()?,
        }
    }

    let files = files.ok_or_else(|| Error::violation("query response has no files"))?;
    Ok(QueryResult { files, clock })
}

/// Read the value of an `error` key into a [`Error::Daemon`].
fn daemon_error(response: &mut Response) -> Result<Error> {
    let message = match response.read_value()? {
        Value::String(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        other => format!("{other:?}"),
    };
    tracing::debug!(message = %message, "Daemon reported an error");
    Ok(Error::Daemon(message))
}

fn read_path(response: &mut Response) -> Result<PathBuf> {
    Ok(bytes_to_path(response.read_string()?))
}

fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(OsString::from_vec(bytes))
}

/// `files` is a list of names when a single field is requested, but the
/// daemon may also send one object per file, or a template of them.
fn read_files(response: &mut Response) -> Result<Vec<PathBuf>> {
    if response.peek_marker()? == markers::TEMPLATE {
        let Value::Array(rows) = response.read_value()? else {
            return Err(Error::violation("template did not expand to an array"));
        };
        return rows.iter().map(name_of).collect();
    }

    let count = response.read_array()?;
    let mut files = Vec::with_capacity(count.min(response.remaining()));
    for _ in 0..count {
        if response.peek_marker()? == markers::OBJECT {
            files.push(name_of(&response.read_value()?)?);
        } else {
            files.push(read_path(response)?);
        }
    }
    Ok(files)
}

fn name_of(file: &Value) -> Result<PathBuf> {
    file.get("name")
        .and_then(Value::as_bytes)
        .map(|name| bytes_to_path(name.to_vec()))
        .ok_or_else(|| Error::violation("file entry has no name"))
}

/// RPC client over one daemon connection.
#[derive(Debug)]
pub struct Client<S = UnixStream> {
    conn: Connection<S>,
}

impl Client<UnixStream> {
    /// Connect to the daemon's socket at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Connection::connect(path).map(Self::new)
    }

    /// Close the underlying connection.
    pub fn disconnect(self) -> Result<()> {
        self.conn.disconnect()
    }
}

impl<S: Wire> Client<S> {
    /// Wrap an existing connection.
    pub fn new(conn: Connection<S>) -> Self {
        Self { conn }
    }

    /// The underlying connection.
    pub fn connection_mut(&mut self) -> &mut Connection<S> {
        &mut self.conn
    }

    /// Ask the daemon to watch `root`, returning the effective watch root.
    pub fn watch_project(&mut self, root: &Path) -> Result<WatchProjectResult> {
        tracing::debug!(root = %root.display(), "watch-project");
        let mut response = self.conn.round_trip(&mut watch_project_request(root))?;
        parse_watch_project(&mut response)
    }

    /// List the regular files under `root`, optionally scoped to
    /// `relative_root`.
    pub fn query(&mut self, root: &Path, relative_root: Option<&Path>) -> Result<QueryResult> {
        tracing::debug!(
            root = %root.display(),
            relative_root = ?relative_root,
            "query"
        );
        let mut response = self
            .conn
            .round_trip(&mut query_request(root, relative_root))?;
        let result = parse_query(&mut response)?;
        tracing::debug!(files = result.files.len(), "query complete");
        Ok(result)
    }

    /// Fetch the daemon's `version` response as a whole value.
    pub fn version(&mut self) -> Result<Value> {
        let mut response = self.conn.round_trip(&mut version_request())?;
        let value = response.read_value()?;
        if let Some(message) = value.get("error") {
            return Err(Error::Daemon(
                message
                    .as_bytes()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_else(|| format!("{message:?}")),
            ));
        }
        Ok(value)
    }
}
