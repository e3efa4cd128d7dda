//! Resource loading for include directives.
//!
//! The expander never touches the filesystem or network directly; it asks a
//! [`ResourceLoader`] for the text behind an include. [`FsLoader`] is the
//! real implementation and [`MemoryLoader`] serves canned documents in tests.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::value::IncludeKind;

/// Default timeout for URL includes.
pub const DEFAULT_URL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on the size of a URL include response, headers included.
pub const DEFAULT_MAX_URL_BYTES: u64 = 16 * 1024 * 1024;

/// Trait for fetching the text behind an include directive.
///
/// `location` is already resolved: relative file paths have been joined onto
/// the including document's directory.
///
/// # Examples
///
/// ```
/// use hocon::{IncludeKind, MemoryLoader, ResourceLoader};
///
/// let loader = MemoryLoader::new().with_resource(IncludeKind::File, "a.conf", "x = 1");
/// assert_eq!(loader.load(IncludeKind::File, "a.conf").unwrap(), "x = 1");
/// assert!(loader.load(IncludeKind::File, "b.conf").is_err());
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ResourceLoader: Send + Sync {
    /// Load the document at `location`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the resource does not exist, cannot be read or
    /// times out. A [`io::ErrorKind::NotFound`] error lets the expander skip
    /// non-required includes quietly.
    fn load(&self, kind: IncludeKind, location: &str) -> io::Result<String>;

    /// Directory that relative includes inside the loaded document resolve
    /// against, if any.
    fn base_dir(&self, kind: IncludeKind, location: &str) -> Option<PathBuf> {
        match kind {
            IncludeKind::File => Path::new(location).parent().map(Path::to_path_buf),
            IncludeKind::Url => location
                .strip_prefix("file://")
                .and_then(|path| Path::new(path).parent())
                .map(Path::to_path_buf),
            IncludeKind::Classpath => None,
        }
    }
}

/// Loads includes from the filesystem, classpath roots and URLs.
///
/// Supported URL schemes are `file://` and plain `http://`. HTTP redirects
/// are not followed; a 3xx status is an error.
#[derive(Debug, Clone)]
pub struct FsLoader {
    classpath_roots: Vec<PathBuf>,
    url_timeout: Duration,
    max_url_bytes: u64,
}

impl Default for FsLoader {
    fn default() -> Self {
        Self {
            classpath_roots: Vec::new(),
            url_timeout: DEFAULT_URL_TIMEOUT,
            max_url_bytes: DEFAULT_MAX_URL_BYTES,
        }
    }
}

impl FsLoader {
    /// Creates a loader with no classpath roots and the default URL timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory searched by `classpath(...)` includes, in order.
    #[must_use]
    pub fn with_classpath_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.classpath_roots.push(root.into());
        self
    }

    /// Sets the connect/read timeout for URL includes.
    #[must_use]
    pub fn with_url_timeout(mut self, timeout: Duration) -> Self {
        self.url_timeout = timeout;
        self
    }

    /// Sets the largest URL include response accepted, in bytes.
    #[must_use]
    pub fn with_max_url_bytes(mut self, limit: u64) -> Self {
        self.max_url_bytes = limit;
        self
    }

    /// The configured classpath roots.
    #[must_use]
    pub fn classpath_roots(&self) -> &[PathBuf] {
        &self.classpath_roots
    }

    fn load_classpath(&self, location: &str) -> io::Result<String> {
        let relative = location.trim_start_matches('/');
        for root in &self.classpath_roots {
            let candidate = root.join(relative);
            if candidate.is_file() {
                log::trace!("Classpath resource {location} found at {}", candidate.display());
                return fs::read_to_string(candidate);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("classpath resource '{location}' not found"),
        ))
    }

    fn load_url(&self, location: &str) -> io::Result<String> {
        if let Some(path) = location.strip_prefix("file://") {
            return fs::read_to_string(path);
        }
        match location.strip_prefix("http://") {
            Some(rest) => self.http_get(rest),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported URL scheme in '{location}'"),
            )),
        }
    }

    /// Minimal HTTP/1.0 GET; `rest` is the URL without its `http://` prefix.
    fn http_get(&self, rest: &str) -> io::Result<String> {
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        let (host, port) = split_authority(authority)?;

        let mut last_err = io::Error::new(
            io::ErrorKind::NotFound,
            format!("could not resolve host '{host}'"),
        );
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.url_timeout) {
                Ok(stream) => return self.exchange(stream, authority, path),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    fn exchange(&self, mut stream: TcpStream, authority: &str, path: &str) -> io::Result<String> {
        stream.set_read_timeout(Some(self.url_timeout))?;
        stream.set_write_timeout(Some(self.url_timeout))?;
        write!(
            stream,
            "GET {path} HTTP/1.0\r\nHost: {authority}\r\nAccept: */*\r\nConnection: close\r\n\r\n"
        )?;

        let mut response = Vec::new();
        stream
            .take(self.max_url_bytes.saturating_add(1))
            .read_to_end(&mut response)
            .map_err(|err| {
                if err.kind() == io::ErrorKind::WouldBlock {
                    io::Error::new(io::ErrorKind::TimedOut, "timed out reading URL include")
                } else {
                    err
                }
            })?;
        if response.len() as u64 > self.max_url_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("URL include response exceeds {} bytes", self.max_url_bytes),
            ));
        }
        let response = String::from_utf8(response)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let (head, body) = response.split_once("\r\n\r\n").ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "malformed HTTP response")
        })?;
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed HTTP status"))?;
        match status {
            200..=299 => Ok(body.to_string()),
            404 => Err(io::Error::new(io::ErrorKind::NotFound, "HTTP 404")),
            other => Err(io::Error::other(format!("HTTP status {other}"))),
        }
    }
}

/// Splits `host[:port]` or `[ipv6][:port]` into host and port.
fn split_authority(authority: &str) -> io::Result<(&str, u16)> {
    let invalid = |what: String| io::Error::new(io::ErrorKind::InvalidInput, what);
    let (host, port) = match authority.strip_prefix('[') {
        Some(bracketed) => {
            let (host, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid(format!("unterminated IPv6 host in '{authority}'")))?;
            match rest {
                "" => (host, None),
                _ => match rest.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(invalid(format!("invalid authority '{authority}'"))),
                },
            }
        }
        None => match authority.split_once(':') {
            Some((_, port)) if port.contains(':') => {
                return Err(invalid(format!("IPv6 host must be bracketed in '{authority}'")))
            }
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        },
    };
    if host.is_empty() {
        return Err(invalid(format!("missing host in '{authority}'")));
    }
    let port = match port {
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| invalid(format!("invalid port '{port}'")))?,
        None => 80,
    };
    Ok((host, port))
}

impl ResourceLoader for FsLoader {
    fn load(&self, kind: IncludeKind, location: &str) -> io::Result<String> {
        log::debug!("Loading {kind} include {location}");
        match kind {
            IncludeKind::File => fs::read_to_string(location),
            IncludeKind::Classpath => self.load_classpath(location),
            IncludeKind::Url => self.load_url(location),
        }
    }
}

/// In-memory loader serving canned documents.
///
/// Useful for tests and for embedding configuration in a binary.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<(IncludeKind, String), String>,
}

impl MemoryLoader {
    /// Creates a loader with no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `text` under `kind` and `location`.
    #[must_use]
    pub fn with_resource(
        mut self,
        kind: IncludeKind,
        location: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.insert(kind, location, text);
        self
    }

    /// Registers `text` under `kind` and `location`, replacing any previous entry.
    pub fn insert(&mut self, kind: IncludeKind, location: impl Into<String>, text: impl Into<String>) {
        self.resources.insert((kind, location.into()), text.into());
    }
}

impl ResourceLoader for MemoryLoader {
    fn load(&self, kind: IncludeKind, location: &str) -> io::Result<String> {
        self.resources
            .get(&(kind, location.to_string()))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no {kind} resource '{location}'"),
                )
            })
    }
}
