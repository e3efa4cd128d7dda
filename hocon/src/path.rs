//! Path expressions addressing values inside a configuration tree.
//!
//! A path expression is a dotted sequence of keys such as `server.http.port`.
//! A segment may be double-quoted, in which case dots inside it are part of the
//! key: `a."b.c".d` has the three segments `a`, `b.c` and `d`.

use std::fmt;

use crate::error::{Error, Result};

/// A parsed path expression: the sequence of object keys leading to a value.
///
/// # Examples
///
/// ```
/// use hocon::ConfigPath;
///
/// let path = ConfigPath::parse(r#"akka."remote.netty".port"#).unwrap();
/// assert_eq!(path.segments(), ["akka", "remote.netty", "port"]);
/// assert_eq!(path.to_string(), r#"akka."remote.netty".port"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigPath(Vec<String>);

impl ConfigPath {
    /// The empty path, addressing the document root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the expression is empty, contains an
    /// empty unquoted segment (`a..b`) or an unterminated quoted segment.
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: expr.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(invalid("path expression is empty"));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut quoted_segment = false;
        let mut chars = trimmed.chars();

        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    quoted_segment = true;
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some('n') => current.push('\n'),
                                Some('t') => current.push('\t'),
                                Some(other) => current.push(other),
                                None => return Err(invalid("unterminated quoted segment")),
                            },
                            Some(other) => current.push(other),
                            None => return Err(invalid("unterminated quoted segment")),
                        }
                    }
                }
                '.' => {
                    if current.is_empty() && !quoted_segment {
                        return Err(invalid("empty path segment"));
                    }
                    segments.push(std::mem::take(&mut current));
                    quoted_segment = false;
                }
                other => current.push(other),
            }
        }

        if current.is_empty() && !quoted_segment {
            return Err(invalid("empty path segment"));
        }
        segments.push(current);
        Ok(Self(segments))
    }

    /// Builds a path from already-unescaped key segments.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The key segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns a new path with `key` appended.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_string());
        Self(segments)
    }

    /// Returns a new path with all of `other`'s segments appended.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Returns the first `len` segments as a path.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Returns `true` if `self` equals `other` or is an ancestor of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use hocon::ConfigPath;
    ///
    /// let a = ConfigPath::parse("a").unwrap();
    /// let ab = ConfigPath::parse("a.b").unwrap();
    /// assert!(a.is_prefix_of(&ab));
    /// assert!(ab.is_prefix_of(&ab));
    /// assert!(!ab.is_prefix_of(&a));
    /// ```
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// The segments of `self` remaining after removing `prefix`.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Self) -> Option<&[String]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }

    fn needs_quotes(segment: &str) -> bool {
        segment.is_empty()
            || segment.chars().any(|c| {
                c.is_whitespace()
                    || matches!(
                        c,
                        '.' | '"' | '$' | '{' | '}' | '[' | ']' | ':' | '=' | ',' | '+' | '#'
                    )
            })
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if Self::needs_quotes(segment) {
                write!(f, "\"{}\"", segment.replace('\\', "\\\\").replace('"', "\\\""))?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}
