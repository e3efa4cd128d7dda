//! Error types for the hocon library.
//!
//! Every stage of the pipeline (parsing, include expansion, substitution
//! resolution and typed access) reports failures through the single [`Error`]
//! enum defined here, using `thiserror` for the `Display` implementations.

use thiserror::Error;

/// Result type alias for operations that may fail with a hocon error.
///
/// # Examples
///
/// ```
/// use hocon::{Error, Result};
///
/// fn example_operation() -> Result<i64> {
///     Ok(42)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the hocon library.
///
/// Parsing and resolution are all-or-nothing: any of these errors returned
/// from a parse or resolve call means no tree was produced. Accessor errors
/// ([`Error::MissingKey`], [`Error::TypeMismatch`], [`Error::Format`]) only
/// affect the call that raised them.
#[derive(Debug, Error)]
pub enum Error {
    /// The input text is not valid configuration syntax.
    #[error("syntax error at line {line}, column {col}: {message}")]
    Syntax {
        /// 1-based line of the offending character.
        line: usize,
        /// 1-based column of the offending character.
        col: usize,
        /// What the parser expected or found.
        message: String,
    },

    /// No value exists at the requested path and no default was supplied.
    #[error("no configuration value at path '{path}'")]
    MissingKey {
        /// The path that was looked up.
        path: String,
    },

    /// A value had a different kind than the one required.
    #[error("type mismatch at '{path}': expected {expected}, found {actual}")]
    TypeMismatch {
        /// The path of the offending value.
        path: String,
        /// The kind that was required.
        expected: String,
        /// The kind that was found.
        actual: String,
    },

    /// Substitutions refer to each other in a loop.
    #[error("substitution cycle: {}", chain.join(" -> "))]
    SubstitutionCycle {
        /// The reference chain, starting and ending with the same path.
        chain: Vec<String>,
    },

    /// A required substitution could not be resolved.
    #[error("could not resolve substitution ${{{path}}} referenced from '{location}'")]
    MissingSubstitution {
        /// The path named by the substitution.
        path: String,
        /// The path of the value containing the substitution.
        location: String,
    },

    /// An include directive could not be honoured.
    #[error("include of {location} failed: {reason}")]
    Include {
        /// The location named by the include directive.
        location: String,
        /// Why the include failed.
        reason: String,
    },

    /// Included documents include each other in a loop.
    #[error("include cycle: {}", chain.join(" -> "))]
    IncludeCycle {
        /// The chain of open include locations, ending with the repeated one.
        chain: Vec<String>,
    },

    /// A string could not be coerced into a duration or size.
    #[error("invalid value '{value}' at '{path}': {message}")]
    Format {
        /// The path of the offending value.
        path: String,
        /// The offending value as written.
        value: String,
        /// Why it could not be coerced.
        message: String,
    },

    /// A path expression could not be parsed.
    #[error("invalid path expression '{path}': {reason}")]
    InvalidPath {
        /// The path expression as given.
        path: String,
        /// Why it is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading a root document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A resolved tree could not be deserialized into the requested type.
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl Error {
    /// Check if the error reports an absent accessor path.
    ///
    /// # Examples
    ///
    /// ```
    /// use hocon::Error;
    ///
    /// let err = Error::MissingKey { path: "server.port".to_string() };
    /// assert!(err.is_missing_key());
    /// ```
    #[must_use]
    pub fn is_missing_key(&self) -> bool {
        matches!(self, Self::MissingKey { .. })
    }

    /// Check if the error reports a kind mismatch.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Check if the error is a substitution failure (cycle or unresolved reference).
    ///
    /// # Examples
    ///
    /// ```
    /// use hocon::Error;
    ///
    /// let err = Error::SubstitutionCycle {
    ///     chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
    /// };
    /// assert!(err.is_substitution_error());
    /// assert_eq!(err.to_string(), "substitution cycle: a -> b -> a");
    /// ```
    #[must_use]
    pub fn is_substitution_error(&self) -> bool {
        matches!(
            self,
            Self::SubstitutionCycle { .. } | Self::MissingSubstitution { .. }
        )
    }

    /// Check if the error is an include failure (load, parse or cycle).
    #[must_use]
    pub fn is_include_error(&self) -> bool {
        matches!(self, Self::Include { .. } | Self::IncludeCycle { .. })
    }

    pub(crate) fn type_mismatch(
        path: impl ToString,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
