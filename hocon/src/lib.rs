#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # hocon
//!
//! A parser and resolver for HOCON, a human-friendly superset of JSON used
//! for configuration files.
//!
//! Loading a document runs four stages: the [`parser`] turns text into a raw
//! tree, the [`include`] resolver splices in included documents, the
//! [`merge`] engine combines layers, and the [`resolve`] stage evaluates
//! `${...}` substitutions and value concatenations. The result is a
//! [`Config`] answering typed lookups by path.
//!
//! ## Core Types
//!
//! - [`Config`] and [`ConfigBuilder`]: Resolved configuration and its loader
//! - [`ConfigValue`] and [`ConfigObject`]: The value tree
//! - [`ConfigPath`]: Dotted path expressions
//! - [`Error`] and [`Result`]: Error handling types
//!
//! ## Examples
//!
//! ```
//! let config = hocon::parse_str(
//!     r#"
//!     app {
//!       name = demo
//!       tags = [web]
//!       tags += api
//!     }
//!     app.title = ${app.name}" service"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.get_string("app.title").unwrap(), "demo service");
//! assert_eq!(config.get_string_list("app.tags").unwrap(), ["web", "api"]);
//! ```

pub mod config;
pub mod error;
pub mod include;
pub mod merge;
pub mod parser;
pub mod path;
pub mod resolve;
pub mod value;

use std::path::Path;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigBuilder, Environment};
pub use error::{Error, Result};
pub use include::{FsLoader, IncludeResolver, MemoryLoader, ResourceLoader};
pub use merge::ConfigMerger;
pub use path::ConfigPath;
pub use resolve::{ResolveOptions, SubstitutionResolver, UnresolvedPolicy};
pub use value::{
    Concatenation, ConfigObject, ConfigValue, IncludeDirective, IncludeKind, Number, Part,
    SubstitutionRef, ValueType,
};

/// Parse and resolve a document with default settings.
///
/// Includes are loaded from the filesystem relative to the working
/// directory. Use [`ConfigBuilder`] for layers, loaders or environment
/// fallback.
///
/// # Errors
///
/// Returns a syntax, include or substitution error.
pub fn parse_str(text: &str) -> Result<Config> {
    ConfigBuilder::new().parse_str(text)
}

/// Parse and resolve the file at `path` with default settings.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as
/// [`parse_str`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    ConfigBuilder::new().parse_file(path)
}
