//! Parsing of configuration text into raw trees.
//!
//! The parser accepts JSON as well as the relaxed syntax: comments, unquoted
//! strings, `=` separators, newline separators, dotted keys, `+=`, triple
//! quoted strings, `${path}` substitutions and `include` directives. The
//! result is a raw [`ConfigObject`] in which substitutions and adjacent tokens
//! are kept as [`Unresolved`](crate::ConfigValue::Unresolved) values and
//! includes are recorded on the object that declared them.

mod cursor;
mod grammar;

use std::path::Path;

use crate::error::Result;
use crate::value::ConfigObject;

pub use grammar::MAX_DEPTH;

/// Parses a document with no base directory for relative includes.
///
/// # Errors
///
/// Returns [`Error::Syntax`](crate::Error::Syntax) with the line and column
/// of the first malformed token.
pub fn parse(text: &str) -> Result<ConfigObject> {
    parse_with_base_dir(text, None)
}

/// Parses a document whose relative `file` includes resolve against `base_dir`.
///
/// # Errors
///
/// Returns [`Error::Syntax`](crate::Error::Syntax) with the line and column
/// of the first malformed token.
pub fn parse_with_base_dir(text: &str, base_dir: Option<&Path>) -> Result<ConfigObject> {
    log::trace!("Parsing {} bytes (base dir: {:?})", text.len(), base_dir);
    let root = grammar::Parser::new(text, base_dir).parse_document()?;
    log::debug!(
        "Parsed document with {} top-level keys and {} includes",
        root.len(),
        root.includes().len()
    );
    Ok(root)
}
