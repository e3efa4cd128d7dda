//! Include resolution.
//!
//! `include` directives captured by the parser are expanded here, before any
//! substitution is resolved, so that substitutions can see included keys and
//! included documents can reference keys of the including one.

mod expander;
mod loader;

pub use expander::IncludeResolver;
pub use loader::{FsLoader, MemoryLoader, ResourceLoader, DEFAULT_URL_TIMEOUT};

use crate::error::Result;
use crate::value::ConfigObject;

/// Expands all includes in `tree` using `loader`.
///
/// # Errors
///
/// See [`IncludeResolver::expand`].
pub fn expand(tree: ConfigObject, loader: &dyn ResourceLoader) -> Result<ConfigObject> {
    IncludeResolver::new(loader).expand(tree)
}
