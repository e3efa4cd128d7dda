//! Substitution resolution.
//!
//! The resolver turns a raw tree (after merging and include expansion) into
//! a fully concrete one. Resolution is path-indexed and memoized: each path is
//! resolved to completion once, forward references are followed through an
//! explicit work stack rather than recursion, and a reference back to a path
//! that is still pending is reported as a cycle. The result does not depend
//! on the order keys were declared in.
//!
//! # Self-references
//!
//! A reference to the path it is assigned to (or to something below that
//! path) reads the value the path held before the current assignment:
//!
//! ```
//! use hocon::{ConfigValue, ResolveOptions, SubstitutionResolver};
//!
//! let raw = hocon::parser::parse("a = [1, 2]\na = ${a} [3]").unwrap();
//! let resolved = SubstitutionResolver::resolve(raw, &ResolveOptions::default()).unwrap();
//! assert_eq!(
//!     resolved.get("a"),
//!     Some(&ConfigValue::Array(vec![1.into(), 2.into(), 3.into()]))
//! );
//! ```

mod concat;
mod resolver;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

use std::collections::HashMap;

use crate::error::Result;
use crate::value::ConfigObject;

/// What to do with a required substitution that cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Fail with [`Error::MissingSubstitution`](crate::Error::MissingSubstitution).
    #[default]
    Error,
    /// Keep the reference's raw text, e.g. `${db.host}`, as a string value.
    KeepRawText,
}

/// Options for a resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Environment consulted, by the reference's last path segment, when a
    /// reference is not found in the tree. `None` disables the fallback.
    pub env: Option<HashMap<String, String>>,
    /// Handling of unresolvable required references.
    pub unresolved: UnresolvedPolicy,
}

impl ResolveOptions {
    /// Enables the environment fallback with `env`.
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Sets the policy for unresolvable required references.
    #[must_use]
    pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved = policy;
        self
    }
}

/// Resolves all substitutions and concatenations of a raw tree.
pub struct SubstitutionResolver;

impl SubstitutionResolver {
    /// Resolve `tree` into a fully concrete tree.
    ///
    /// A value that resolves to nothing (an optional reference to a missing
    /// path) falls back to the value it overrode; with no such value the key
    /// is removed. Absent array elements are dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::SubstitutionCycle`](crate::Error::SubstitutionCycle) if
    ///   references form a loop
    /// - [`Error::MissingSubstitution`](crate::Error::MissingSubstitution) if
    ///   a required reference cannot be resolved
    /// - [`Error::TypeMismatch`](crate::Error::TypeMismatch) if a
    ///   concatenation mixes objects, arrays and scalars
    /// - [`Error::Include`](crate::Error::Include) if the tree still holds an
    ///   unexpanded include directive
    pub fn resolve(tree: ConfigObject, options: &ResolveOptions) -> Result<ConfigObject> {
        resolver::Resolution::new(tree, options).run()
    }
}
