//! Environment variable handling for substitution fallback.
//!
//! An [`Environment`] is a snapshot of variables. The resolver consults it
//! when a reference is not found in the document, and it can also be turned
//! into a configuration layer of its own.

use std::collections::HashMap;
use std::env;

use crate::value::{ConfigObject, ConfigValue};

/// A snapshot of environment variables.
///
/// # Examples
///
/// ```
/// use hocon::Environment;
///
/// let env = Environment::from_map([("APP_DB_HOST", "db.internal"), ("HOME", "/root")]);
/// assert_eq!(env.get("HOME"), Some("/root"));
///
/// let layer = env.prefixed_layer("APP_", "_");
/// let db = layer.get("db").and_then(|v| v.as_object()).unwrap();
/// assert_eq!(db.get("host").and_then(|v| v.as_str()), Some("db.internal"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Captures the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    #[must_use]
    pub fn capture() -> Self {
        let vars: HashMap<String, String> = env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        log::trace!("Captured {} environment variables", vars.len());
        Self { vars }
    }

    /// Builds an environment from explicit pairs.
    #[must_use]
    pub fn from_map<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// The value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The variables as a plain map, as used by the resolver.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        self.vars
    }

    /// Every variable as a top-level string key, sorted by name.
    #[must_use]
    pub fn as_layer(&self) -> ConfigObject {
        let mut names: Vec<&String> = self.vars.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| (name.clone(), ConfigValue::String(self.vars[name].clone())))
            .collect()
    }

    /// Variables starting with `prefix` as a nested layer.
    ///
    /// The prefix is stripped, the rest lowercased and split on `separator`
    /// into path segments: with prefix `APP_` and separator `_`,
    /// `APP_DB_HOST=x` becomes `db.host = x`. Variables sorting later win when
    /// two of them map to the same path.
    #[must_use]
    pub fn prefixed_layer(&self, prefix: &str, separator: &str) -> ConfigObject {
        let mut names: Vec<&String> = self
            .vars
            .keys()
            .filter(|name| name.starts_with(prefix) && name.len() > prefix.len())
            .collect();
        names.sort();

        let mut layer = ConfigObject::new();
        for name in names {
            let segments: Vec<String> = name[prefix.len()..]
                .to_lowercase()
                .split(separator)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect();
            if segments.is_empty() {
                continue;
            }
            Self::insert_nested(&mut layer, &segments, self.vars[name].clone());
        }
        layer
    }

    fn insert_nested(object: &mut ConfigObject, segments: &[String], value: String) {
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut current = object;
        for segment in parents {
            if !matches!(current.get(segment), Some(ConfigValue::Object(_))) {
                current.insert(segment.clone(), ConfigValue::Object(ConfigObject::new()));
            }
            current = match current.get_mut(segment) {
                Some(ConfigValue::Object(child)) => child,
                _ => return,
            };
        }
        current.insert(last.clone(), ConfigValue::String(value));
    }
}

impl From<HashMap<String, String>> for Environment {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}
