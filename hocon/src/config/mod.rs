//! The typed accessor facade over resolved trees.
//!
//! A [`Config`] wraps a fully resolved [`ConfigObject`] and answers typed
//! lookups by path expression. Lookups never mutate the tree: coercions such
//! as reading `"8080"` as an integer or `"500 ms"` as a duration are computed
//! afresh on every call, and a failed lookup leaves the tree usable.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! let config = hocon::parse_str(
//!     r#"
//!     server {
//!       host = localhost
//!       port = 8080
//!       timeout = 2 seconds
//!     }
//!     url = "http://"${server.host}":"${server.port}
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.get_string("url").unwrap(), "http://localhost:8080");
//! assert_eq!(config.get_int("server.port").unwrap(), 8080);
//! assert_eq!(config.get_duration("server.timeout").unwrap(), Duration::from_secs(2));
//! assert_eq!(config.get_int_or("server.workers", 4).unwrap(), 4);
//! ```

pub mod builder;
pub mod environment;
mod units;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::merge::ConfigMerger;
use crate::path::ConfigPath;
use crate::resolve::{ResolveOptions, SubstitutionResolver};
use crate::value::{ConfigObject, ConfigValue, Number};

pub use builder::ConfigBuilder;
pub use environment::Environment;

/// A resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    root: ConfigObject,
}

impl Config {
    pub(crate) fn from_resolved(root: ConfigObject) -> Self {
        Self { root }
    }

    /// Resolves a programmatically built tree into a configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use hocon::{Config, ConfigValue};
    /// use serde_json::json;
    ///
    /// let value = ConfigValue::from(json!({"name": "svc", "port": 8080}));
    /// let root = value.as_object().cloned().unwrap();
    /// let config = Config::from_object(root).unwrap();
    /// assert_eq!(config.get_string("name").unwrap(), "svc");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns any error [`SubstitutionResolver::resolve`] reports.
    pub fn from_object(root: ConfigObject) -> Result<Self> {
        SubstitutionResolver::resolve(root, &ResolveOptions::default()).map(Self::from_resolved)
    }

    /// The resolved tree.
    #[must_use]
    pub fn root(&self) -> &ConfigObject {
        &self.root
    }

    /// Top-level keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys()
    }

    /// Top-level entries in order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ConfigValue> {
        self.root.iter()
    }

    /// Returns `true` if `path` is set, including to `null`.
    ///
    /// An invalid path expression is reported as not set.
    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        matches!(self.get_opt(path), Ok(Some(_)))
    }

    /// The value at `path`, or `None` if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if `path` is not a valid path expression.
    pub fn get_opt(&self, path: &str) -> Result<Option<&ConfigValue>> {
        let parsed = ConfigPath::parse(path)?;
        let Some((first, rest)) = parsed.segments().split_first() else {
            return Ok(None);
        };
        Ok(self.root.get(first).and_then(|value| value.descend(rest)))
    }

    /// The value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if `path` is absent and
    /// [`Error::InvalidPath`] if it is not a valid path expression.
    pub fn get(&self, path: &str) -> Result<&ConfigValue> {
        self.get_opt(path)?.ok_or_else(|| Error::MissingKey {
            path: path.to_string(),
        })
    }

    /// The string at `path`; numbers and booleans are rendered as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// for `null`, objects and lists.
    pub fn get_string(&self, path: &str) -> Result<String> {
        Self::coerce_string(path, self.get(path)?)
    }

    /// Like [`get_string`](Self::get_string), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value is present but not a string.
    pub fn get_string_or(&self, path: &str, default: &str) -> Result<String> {
        match self.get_opt(path)? {
            Some(value) => Self::coerce_string(path, value),
            None => Ok(default.to_string()),
        }
    }

    /// The integer at `path`; numeric strings and integral floats are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not an integer.
    pub fn get_int(&self, path: &str) -> Result<i64> {
        Self::coerce_int(path, self.get(path)?)
    }

    /// Like [`get_int`](Self::get_int), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value is present but not an integer.
    pub fn get_int_or(&self, path: &str, default: i64) -> Result<i64> {
        match self.get_opt(path)? {
            Some(value) => Self::coerce_int(path, value),
            None => Ok(default),
        }
    }

    /// The number at `path` as a float; numeric strings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not numeric.
    pub fn get_double(&self, path: &str) -> Result<f64> {
        Self::coerce_number(path, self.get(path)?).map(Number::as_f64)
    }

    /// Like [`get_double`](Self::get_double), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value is present but not numeric.
    pub fn get_double_or(&self, path: &str, default: f64) -> Result<f64> {
        match self.get_opt(path)? {
            Some(value) => Self::coerce_number(path, value).map(Number::as_f64),
            None => Ok(default),
        }
    }

    /// The boolean at `path`; the strings `true/yes/on` and `false/no/off`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not a boolean.
    pub fn get_boolean(&self, path: &str) -> Result<bool> {
        Self::coerce_bool(path, self.get(path)?)
    }

    /// Like [`get_boolean`](Self::get_boolean), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value is present but not a boolean.
    pub fn get_boolean_or(&self, path: &str, default: bool) -> Result<bool> {
        match self.get_opt(path)? {
            Some(value) => Self::coerce_bool(path, value),
            None => Ok(default),
        }
    }

    /// The list at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not a list.
    pub fn get_list(&self, path: &str) -> Result<&[ConfigValue]> {
        Self::expect_list(path, self.get(path)?)
    }

    /// Like [`get_list`](Self::get_list), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value is present but not a list.
    pub fn get_list_or<'a>(&'a self, path: &str, default: &'a [ConfigValue]) -> Result<&'a [ConfigValue]> {
        match self.get_opt(path)? {
            Some(value) => Self::expect_list(path, value),
            None => Ok(default),
        }
    }

    /// The list at `path` with every element read as a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not a list or an element is not a scalar.
    pub fn get_string_list(&self, path: &str) -> Result<Vec<String>> {
        self.get_list(path)?
            .iter()
            .enumerate()
            .map(|(idx, item)| Self::coerce_string(&format!("{path}[{idx}]"), item))
            .collect()
    }

    /// The object at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not an object.
    pub fn get_object(&self, path: &str) -> Result<&ConfigObject> {
        Self::expect_object(path, self.get(path)?)
    }

    /// Like [`get_object`](Self::get_object), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value is present but not an object.
    pub fn get_object_or<'a>(&'a self, path: &str, default: &'a ConfigObject) -> Result<&'a ConfigObject> {
        match self.get_opt(path)? {
            Some(value) => Self::expect_object(path, value),
            None => Ok(default),
        }
    }

    /// The object at `path` as a configuration of its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent and [`Error::TypeMismatch`]
    /// if the value is not an object.
    pub fn get_config(&self, path: &str) -> Result<Self> {
        self.get_object(path).map(|object| Self::from_resolved(object.clone()))
    }

    /// The duration at `path` in whole milliseconds.
    ///
    /// Strings such as `500 ms` or `2 seconds` are converted; a bare number
    /// is taken as milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent, [`Error::Format`] for an
    /// unknown unit or malformed number, and [`Error::TypeMismatch`] if the
    /// value is neither a number nor a string.
    pub fn get_milliseconds(&self, path: &str) -> Result<i64> {
        let duration = self.get_duration(path)?;
        i64::try_from(duration.as_millis()).map_err(|_| Error::Format {
            path: path.to_string(),
            value: format!("{duration:?}"),
            message: "duration does not fit in i64 milliseconds".to_string(),
        })
    }

    /// Like [`get_milliseconds`](Self::get_milliseconds), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// See [`get_milliseconds`](Self::get_milliseconds).
    pub fn get_milliseconds_or(&self, path: &str, default: i64) -> Result<i64> {
        if self.get_opt(path)?.is_some() {
            self.get_milliseconds(path)
        } else {
            Ok(default)
        }
    }

    /// The duration at `path`; a bare number is taken as milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent, [`Error::Format`] for an
    /// unknown unit or malformed number, and [`Error::TypeMismatch`] if the
    /// value is neither a number nor a string.
    pub fn get_duration(&self, path: &str) -> Result<Duration> {
        Self::coerce_duration(path, self.get(path)?)
    }

    /// Like [`get_duration`](Self::get_duration), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// See [`get_duration`](Self::get_duration).
    pub fn get_duration_or(&self, path: &str, default: Duration) -> Result<Duration> {
        match self.get_opt(path)? {
            Some(value) => Self::coerce_duration(path, value),
            None => Ok(default),
        }
    }

    /// The size at `path` in bytes, e.g. `512 KiB` or `10MB`; a bare number
    /// is taken as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if absent, [`Error::Format`] for an
    /// unknown unit or malformed number, and [`Error::TypeMismatch`] if the
    /// value is neither a number nor a string.
    pub fn get_bytes(&self, path: &str) -> Result<u64> {
        Self::coerce_bytes(path, self.get(path)?)
    }

    /// Like [`get_bytes`](Self::get_bytes), returning `default` if absent.
    ///
    /// # Errors
    ///
    /// See [`get_bytes`](Self::get_bytes).
    pub fn get_bytes_or(&self, path: &str, default: u64) -> Result<u64> {
        match self.get_opt(path)? {
            Some(value) => Self::coerce_bytes(path, value),
            None => Ok(default),
        }
    }

    /// Combines two configurations, `self` winning on conflicts.
    ///
    /// Objects present in both merge key by key; any other conflict keeps
    /// the value from `self`.
    #[must_use]
    pub fn with_fallback(&self, fallback: &Self) -> Self {
        Self::from_resolved(ConfigMerger::merge_objects(
            fallback.root.clone(),
            self.root.clone(),
        ))
    }

    /// Deserializes the tree into `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Server {
    ///     host: String,
    ///     port: u16,
    /// }
    ///
    /// let config = hocon::parse_str("host = example.org\nport = 443").unwrap();
    /// let server: Server = config.try_deserialize().unwrap();
    /// assert_eq!(server.host, "example.org");
    /// assert_eq!(server.port, 443);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialize`] if the tree does not match `T`.
    pub fn try_deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(&self.root)?;
        Ok(serde_json::from_value(value)?)
    }

    fn coerce_string(path: &str, value: &ConfigValue) -> Result<String> {
        match value {
            ConfigValue::String(s) => Ok(s.clone()),
            ConfigValue::Bool(_) | ConfigValue::Number(_) => {
                value.scalar_text().ok_or_else(|| mismatch(path, "string", value))
            }
            _ => Err(mismatch(path, "string", value)),
        }
    }

    fn coerce_number(path: &str, value: &ConfigValue) -> Result<Number> {
        match value {
            ConfigValue::Number(n) => Ok(*n),
            ConfigValue::String(s) => {
                Number::parse(s.trim()).ok_or_else(|| mismatch(path, "number", value))
            }
            _ => Err(mismatch(path, "number", value)),
        }
    }

    fn coerce_int(path: &str, value: &ConfigValue) -> Result<i64> {
        Self::coerce_number(path, value)
            .ok()
            .and_then(Number::as_i64)
            .ok_or_else(|| mismatch(path, "integer", value))
    }

    fn coerce_bool(path: &str, value: &ConfigValue) -> Result<bool> {
        match value {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(mismatch(path, "boolean", value)),
            },
            _ => Err(mismatch(path, "boolean", value)),
        }
    }

    fn expect_list<'a>(path: &str, value: &'a ConfigValue) -> Result<&'a [ConfigValue]> {
        value.as_array().ok_or_else(|| mismatch(path, "list", value))
    }

    fn expect_object<'a>(path: &str, value: &'a ConfigValue) -> Result<&'a ConfigObject> {
        value.as_object().ok_or_else(|| mismatch(path, "object", value))
    }

    fn coerce_duration(path: &str, value: &ConfigValue) -> Result<Duration> {
        let converted = match value {
            ConfigValue::Number(n) => units::duration_from_number(*n, units::MILLISECONDS),
            ConfigValue::String(s) => units::parse_duration(s, units::MILLISECONDS),
            _ => return Err(mismatch(path, "duration", value)),
        };
        converted.map_err(|message| format_error(path, value, message))
    }

    fn coerce_bytes(path: &str, value: &ConfigValue) -> Result<u64> {
        let converted = match value {
            ConfigValue::Number(n) => units::bytes_from_number(*n),
            ConfigValue::String(s) => units::parse_bytes(s),
            _ => return Err(mismatch(path, "size in bytes", value)),
        };
        converted.map_err(|message| format_error(path, value, message))
    }
}

fn mismatch(path: &str, expected: &str, value: &ConfigValue) -> Error {
    Error::type_mismatch(path, expected, value.value_type())
}

fn format_error(path: &str, value: &ConfigValue, message: String) -> Error {
    Error::Format {
        path: path.to_string(),
        value: value.scalar_text().unwrap_or_default(),
        message,
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl From<Config> for ConfigObject {
    fn from(config: Config) -> Self {
        config.root
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = (&'a String, &'a ConfigValue);
    type IntoIter = indexmap::map::Iter<'a, String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.root.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str) -> Config {
        crate::parse_str(text).unwrap()
    }

    #[test]
    fn test_get_and_missing_key() {
        let config = config("a { b = 1 }");
        assert_eq!(config.get("a.b").unwrap(), &ConfigValue::from(1));
        let err = config.get("a.c").unwrap_err();
        assert!(err.is_missing_key());
        assert!(config.get("a.b.c").unwrap_err().is_missing_key());
        assert!(matches!(config.get("a..b"), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_has_path_includes_null() {
        let config = config("a = null\nb = 1");
        assert!(config.has_path("a"));
        assert!(config.has_path("b"));
        assert!(!config.has_path("c"));
        assert!(!config.has_path(""));
    }

    #[test]
    fn test_quoted_path_segments() {
        let config = config("\"a.b\" { c = 1 }");
        assert_eq!(config.get_int("\"a.b\".c").unwrap(), 1);
    }

    #[test]
    fn test_string_coercion() {
        let config = config("s = text\ni = 42\nf = 1.0\nb = true\nn = null\no { }");
        assert_eq!(config.get_string("s").unwrap(), "text");
        assert_eq!(config.get_string("i").unwrap(), "42");
        assert_eq!(config.get_string("f").unwrap(), "1.0");
        assert_eq!(config.get_string("b").unwrap(), "true");
        assert!(config.get_string("n").unwrap_err().is_type_mismatch());
        assert!(config.get_string("o").unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_int_coercion() {
        let config = config("i = 42\ns = \"17\"\nf = 2.0\ng = 2.5\no { x = 1 }");
        assert_eq!(config.get_int("i").unwrap(), 42);
        assert_eq!(config.get_int("s").unwrap(), 17);
        assert_eq!(config.get_int("f").unwrap(), 2);
        assert!(config.get_int("g").unwrap_err().is_type_mismatch());

        let Error::TypeMismatch { path, expected, actual } = config.get_int("o").unwrap_err() else {
            panic!("expected type mismatch");
        };
        assert_eq!((path.as_str(), expected.as_str(), actual.as_str()), ("o", "integer", "object"));
    }

    #[test]
    fn test_double_and_boolean() {
        let config = config("d = 2.5\ns = \"0.5\"\nyes = yes\noff = OFF\nmaybe = maybe");
        assert!((config.get_double("d").unwrap() - 2.5).abs() < f64::EPSILON);
        assert!((config.get_double("s").unwrap() - 0.5).abs() < f64::EPSILON);
        assert!(config.get_boolean("yes").unwrap());
        assert!(!config.get_boolean("off").unwrap());
        assert!(config.get_boolean("maybe").unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_defaults_only_when_absent() {
        let config = config("present = hello\nnothing = null");
        assert_eq!(config.get_string_or("present", "x").unwrap(), "hello");
        assert_eq!(config.get_string_or("absent", "x").unwrap(), "x");
        assert_eq!(config.get_int_or("absent", 7).unwrap(), 7);
        assert!(config.get_int_or("present", 7).unwrap_err().is_type_mismatch());
        assert!(config.get_boolean_or("absent", true).unwrap());
        assert!(config.get_double_or("nothing", 1.0).unwrap_err().is_type_mismatch());
        assert!(config.get_list_or("absent", &[]).unwrap().is_empty());
        let empty = ConfigObject::new();
        assert!(config.get_object_or("absent", &empty).unwrap().is_empty());
    }

    #[test]
    fn test_lists_and_objects() {
        let config = config("xs = [a, 1, true]\nobj { k = v }");
        assert_eq!(config.get_list("xs").unwrap().len(), 3);
        assert_eq!(config.get_string_list("xs").unwrap(), ["a", "1", "true"]);
        assert!(config.get_list("obj").unwrap_err().is_type_mismatch());
        assert_eq!(config.get_object("obj").unwrap().len(), 1);
        assert_eq!(config.get_config("obj").unwrap().get_string("k").unwrap(), "v");
    }

    #[test]
    fn test_durations() {
        let config = config("a = 500 ms\nb = 2 seconds\nc = 250\nd = 5 fortnights\ne = [1]");
        assert_eq!(config.get_milliseconds("a").unwrap(), 500);
        assert_eq!(config.get_milliseconds("b").unwrap(), 2000);
        assert_eq!(config.get_milliseconds("c").unwrap(), 250);
        assert_eq!(config.get_duration("b").unwrap(), Duration::from_secs(2));
        assert_eq!(config.get_milliseconds_or("missing", 9).unwrap(), 9);
        assert_eq!(
            config.get_duration_or("missing", Duration::from_secs(1)).unwrap(),
            Duration::from_secs(1)
        );

        let err = config.get_milliseconds("d").unwrap_err();
        let Error::Format { path, value, message } = err else {
            panic!("expected format error");
        };
        assert_eq!(path, "d");
        assert_eq!(value, "5 fortnights");
        assert!(message.contains("fortnights"));
        assert!(config.get_duration("e").unwrap_err().is_type_mismatch());

        // The stored value is untouched.
        assert_eq!(config.get_string("a").unwrap(), "500 ms");
    }

    #[test]
    fn test_bytes() {
        let config = config("a = 512 KiB\nb = 10MB\nc = 64");
        assert_eq!(config.get_bytes("a").unwrap(), 524_288);
        assert_eq!(config.get_bytes("b").unwrap(), 10_000_000);
        assert_eq!(config.get_bytes("c").unwrap(), 64);
        assert_eq!(config.get_bytes_or("d", 1).unwrap(), 1);
    }

    #[test]
    fn test_with_fallback() {
        let primary = config("a { x = 1 }\nb = primary");
        let fallback = config("a { y = 2 }\nb = fallback\nc = 3");
        let merged = primary.with_fallback(&fallback);
        assert_eq!(merged.get_int("a.x").unwrap(), 1);
        assert_eq!(merged.get_int("a.y").unwrap(), 2);
        assert_eq!(merged.get_string("b").unwrap(), "primary");
        assert_eq!(merged.get_int("c").unwrap(), 3);
    }

    #[test]
    fn test_iteration_and_serialization_keep_order() {
        let config = config("z = 1\na = [x]\nm { k = null }");
        assert_eq!(config.keys().collect::<Vec<_>>(), ["z", "a", "m"]);
        assert_eq!((&config).into_iter().count(), 3);
        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"{"z":1,"a":["x"],"m":{"k":null}}"#
        );
    }

    #[test]
    fn test_accessor_errors_do_not_invalidate() {
        let config = config("a = 1");
        assert!(config.get("missing").is_err());
        assert!(config.get_boolean("a").is_err());
        assert_eq!(config.get_int("a").unwrap(), 1);
    }
}
