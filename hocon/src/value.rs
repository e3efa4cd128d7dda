//! The configuration value model.
//!
//! A [`ConfigValue`] is either a concrete JSON-like value or an
//! [`Unresolved`](ConfigValue::Unresolved) concatenation that still contains
//! substitutions or adjacent tokens. Raw trees produced by the parser may hold
//! unresolved values and pending include directives; resolved trees hold
//! neither.

mod convert;
mod number;

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::path::ConfigPath;

pub use number::Number;

/// The kind of a configuration value, used as a type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Explicit `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// An integer or floating point number.
    Number,
    /// A string.
    String,
    /// An ordered key/value mapping.
    Object,
    /// An ordered sequence.
    Array,
    /// A concatenation or substitution awaiting resolution.
    Unresolved,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "list",
            Self::Unresolved => "unresolved value",
        };
        f.write_str(name)
    }
}

/// A configuration value.
///
/// # Examples
///
/// ```
/// use hocon::{ConfigValue, ValueType};
///
/// let value = ConfigValue::from("hello");
/// assert_eq!(value.value_type(), ValueType::String);
/// assert_eq!(value.as_str(), Some("hello"));
/// assert!(value.is_resolved());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConfigValue {
    /// Explicit `null`, distinct from an absent key.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An object.
    Object(ConfigObject),
    /// An array.
    Array(Vec<ConfigValue>),
    /// Adjacent tokens and substitutions awaiting resolution.
    Unresolved(Concatenation),
}

impl ConfigValue {
    /// The kind of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Number(_) => ValueType::Number,
            Self::String(_) => ValueType::String,
            Self::Object(_) => ValueType::Object,
            Self::Array(_) => ValueType::Array,
            Self::Unresolved(_) => ValueType::Unresolved,
        }
    }

    /// Returns `true` for `null`, booleans, numbers and strings.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_)
        )
    }

    /// Returns `true` for explicit `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, if this is a numeric value.
    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The object, if this is an object value.
    #[must_use]
    pub fn as_object(&self) -> Option<&ConfigObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The elements, if this is an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Walks nested objects along `segments`.
    ///
    /// Returns `None` if a segment is missing or an intermediate value is not
    /// an object.
    #[must_use]
    pub fn descend(&self, segments: &[String]) -> Option<&ConfigValue> {
        segments.iter().try_fold(self, |node, key| match node {
            Self::Object(obj) => obj.get(key),
            _ => None,
        })
    }

    /// Returns `true` if neither this value nor anything nested in it is
    /// unresolved or carries a pending include.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Unresolved(_) => false,
            Self::Object(obj) => obj.is_resolved(),
            Self::Array(items) => items.iter().all(Self::is_resolved),
            _ => true,
        }
    }

    /// Renders a scalar the way it appears in a string concatenation.
    ///
    /// Returns `None` for objects, arrays and unresolved values.
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Null => Some("null".to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// An ordered mapping from keys to values.
///
/// Insertion order is preserved; replacing the value of an existing key keeps
/// its position. A raw object may also carry the include directives declared
/// inside it, which the include resolver expands into fallback content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigObject {
    entries: IndexMap<String, ConfigValue>,
    includes: Vec<IncludeDirective>,
}

impl ConfigObject {
    /// Creates an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigValue> {
        self.entries.get_mut(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a value, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) -> Option<ConfigValue> {
        self.entries.insert(key.into(), value)
    }

    /// Removes a key, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.entries.shift_remove(key)
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ConfigValue> {
        self.entries.iter()
    }

    /// Include directives declared directly in this object, in document order.
    #[must_use]
    pub fn includes(&self) -> &[IncludeDirective] {
        &self.includes
    }

    /// Records an include directive declared in this object.
    pub fn push_include(&mut self, directive: IncludeDirective) {
        self.includes.push(directive);
    }

    pub(crate) fn take_includes(&mut self) -> Vec<IncludeDirective> {
        std::mem::take(&mut self.includes)
    }

    pub(crate) fn extend_includes(&mut self, directives: Vec<IncludeDirective>) {
        self.includes.extend(directives);
    }

    /// Returns `true` if the object has no pending includes and all of its
    /// values are resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.includes.is_empty() && self.entries.values().all(ConfigValue::is_resolved)
    }
}

impl IntoIterator for ConfigObject {
    type Item = (String, ConfigValue);
    type IntoIter = indexmap::map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConfigObject {
    type Item = (&'a String, &'a ConfigValue);
    type IntoIter = indexmap::map::Iter<'a, String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigValue)> for ConfigObject {
    fn from_iter<T: IntoIterator<Item = (K, ConfigValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            includes: Vec::new(),
        }
    }
}

/// A sequence of adjacent value tokens awaiting resolution.
///
/// Once every part is concrete the parts are joined: scalars into one
/// string, objects by deep merge, arrays by concatenation. The value this
/// concatenation replaced during merging is kept in `previous` so that a
/// reference to its own path can see the inherited value.
#[derive(Debug, Clone, PartialEq)]
pub struct Concatenation {
    parts: Vec<Part>,
    previous: Option<Box<ConfigValue>>,
}

impl Concatenation {
    /// Creates a concatenation with no history.
    #[must_use]
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            previous: None,
        }
    }

    /// The parts in document order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The value this concatenation overrode, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&ConfigValue> {
        self.previous.as_deref()
    }

    /// Records `older` as the oldest known value of this path.
    ///
    /// History is a chain: if the current previous value is itself a
    /// concatenation, `older` is appended to its history instead. A concrete
    /// value ends the chain, since anything older can no longer be observed.
    pub(crate) fn push_oldest(&mut self, older: ConfigValue) {
        let mut slot = &mut self.previous;
        while matches!(slot.as_deref(), Some(ConfigValue::Unresolved(_))) {
            let Some(ConfigValue::Unresolved(inner)) = slot.as_deref_mut() else {
                return;
            };
            slot = &mut inner.previous;
        }
        if slot.is_none() {
            *slot = Some(Box::new(older));
        }
    }

    /// Splits the history chain into the parts of each level, newest first,
    /// and the concrete value the chain ends in.
    pub(crate) fn into_history(self) -> (Vec<Vec<Part>>, Option<ConfigValue>) {
        let mut levels = Vec::new();
        let mut bottom = None;
        let mut next = Some(self);
        while let Some(mut concat) = next.take() {
            levels.push(std::mem::take(&mut concat.parts));
            match concat.previous.take().map(|boxed| *boxed) {
                Some(ConfigValue::Unresolved(older)) => next = Some(older),
                other => bottom = other,
            }
        }
        (levels, bottom)
    }

    /// Rebuilds a chain split by [`into_history`](Self::into_history).
    ///
    /// With no levels this is just `bottom`, or null without one.
    pub(crate) fn from_history(levels: Vec<Vec<Part>>, bottom: Option<ConfigValue>) -> ConfigValue {
        let mut rebuilt = bottom;
        for parts in levels.into_iter().rev() {
            rebuilt = Some(ConfigValue::Unresolved(Self {
                parts,
                previous: rebuilt.map(Box::new),
            }));
        }
        rebuilt.unwrap_or_default()
    }
}

// Long `+=` runs build deep chains; unlink them a level at a time.
impl Drop for Concatenation {
    fn drop(&mut self) {
        let mut older = self.previous.take();
        while let Some(boxed) = older {
            older = match *boxed {
                ConfigValue::Unresolved(mut concat) => concat.previous.take(),
                _ => None,
            };
        }
    }
}

impl fmt::Display for Concatenation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Literal(ConfigValue::String(s)) => write!(f, "{s:?}")?,
                Part::Literal(value) => write!(f, "{}", serde_json::to_string(value).unwrap_or_default())?,
                Part::Whitespace(ws) => f.write_str(ws)?,
                Part::Substitution(sub) => f.write_str(&sub.raw_text)?,
            }
        }
        Ok(())
    }
}

/// One token of a [`Concatenation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// A literal value, possibly itself containing unresolved values.
    Literal(ConfigValue),
    /// Whitespace between two tokens; kept only when the result is a string.
    Whitespace(String),
    /// A `${path}` or `${?path}` reference.
    Substitution(SubstitutionRef),
}

/// A `${path}` (required) or `${?path}` (optional) reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRef {
    /// The referenced path, always resolved from the document root.
    pub path: ConfigPath,
    /// Whether an unresolvable reference yields absence instead of an error.
    pub optional: bool,
    /// The reference as written, e.g. `${?db.host}`.
    pub raw_text: String,
    /// For a reference from a document included below the root, the path as
    /// written there. It is looked up from the root when `path` is absent.
    pub root_path: Option<ConfigPath>,
}

impl SubstitutionRef {
    /// Creates a reference, deriving the raw text from the path.
    #[must_use]
    pub fn new(path: ConfigPath, optional: bool) -> Self {
        let raw_text = format!("${{{}{path}}}", if optional { "?" } else { "" });
        Self {
            path,
            optional,
            raw_text,
            root_path: None,
        }
    }

    /// Re-roots the reference of a document included at `prefix`.
    ///
    /// ```
    /// use hocon::{ConfigPath, SubstitutionRef};
    ///
    /// let sub = SubstitutionRef::new(ConfigPath::parse("host").unwrap(), false);
    /// let rebased = sub.rebased(&ConfigPath::parse("db").unwrap());
    /// assert_eq!(rebased.path.to_string(), "db.host");
    /// assert_eq!(rebased.raw_text, "${host}");
    /// ```
    #[must_use]
    pub fn rebased(mut self, prefix: &ConfigPath) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let written = std::mem::replace(&mut self.path, ConfigPath::root());
        self.path = prefix.join(&written);
        self.root_path = self.root_path.or(Some(written));
        self
    }
}

/// Where an include directive loads its content from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// A filesystem path, relative paths resolved against the including file.
    File,
    /// A URL.
    Url,
    /// A resource looked up on the loader's search roots.
    Classpath,
}

impl fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Url => write!(f, "url"),
            Self::Classpath => write!(f, "classpath"),
        }
    }
}

/// An `include` statement captured by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    /// Where to load from.
    pub kind: IncludeKind,
    /// Whether a failed load is fatal.
    pub required: bool,
    /// The location exactly as written.
    pub location: String,
    /// Directory of the document containing the directive, if it came from a file.
    pub base_dir: Option<PathBuf>,
}

impl IncludeDirective {
    /// The location handed to the loader: relative file paths are joined onto
    /// the including document's directory.
    #[must_use]
    pub fn effective_location(&self) -> String {
        match (self.kind, &self.base_dir) {
            (IncludeKind::File, Some(dir)) if !std::path::Path::new(&self.location).is_absolute() => {
                dir.join(&self.location).to_string_lossy().into_owned()
            }
            _ => self.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(entries: Vec<(&str, ConfigValue)>) -> ConfigObject {
        entries.into_iter().collect()
    }

    #[test]
    fn test_value_type_discriminators() {
        assert_eq!(ConfigValue::Null.value_type(), ValueType::Null);
        assert_eq!(ConfigValue::Bool(true).value_type(), ValueType::Bool);
        assert_eq!(ConfigValue::from(1).value_type(), ValueType::Number);
        assert_eq!(ConfigValue::Array(vec![]).value_type(), ValueType::Array);
        assert_eq!(ValueType::Array.to_string(), "list");
    }

    #[test]
    fn test_object_preserves_insertion_order() {
        let mut object = obj(vec![("b", ConfigValue::from(1)), ("a", ConfigValue::from(2))]);
        object.insert("c", ConfigValue::from(3));
        object.insert("b", ConfigValue::from(4));
        assert_eq!(object.keys().collect::<Vec<_>>(), ["b", "a", "c"]);

        object.remove("b");
        assert_eq!(object.keys().collect::<Vec<_>>(), ["a", "c"]);
    }

    #[test]
    fn test_descend() {
        let inner = obj(vec![("port", ConfigValue::from(8080))]);
        let root = ConfigValue::Object(obj(vec![("server", ConfigValue::Object(inner))]));
        let path = ["server".to_string(), "port".to_string()];
        assert_eq!(root.descend(&path), Some(&ConfigValue::from(8080)));
        assert_eq!(root.descend(&["missing".to_string()]), None);
        assert_eq!(root.descend(&[]), Some(&root));
    }

    #[test]
    fn test_is_resolved_detects_unresolved_and_includes() {
        let sub = SubstitutionRef::new(ConfigPath::parse("a").unwrap(), false);
        let unresolved = ConfigValue::Unresolved(Concatenation::new(vec![Part::Substitution(sub)]));
        let nested = ConfigValue::Array(vec![unresolved]);
        assert!(!nested.is_resolved());

        let mut with_include = ConfigObject::new();
        with_include.push_include(IncludeDirective {
            kind: IncludeKind::File,
            required: false,
            location: "x.conf".to_string(),
            base_dir: None,
        });
        assert!(!with_include.is_resolved());
    }

    #[test]
    fn test_substitution_raw_text() {
        let path = ConfigPath::parse("db.host").unwrap();
        assert_eq!(SubstitutionRef::new(path.clone(), true).raw_text, "${?db.host}");
        assert_eq!(SubstitutionRef::new(path, false).raw_text, "${db.host}");
    }

    #[test]
    fn test_push_oldest_builds_chain() {
        let self_ref = || {
            Part::Substitution(SubstitutionRef::new(ConfigPath::parse("a").unwrap(), false))
        };
        let mut middle = Concatenation::new(vec![self_ref()]);
        middle.push_oldest(ConfigValue::from(1));
        let mut newest = Concatenation::new(vec![self_ref()]);
        newest.push_oldest(ConfigValue::Unresolved(middle));
        newest.push_oldest(ConfigValue::from(0));

        let Some(ConfigValue::Unresolved(previous)) = newest.previous() else {
            panic!("expected unresolved history");
        };
        assert_eq!(previous.previous(), Some(&ConfigValue::from(1)));
    }

    #[test]
    fn test_history_splits_and_rebuilds() {
        let append = |n: i64| {
            vec![
                Part::Substitution(SubstitutionRef::new(ConfigPath::parse("xs").unwrap(), true)),
                Part::Literal(ConfigValue::Array(vec![n.into()])),
            ]
        };
        let mut newest = Concatenation::new(append(2));
        newest.push_oldest(ConfigValue::Unresolved(Concatenation::new(append(1))));
        newest.push_oldest(ConfigValue::Array(Vec::new()));
        let original = newest.clone();

        let (levels, bottom) = newest.into_history();
        assert_eq!(levels, [append(2), append(1)]);
        assert_eq!(bottom, Some(ConfigValue::Array(Vec::new())));
        assert_eq!(
            Concatenation::from_history(levels, bottom),
            ConfigValue::Unresolved(original)
        );
    }

    #[test]
    fn test_deep_history_chain() {
        let self_ref = || {
            Part::Substitution(SubstitutionRef::new(ConfigPath::parse("xs").unwrap(), true))
        };
        let mut newest = Concatenation::new(vec![self_ref()]);
        for _ in 0..100_000 {
            let mut level = Concatenation::new(vec![self_ref()]);
            level.push_oldest(ConfigValue::Unresolved(newest));
            newest = level;
        }
        let (levels, bottom) = newest.into_history();
        assert_eq!(levels.len(), 100_001);
        assert!(bottom.is_none());

        let rebuilt = Concatenation::from_history(levels, None);
        assert!(matches!(rebuilt, ConfigValue::Unresolved(_)));
    }

    #[test]
    fn test_effective_location() {
        let directive = IncludeDirective {
            kind: IncludeKind::File,
            required: true,
            location: "child.conf".to_string(),
            base_dir: Some(PathBuf::from("/etc/app")),
        };
        let expected = PathBuf::from("/etc/app").join("child.conf");
        assert_eq!(directive.effective_location(), expected.to_string_lossy());

        let classpath = IncludeDirective {
            kind: IncludeKind::Classpath,
            ..directive
        };
        assert_eq!(classpath.effective_location(), "child.conf");
    }
}
