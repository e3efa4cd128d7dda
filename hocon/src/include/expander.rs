//! Expansion of include directives into fallback layers.

use crate::error::{Error, Result};
use crate::merge::ConfigMerger;
use crate::parser;
use crate::path::ConfigPath;
use crate::value::{Concatenation, ConfigObject, ConfigValue, IncludeDirective, Part};

use super::loader::ResourceLoader;

/// Expands the include directives of a raw tree.
///
/// Included content becomes a fallback for the object that declared the
/// include: every key the object sets itself wins, whether it appears before
/// or after the directive. Of two includes in the same object the later one
/// wins. The includes of an object are loaded in document order before those
/// of its nested objects.
///
/// # Examples
///
/// ```
/// use hocon::{IncludeKind, IncludeResolver, MemoryLoader, ConfigValue};
///
/// let loader = MemoryLoader::new().with_resource(IncludeKind::File, "base.conf", "a = 1\nb = 1");
/// let raw = hocon::parser::parse("include \"base.conf\"\nb = 2").unwrap();
///
/// let expanded = IncludeResolver::new(&loader).expand(raw).unwrap();
/// assert_eq!(expanded.get("a"), Some(&ConfigValue::from(1)));
/// assert_eq!(expanded.get("b"), Some(&ConfigValue::from(2)));
/// ```
pub struct IncludeResolver<'a> {
    loader: &'a dyn ResourceLoader,
    open: Vec<String>,
}

impl<'a> IncludeResolver<'a> {
    /// Creates a resolver loading through `loader`.
    #[must_use]
    pub fn new(loader: &'a dyn ResourceLoader) -> Self {
        Self {
            loader,
            open: Vec::new(),
        }
    }

    /// Expand every include in `tree`, recursively.
    ///
    /// A document included inside a nested object is re-rooted there: its
    /// `${...}` references are prefixed with the object's path, falling back
    /// to the path as written when the prefixed one is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Include`] if a required include cannot be loaded or
    /// any included document fails to parse, and [`Error::IncludeCycle`] if
    /// a document includes itself directly or indirectly.
    pub fn expand(&mut self, tree: ConfigObject) -> Result<ConfigObject> {
        self.expand_object(tree, &ConfigPath::root())
    }

    fn expand_object(&mut self, mut object: ConfigObject, at: &ConfigPath) -> Result<ConfigObject> {
        let directives = object.take_includes();

        let mut fallback = ConfigObject::new();
        for directive in &directives {
            if let Some(included) = self.load(directive, at)? {
                fallback = ConfigMerger::merge_objects(fallback, included);
            }
        }

        let mut expanded = ConfigObject::new();
        for (key, value) in object {
            let child = at.child(&key);
            expanded.insert(key, self.expand_value(value, &child)?);
        }
        if directives.is_empty() {
            return Ok(expanded);
        }
        Ok(ConfigMerger::merge_objects(fallback, expanded))
    }

    fn expand_value(&mut self, value: ConfigValue, at: &ConfigPath) -> Result<ConfigValue> {
        Ok(match value {
            ConfigValue::Object(object) => ConfigValue::Object(self.expand_object(object, at)?),
            ConfigValue::Array(items) => ConfigValue::Array(
                items
                    .into_iter()
                    .map(|item| self.expand_value(item, at))
                    .collect::<Result<_>>()?,
            ),
            ConfigValue::Unresolved(concat) => {
                let (levels, bottom) = concat.into_history();
                let mut expanded = Vec::with_capacity(levels.len());
                for parts in levels {
                    expanded.push(
                        parts
                            .into_iter()
                            .map(|part| match part {
                                Part::Literal(value) => self.expand_value(value, at).map(Part::Literal),
                                other => Ok(other),
                            })
                            .collect::<Result<_>>()?,
                    );
                }
                let bottom = bottom.map(|older| self.expand_value(older, at)).transpose()?;
                Concatenation::from_history(expanded, bottom)
            }
            scalar => scalar,
        })
    }

    /// Loads, parses and expands one directive declared in the object at
    /// `at`; `None` if a non-required include could not be loaded.
    fn load(&mut self, directive: &IncludeDirective, at: &ConfigPath) -> Result<Option<ConfigObject>> {
        let location = directive.effective_location();
        let key = format!("{}({location})", directive.kind);

        if let Some(pos) = self.open.iter().position(|open| *open == key) {
            let mut chain = self.open[pos..].to_vec();
            chain.push(key);
            return Err(Error::IncludeCycle { chain });
        }

        let text = match self.loader.load(directive.kind, &location) {
            Ok(text) => text,
            Err(err) if !directive.required => {
                log::warn!("Skipping optional include {key}: {err}");
                return Ok(None);
            }
            Err(err) => {
                return Err(Error::Include {
                    location: key,
                    reason: err.to_string(),
                })
            }
        };
        log::debug!("Loaded include {key} ({} bytes)", text.len());

        let base_dir = self.loader.base_dir(directive.kind, &location);
        let mut parsed =
            parser::parse_with_base_dir(&text, base_dir.as_deref()).map_err(|err| Error::Include {
                location: key.clone(),
                reason: err.to_string(),
            })?;
        if !at.is_empty() {
            log::trace!("Re-rooting {key} at {at}");
            parsed = rebase_object(parsed, at);
        }

        self.open.push(key);
        let expanded = self.expand_object(parsed, at);
        self.open.pop();
        expanded.map(Some)
    }
}

/// Prefixes every reference in a freshly parsed document with `prefix`.
///
/// Include directives are left alone; their content is re-rooted when it is
/// loaded.
fn rebase_object(mut object: ConfigObject, prefix: &ConfigPath) -> ConfigObject {
    let includes = object.take_includes();
    let mut rebased: ConfigObject = object
        .into_iter()
        .map(|(key, value)| (key, rebase_value(value, prefix)))
        .collect();
    rebased.extend_includes(includes);
    rebased
}

fn rebase_value(value: ConfigValue, prefix: &ConfigPath) -> ConfigValue {
    match value {
        ConfigValue::Object(object) => ConfigValue::Object(rebase_object(object, prefix)),
        ConfigValue::Array(items) => {
            ConfigValue::Array(items.into_iter().map(|item| rebase_value(item, prefix)).collect())
        }
        ConfigValue::Unresolved(concat) => {
            let (levels, bottom) = concat.into_history();
            let levels = levels
                .into_iter()
                .map(|parts| {
                    parts
                        .into_iter()
                        .map(|part| match part {
                            Part::Literal(value) => Part::Literal(rebase_value(value, prefix)),
                            Part::Substitution(sub) => Part::Substitution(sub.rebased(prefix)),
                            whitespace => whitespace,
                        })
                        .collect()
                })
                .collect();
            let bottom = bottom.map(|older| rebase_value(older, prefix));
            Concatenation::from_history(levels, bottom)
        }
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::loader::{MemoryLoader, MockResourceLoader};
    use crate::resolve::{ResolveOptions, SubstitutionResolver};
    use crate::value::IncludeKind;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn expand(text: &str, loader: &MemoryLoader) -> Result<ConfigObject> {
        let raw = parser::parse(text)?;
        IncludeResolver::new(loader).expand(raw)
    }

    fn expand_and_resolve(text: &str, loader: &MemoryLoader) -> Result<ConfigObject> {
        SubstitutionResolver::resolve(expand(text, loader)?, &ResolveOptions::default())
    }

    fn lookup<'a>(root: &'a ConfigObject, path: &str) -> Option<&'a ConfigValue> {
        let path = ConfigPath::parse(path).unwrap();
        root.get(&path.segments()[0])?.descend(&path.segments()[1..])
    }

    fn file(loader: MemoryLoader, location: &str, text: &str) -> MemoryLoader {
        loader.with_resource(IncludeKind::File, location, text)
    }

    #[test]
    fn test_enclosing_keys_win_in_both_orders() {
        let loader = file(MemoryLoader::new(), "inc.conf", "before = inc\nafter = inc\nonly = inc");
        let root = expand("before = doc\ninclude \"inc.conf\"\nafter = doc", &loader).unwrap();
        assert_eq!(root.get("before"), Some(&ConfigValue::from("doc")));
        assert_eq!(root.get("after"), Some(&ConfigValue::from("doc")));
        assert_eq!(root.get("only"), Some(&ConfigValue::from("inc")));
    }

    #[test]
    fn test_later_include_overrides_earlier() {
        let loader = file(
            file(MemoryLoader::new(), "one.conf", "x = 1\ny = 1"),
            "two.conf",
            "x = 2",
        );
        let root = expand("include \"one.conf\"\ninclude \"two.conf\"", &loader).unwrap();
        assert_eq!(root.get("x"), Some(&ConfigValue::from(2)));
        assert_eq!(root.get("y"), Some(&ConfigValue::from(1)));
    }

    #[test]
    fn test_objects_deep_merge_with_included_content() {
        let loader = file(MemoryLoader::new(), "db.conf", "db { host = localhost, port = 5432 }");
        let root = expand("include \"db.conf\"\ndb.port = 6543", &loader).unwrap();
        let db = root.get("db").and_then(ConfigValue::as_object).unwrap();
        assert_eq!(db.get("host"), Some(&ConfigValue::from("localhost")));
        assert_eq!(db.get("port"), Some(&ConfigValue::from(6543)));
    }

    #[test]
    fn test_include_inside_nested_object() {
        let loader = file(MemoryLoader::new(), "pool.conf", "size = 4");
        let root = expand("pool { include \"pool.conf\" }", &loader).unwrap();
        let pool = root.get("pool").and_then(ConfigValue::as_object).unwrap();
        assert_eq!(pool.get("size"), Some(&ConfigValue::from(4)));
        assert!(root.is_resolved());
    }

    #[test]
    fn test_nested_includes_expand_recursively() {
        let loader = file(
            file(MemoryLoader::new(), "a.conf", "include \"b.conf\"\na = 1"),
            "b.conf",
            "b = 2",
        );
        let root = expand("include \"a.conf\"", &loader).unwrap();
        assert_eq!(root.get("a"), Some(&ConfigValue::from(1)));
        assert_eq!(root.get("b"), Some(&ConfigValue::from(2)));
    }

    #[test]
    fn test_missing_optional_include_is_skipped() {
        let root = expand("include \"missing.conf\"\na = 1", &MemoryLoader::new()).unwrap();
        assert_eq!(root.len(), 1);
        assert!(root.includes().is_empty());
    }

    #[test]
    fn test_missing_required_include_fails() {
        let err = expand("include required(file(\"missing.conf\"))", &MemoryLoader::new())
            .unwrap_err();
        assert!(matches!(&err, Error::Include { location, .. } if location.contains("missing.conf")));
        assert!(err.is_include_error());
    }

    #[test]
    fn test_syntax_error_in_include_is_reported() {
        let loader = file(MemoryLoader::new(), "bad.conf", "a = [1");
        let err = expand("include \"bad.conf\"", &loader).unwrap_err();
        assert!(matches!(err, Error::Include { reason, .. } if reason.contains("syntax error")));
    }

    #[test]
    fn test_include_cycle_is_detected() {
        let loader = file(
            file(MemoryLoader::new(), "a.conf", "include \"b.conf\""),
            "b.conf",
            "include \"a.conf\"",
        );
        let err = expand("include \"a.conf\"", &loader).unwrap_err();
        let Error::IncludeCycle { chain } = err else {
            panic!("expected include cycle, got {err:?}");
        };
        assert_eq!(chain, ["file(a.conf)", "file(b.conf)", "file(a.conf)"]);
    }

    #[test]
    fn test_included_value_becomes_history_for_self_reference() {
        let loader = file(MemoryLoader::new(), "base.conf", "list = [1, 2]");
        let root = expand("include \"base.conf\"\nlist = ${list} [3]", &loader).unwrap();
        let Some(ConfigValue::Unresolved(concat)) = root.get("list") else {
            panic!("expected unresolved value");
        };
        assert_eq!(
            concat.previous(),
            Some(&ConfigValue::Array(vec![ConfigValue::from(1), ConfigValue::from(2)]))
        );
    }

    #[test]
    fn test_loader_called_in_document_order() {
        let mut loader = MockResourceLoader::new();
        let mut seq = Sequence::new();
        for location in ["first.conf", "second.conf", "third.conf"] {
            loader
                .expect_load()
                .with(eq(IncludeKind::File), eq(location))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(String::new()));
        }
        loader.expect_base_dir().returning(|_, _| None);

        let raw = parser::parse(
            "include \"first.conf\"\ninclude \"second.conf\"\nnested { include \"third.conf\" }",
        )
        .unwrap();
        IncludeResolver::new(&loader).expand(raw).unwrap();
    }
    #[test]
    fn test_nested_include_appends_within_included_document() {
        let loader = file(MemoryLoader::new(), "x.conf", "xs = [1]\nxs += 2");
        let root = expand_and_resolve("a { include \"x.conf\" }", &loader).unwrap();
        assert_eq!(
            lookup(&root, "a.xs"),
            Some(&ConfigValue::Array(vec![ConfigValue::from(1), ConfigValue::from(2)]))
        );
    }

    #[test]
    fn test_nested_include_references_its_own_keys() {
        let loader = file(MemoryLoader::new(), "db.conf", "host = h\nurl = \"jdbc://\"${host}");
        let root = expand_and_resolve("db { include \"db.conf\" }", &loader).unwrap();
        assert_eq!(lookup(&root, "db.url"), Some(&ConfigValue::from("jdbc://h")));
    }

    #[test]
    fn test_nested_include_falls_back_to_root_paths() {
        let loader = file(MemoryLoader::new(), "svc.conf", "name = ${top}\nlocal = x\nboth = ${local}");
        let root = expand_and_resolve("top = T\nlocal = root\nsvc { include \"svc.conf\" }", &loader)
            .unwrap();
        assert_eq!(lookup(&root, "svc.name"), Some(&ConfigValue::from("T")));
        assert_eq!(lookup(&root, "svc.both"), Some(&ConfigValue::from("x")));
    }

    #[test]
    fn test_include_within_included_document_is_rooted_at_full_path() {
        let loader = file(
            file(MemoryLoader::new(), "outer.conf", "inner { include \"leaf.conf\" }"),
            "leaf.conf",
            "v = 1\nw = ${v}",
        );
        let raw = expand("a { include \"outer.conf\" }", &loader).unwrap();
        let Some(ConfigValue::Unresolved(concat)) = lookup(&raw, "a.inner.w") else {
            panic!("expected unresolved value");
        };
        let Some(Part::Substitution(sub)) = concat.parts().first() else {
            panic!("expected a reference");
        };
        assert_eq!(sub.path.to_string(), "a.inner.v");
        assert_eq!(sub.root_path.as_ref().map(ToString::to_string).as_deref(), Some("v"));

        let root = SubstitutionResolver::resolve(raw, &ResolveOptions::default()).unwrap();
        assert_eq!(lookup(&root, "a.inner.w"), Some(&ConfigValue::from(1)));
    }
}
