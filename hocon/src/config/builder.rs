//! Builder running the full parse, merge, include and resolve pipeline.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use super::{Config, Environment};
use crate::error::{Error, Result};
use crate::include::{FsLoader, IncludeResolver, ResourceLoader};
use crate::merge::ConfigMerger;
use crate::parser;
use crate::resolve::{ResolveOptions, SubstitutionResolver, UnresolvedPolicy};
use crate::value::{ConfigObject, IncludeKind};

/// Builder for loading configurations.
///
/// Each parsed document has its includes expanded, is then merged with the
/// programmatic layers (overrides above it, fallbacks below it) and finally
/// resolved.
///
/// # Examples
///
/// ```
/// use hocon::{ConfigBuilder, ConfigObject, ConfigValue, IncludeKind, MemoryLoader};
///
/// let loader = MemoryLoader::new()
///     .with_resource(IncludeKind::File, "defaults.conf", "port = 80\nhost = localhost");
/// let overrides: ConfigObject = vec![("port", ConfigValue::from(9000))].into_iter().collect();
///
/// let config = ConfigBuilder::new()
///     .with_loader(loader)
///     .with_override(overrides)
///     .parse_str("include \"defaults.conf\"\nport = 8080\nurl = ${host}\":\"${port}")
///     .unwrap();
///
/// assert_eq!(config.get_int("port").unwrap(), 9000);
/// assert_eq!(config.get_string("url").unwrap(), "localhost:9000");
/// ```
pub struct ConfigBuilder {
    loader: Box<dyn ResourceLoader>,
    overrides: Vec<ConfigObject>,
    fallbacks: Vec<ConfigObject>,
    env: Option<HashMap<String, String>>,
    unresolved: UnresolvedPolicy,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            loader: Box::new(FsLoader::new()),
            overrides: Vec::new(),
            fallbacks: Vec::new(),
            env: None,
            unresolved: UnresolvedPolicy::Error,
        }
    }
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("overrides", &self.overrides.len())
            .field("fallbacks", &self.fallbacks.len())
            .field("env", &self.env.as_ref().map(HashMap::len))
            .field("unresolved", &self.unresolved)
            .finish_non_exhaustive()
    }
}

impl ConfigBuilder {
    /// Create a new builder loading includes from the filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `loader` for include directives and [`parse_resource`](Self::parse_resource).
    #[must_use]
    pub fn with_loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Add a layer that overrides the parsed document.
    ///
    /// Overrides added earlier win over ones added later.
    #[must_use]
    pub fn with_override(mut self, layer: impl Into<ConfigObject>) -> Self {
        self.overrides.push(layer.into());
        self
    }

    /// Add a layer that the parsed document overrides.
    ///
    /// Fallbacks added earlier win over ones added later.
    #[must_use]
    pub fn with_fallback(mut self, layer: impl Into<ConfigObject>) -> Self {
        self.fallbacks.push(layer.into());
        self
    }

    /// Resolve references missing from the document against `env`, keyed by
    /// the reference's last path segment.
    #[must_use]
    pub fn with_env(mut self, env: impl Into<Environment>) -> Self {
        self.env = Some(env.into().into_map());
        self
    }

    /// Like [`with_env`](Self::with_env) with a snapshot of the process environment.
    #[must_use]
    pub fn with_system_env(self) -> Self {
        self.with_env(Environment::capture())
    }

    /// Keep the raw `${...}` text of unresolvable required references
    /// instead of failing.
    #[must_use]
    pub fn keep_unresolved_as_text(mut self) -> Self {
        self.unresolved = UnresolvedPolicy::KeepRawText;
        self
    }

    /// Parse and resolve a document.
    ///
    /// # Errors
    ///
    /// Returns a syntax, include or substitution error from any stage.
    pub fn parse_str(&self, text: &str) -> Result<Config> {
        let raw = self.build_raw(text, None)?;
        self.resolve(raw)
    }

    /// Parse and resolve a document read from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails, otherwise as
    /// [`parse_str`](Self::parse_str).
    pub fn parse_reader(&self, mut reader: impl Read) -> Result<Config> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.parse_str(&text)
    }

    /// Parse and resolve the file at `path`; relative includes resolve
    /// against its directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`parse_str`](Self::parse_str).
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Config> {
        let raw = self.build_raw_file(path)?;
        self.resolve(raw)
    }

    /// Parse and resolve a document fetched through the loader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Include`] if the loader fails, otherwise as
    /// [`parse_str`](Self::parse_str).
    pub fn parse_resource(&self, kind: IncludeKind, location: &str) -> Result<Config> {
        let text = self.loader.load(kind, location).map_err(|err| Error::Include {
            location: format!("{kind}({location})"),
            reason: err.to_string(),
        })?;
        let base_dir = self.loader.base_dir(kind, location);
        let raw = self.build_raw(&text, base_dir.as_deref())?;
        self.resolve(raw)
    }

    /// Run the pipeline on `text` up to, but not including, substitution
    /// resolution.
    ///
    /// The result keeps substitutions and concatenations in their raw form.
    ///
    /// # Errors
    ///
    /// Returns a syntax or include error.
    pub fn build_raw_str(&self, text: &str) -> Result<ConfigObject> {
        self.build_raw(text, None)
    }

    /// Like [`build_raw_str`](Self::build_raw_str) for the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`build_raw_str`](Self::build_raw_str).
    pub fn build_raw_file(&self, path: impl AsRef<Path>) -> Result<ConfigObject> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        self.build_raw(&text, path.parent())
    }

    fn build_raw(&self, text: &str, base_dir: Option<&Path>) -> Result<ConfigObject> {
        let document = parser::parse_with_base_dir(text, base_dir)?;

        let mut includes = IncludeResolver::new(self.loader.as_ref());
        let mut layers = Vec::with_capacity(self.overrides.len() + self.fallbacks.len() + 1);
        for layer in &self.overrides {
            layers.push(includes.expand(layer.clone())?);
        }
        layers.push(includes.expand(document)?);
        for layer in &self.fallbacks {
            layers.push(includes.expand(layer.clone())?);
        }

        log::debug!("Merging {} layers", layers.len());
        Ok(ConfigMerger::merge_layers(layers))
    }

    fn resolve(&self, raw: ConfigObject) -> Result<Config> {
        let options = ResolveOptions {
            env: self.env.clone(),
            unresolved: self.unresolved,
        };
        SubstitutionResolver::resolve(raw, &options).map(Config::from_resolved)
    }
}
