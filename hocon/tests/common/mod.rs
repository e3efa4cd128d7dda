//! Common test utilities for integration tests.
//!
//! This module provides helpers for locating the checked-in fixtures and for
//! laying out throwaway include trees on disk.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use hocon::{Config, ConfigBuilder};
use tempfile::TempDir;

/// Path of a file under `tests/fixtures`.
#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Writes `files` (relative path, contents) into a fresh temporary directory.
///
/// Parent directories are created as needed. The directory is removed when
/// the returned `TempDir` is dropped.
#[allow(dead_code)]
pub fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temporary directory");
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture directory");
        }
        fs::write(&path, contents).expect("failed to write fixture file");
    }
    dir
}

/// Parses `text` with default settings, panicking on failure.
#[allow(dead_code)]
pub fn parse(text: &str) -> Config {
    hocon::parse_str(text).unwrap_or_else(|err| panic!("failed to parse {text:?}: {err}"))
}

/// Builds an environment map from pairs.
#[allow(dead_code)]
pub fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

/// Parses a fixture file with an explicit environment.
#[allow(dead_code)]
pub fn parse_fixture_with_env(name: &str, vars: &[(&str, &str)]) -> Config {
    ConfigBuilder::new()
        .with_env(env(vars))
        .parse_file(fixture(name))
        .unwrap_or_else(|err| panic!("failed to parse fixture {name}: {err}"))
}

/// RAII guard for setting and restoring an environment variable.
///
/// Tests using it must be marked `#[serial]`.
#[allow(dead_code)]
pub struct EnvGuard {
    key: String,
    old_value: Option<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    /// Sets `key` to `value` until the guard is dropped.
    pub fn set(key: &str, value: &str) -> Self {
        let old_value = env::var(key).ok();
        env::set_var(key, value);
        Self {
            key: key.to_string(),
            old_value,
        }
    }

    /// Removes `key` until the guard is dropped.
    pub fn remove(key: &str) -> Self {
        let old_value = env::var(key).ok();
        env::remove_var(key);
        Self {
            key: key.to_string(),
            old_value,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.old_value {
            Some(value) => env::set_var(&self.key, value),
            None => env::remove_var(&self.key),
        }
    }
}
