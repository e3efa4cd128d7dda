//! Path-indexed, memoized substitution resolution.
//!
//! Resolution is driven by an explicit stack of pending paths. Resolving a
//! value never recurses into another path: a reference to a path that is not
//! yet resolved stalls the attempt, the driver pushes that path, and the
//! stalled path is retried once it is done. Reference chains therefore cost
//! heap, not stack, and a stall on a path already pending is a cycle.

use std::collections::HashSet;

use super::concat::{self, Piece};
use super::{ResolveOptions, UnresolvedPolicy};
use crate::error::{Error, Result};
use crate::path::ConfigPath;
use crate::value::{Concatenation, ConfigObject, ConfigValue, Part, SubstitutionRef};

/// Why an attempt to resolve a path did not finish.
#[derive(Debug)]
enum Stall {
    /// The value at this path must be resolved first.
    Blocked(ConfigPath),
    Failed(Error),
}

impl From<Error> for Stall {
    fn from(err: Error) -> Self {
        Self::Failed(err)
    }
}

type Step<T> = std::result::Result<T, Stall>;

/// State of one resolution pass over a tree.
///
/// Resolved values are written back into `root` and their paths recorded in
/// `done`, so each path is evaluated to completion at most once.
pub(crate) struct Resolution<'a> {
    root: ConfigValue,
    done: HashSet<ConfigPath>,
    /// The path whose raw value is detached from `root` while it is evaluated.
    active: Option<ConfigPath>,
    options: &'a ResolveOptions,
}

impl<'a> Resolution<'a> {
    pub(crate) fn new(tree: ConfigObject, options: &'a ResolveOptions) -> Self {
        Self {
            root: ConfigValue::Object(tree),
            done: HashSet::new(),
            active: None,
            options,
        }
    }

    pub(crate) fn run(mut self) -> Result<ConfigObject> {
        let mut pending = vec![ConfigPath::root()];
        let mut waiting: HashSet<ConfigPath> = pending.iter().cloned().collect();
        let mut attempts = 0_usize;

        while let Some(path) = pending.last().cloned() {
            attempts += 1;
            match self.attempt(&path) {
                Ok(()) => {
                    pending.pop();
                    waiting.remove(&path);
                }
                Err(Stall::Blocked(dependency)) => {
                    if waiting.contains(&dependency) {
                        return Err(Self::cycle(&pending, &dependency));
                    }
                    log::trace!("{path} waits for {dependency}");
                    waiting.insert(dependency.clone());
                    pending.push(dependency);
                }
                Err(Stall::Failed(err)) => return Err(err),
            }
        }

        log::debug!("Resolved {} paths in {attempts} attempts", self.done.len());
        match self.root {
            ConfigValue::Object(object) => Ok(object),
            other => Err(Error::type_mismatch("", "object", other.value_type())),
        }
    }

    fn cycle(pending: &[ConfigPath], dependency: &ConfigPath) -> Error {
        let start = pending.iter().position(|p| p == dependency).unwrap_or(0);
        let chain = pending[start..]
            .iter()
            .chain(std::iter::once(dependency))
            .map(ToString::to_string)
            .collect();
        Error::SubstitutionCycle { chain }
    }

    /// Tries to resolve whatever currently occupies `path`, in place.
    ///
    /// Objects are walked key by key; a child that stalls reports the child
    /// itself as the blocker, so the pending stack records the full path of
    /// dependencies.
    fn attempt(&mut self, path: &ConfigPath) -> Step<()> {
        if self.done.contains(path) {
            return Ok(());
        }
        let keys = match self.root.descend(path.segments()) {
            Some(ConfigValue::Object(object)) => {
                if let Some(directive) = object.includes().first() {
                    return Err(Error::Include {
                        location: directive.location.clone(),
                        reason: "include directive was not expanded before resolution"
                            .to_string(),
                    }
                    .into());
                }
                Some(object.keys().map(str::to_string).collect::<Vec<_>>())
            }
            Some(ConfigValue::Array(_) | ConfigValue::Unresolved(_)) => None,
            _ => {
                self.done.insert(path.clone());
                return Ok(());
            }
        };

        match keys {
            Some(keys) => {
                for key in keys {
                    let child = path.child(&key);
                    match self.attempt(&child) {
                        Ok(()) => {}
                        Err(Stall::Blocked(_)) => return Err(Stall::Blocked(child)),
                        Err(failed) => return Err(failed),
                    }
                }
            }
            None => self.evaluate(path)?,
        }
        self.done.insert(path.clone());
        Ok(())
    }

    /// Evaluates the array or concatenation at `path`.
    ///
    /// The raw value is detached while it is evaluated and put back if the
    /// evaluation stalls.
    fn evaluate(&mut self, path: &ConfigPath) -> Step<()> {
        let raw = self.take(path);
        self.active = Some(path.clone());
        let outcome = self.resolve_node(&raw, path, None);
        self.active = None;
        match outcome {
            Ok(resolved) => {
                log::trace!("Resolved {path}");
                self.store(path, resolved);
                Ok(())
            }
            Err(stall) => {
                self.store(path, Some(raw));
                Err(stall)
            }
        }
    }

    fn take(&mut self, path: &ConfigPath) -> ConfigValue {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = match node {
                ConfigValue::Object(object) => match object.get_mut(segment) {
                    Some(child) => child,
                    None => return ConfigValue::Null,
                },
                _ => return ConfigValue::Null,
            };
        }
        std::mem::take(node)
    }

    /// Writes a resolved value back into the tree; `None` removes the key.
    fn store(&mut self, path: &ConfigPath, value: Option<ConfigValue>) {
        let Some((key, parent)) = path.segments().split_last() else {
            if let Some(value) = value {
                self.root = value;
            }
            return;
        };
        let mut node = &mut self.root;
        for segment in parent {
            node = match node {
                ConfigValue::Object(object) => match object.get_mut(segment) {
                    Some(child) => child,
                    None => return,
                },
                _ => return,
            };
        }
        if let ConfigValue::Object(object) = node {
            match value {
                Some(value) => {
                    object.insert(key.clone(), value);
                }
                None => {
                    object.remove(key);
                }
            }
        }
    }

    /// Resolves a detached value that belongs at path `at`.
    ///
    /// `history` is the resolved value `at` held before the value being
    /// resolved replaced it, used by self-references.
    fn resolve_node(
        &mut self,
        value: &ConfigValue,
        at: &ConfigPath,
        history: Option<&ConfigValue>,
    ) -> Step<Option<ConfigValue>> {
        match value {
            ConfigValue::Object(object) => {
                let mut resolved = ConfigObject::new();
                for (key, child) in object {
                    let child_history = history.and_then(|h| h.descend(std::slice::from_ref(key)));
                    if let Some(child) = self.resolve_node(child, &at.child(key), child_history)? {
                        resolved.insert(key.clone(), child);
                    }
                }
                Ok(Some(ConfigValue::Object(resolved)))
            }
            ConfigValue::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(item) = self.resolve_node(item, at, None)? {
                        resolved.push(item);
                    }
                }
                Ok(Some(ConfigValue::Array(resolved)))
            }
            ConfigValue::Unresolved(concat) => self.resolve_concat(concat, at, history),
            scalar => Ok(Some(scalar.clone())),
        }
    }

    /// Resolves a concatenation together with as much of its history as it
    /// can observe.
    ///
    /// The history chain is walked iteratively from the newest level until a
    /// level that neither refers to its own path nor can come out absent.
    /// The collected levels are then evaluated oldest first, each one seeing
    /// the result of the level below as its history.
    fn resolve_concat(
        &mut self,
        concat: &Concatenation,
        at: &ConfigPath,
        inherited: Option<&ConfigValue>,
    ) -> Step<Option<ConfigValue>> {
        let mut levels = Vec::new();
        let mut bottom = None;
        let mut inherit = false;
        let mut next = Some(concat);
        while let Some(level) = next.take() {
            levels.push(level.parts());
            if !parts_observe_history(level.parts(), at) {
                break;
            }
            match level.previous() {
                Some(ConfigValue::Unresolved(older)) => next = Some(older),
                Some(older) => bottom = Some(older),
                None => inherit = true,
            }
        }
        if levels.len() > 1 {
            log::trace!("Resolving {} history levels at {at}", levels.len());
        }

        let mut history = match bottom {
            Some(older) => self.resolve_node(older, at, None)?,
            None if inherit => inherited.cloned(),
            None => None,
        };
        for parts in levels.into_iter().rev() {
            history = self.resolve_parts(parts, at, history)?;
        }
        Ok(history)
    }

    /// Joins one level of a concatenation; an absent result falls back to
    /// `history`.
    fn resolve_parts(
        &mut self,
        parts: &[Part],
        at: &ConfigPath,
        history: Option<ConfigValue>,
    ) -> Step<Option<ConfigValue>> {
        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            let piece = match part {
                Part::Literal(value) => self
                    .resolve_node(value, at, history.as_ref())?
                    .map(Piece::Value),
                Part::Whitespace(ws) => Some(Piece::Whitespace(ws.clone())),
                Part::Substitution(sub) => self
                    .resolve_reference(sub, at, history.as_ref())?
                    .map(Piece::Value),
            };
            pieces.extend(piece);
        }
        match concat::join(pieces, at)? {
            None => Ok(history),
            joined => Ok(joined),
        }
    }

    fn resolve_reference(
        &mut self,
        sub: &SubstitutionRef,
        at: &ConfigPath,
        history: Option<&ConfigValue>,
    ) -> Step<Option<ConfigValue>> {
        let found = match sub.path.strip_prefix(at) {
            Some(rest) if !at.is_empty() => {
                log::trace!("{} at {at} refers to its own path, using history", sub.raw_text);
                history.and_then(|older| older.descend(rest)).cloned()
            }
            _ => match (self.lookup(&sub.path)?, &sub.root_path) {
                (None, Some(written)) => self.lookup(written)?,
                (found, _) => found,
            },
        };
        match found {
            Some(value) => Ok(Some(value)),
            None => self.fallback(sub, at).map_err(Stall::from),
        }
    }

    /// Reads the resolved value at `path`, stalling on the first ancestor or
    /// target that still needs resolving.
    fn lookup(&self, path: &ConfigPath) -> Step<Option<ConfigValue>> {
        if let Some(active) = self.active.as_ref().filter(|active| active.is_prefix_of(path)) {
            return Err(Stall::Blocked(active.clone()));
        }
        for len in 1..path.len() {
            let prefix = path.prefix(len);
            match self.root.descend(prefix.segments()) {
                Some(ConfigValue::Object(_)) => {}
                Some(ConfigValue::Unresolved(_)) => return Err(Stall::Blocked(prefix)),
                _ => return Ok(None),
            }
        }
        match self.root.descend(path.segments()) {
            Some(
                ConfigValue::Object(_) | ConfigValue::Array(_) | ConfigValue::Unresolved(_),
            ) if !self.done.contains(path) => Err(Stall::Blocked(path.clone())),
            found => Ok(found.cloned()),
        }
    }

    fn fallback(&self, sub: &SubstitutionRef, at: &ConfigPath) -> Result<Option<ConfigValue>> {
        let from_env = self
            .options
            .env
            .as_ref()
            .zip(sub.path.last())
            .and_then(|(env, key)| env.get(key));
        if let Some(value) = from_env {
            log::trace!("{} resolved from the environment", sub.raw_text);
            return Ok(Some(ConfigValue::String(value.clone())));
        }
        if sub.optional {
            return Ok(None);
        }
        match self.options.unresolved {
            UnresolvedPolicy::KeepRawText => Ok(Some(ConfigValue::String(sub.raw_text.clone()))),
            UnresolvedPolicy::Error => Err(Error::MissingSubstitution {
                path: sub.path.to_string(),
                location: at.to_string(),
            }),
        }
    }
}

/// Whether evaluating `parts` at `at` can read the value they replaced:
/// either through a reference into `at` itself or because an optional
/// reference may leave the result absent.
fn parts_observe_history(parts: &[Part], at: &ConfigPath) -> bool {
    parts.iter().any(|part| match part {
        Part::Substitution(sub) => sub.optional || at.is_prefix_of(&sub.path),
        Part::Literal(value) => value_observes_history(value, at),
        Part::Whitespace(_) => false,
    })
}

fn value_observes_history(value: &ConfigValue, at: &ConfigPath) -> bool {
    match value {
        ConfigValue::Object(object) => object.iter().any(|(_, child)| value_observes_history(child, at)),
        ConfigValue::Array(items) => items.iter().any(|item| value_observes_history(item, at)),
        ConfigValue::Unresolved(concat) => parts_observe_history(concat.parts(), at),
        _ => false,
    }
}
