//! The typed environment store.
//!
//! [`Env`] maps variable names to [`EnvValue`]s. Every write passes through the
//! variable's ensurer (see [`Registry`]), and the stringified view handed to
//! child processes is computed lazily by [`Env::detype`] and cached until the
//! next write.
//!
//! # Scoped overrides
//!
//! [`Env::swap`] applies a set of temporary values and returns a [`SwapGuard`].
//! Writes made while a guard is alive are local to its scope. Dropping the
//! guard puts back every variable the scope touched, including when the scope
//! is left by an early return or a panic:
//!
//! ```
//! use conch_env::Env;
//!
//! let mut env = Env::new();
//! env.set("VAR", "wakka").unwrap();
//! {
//!     let scoped = env.swap([("VAR", "foo"), ("NEW", "bar")]).unwrap();
//!     assert_eq!(scoped.get_str("VAR").as_deref(), Some("foo"));
//! }
//! assert_eq!(env.get_str("VAR").as_deref(), Some("wakka"));
//! assert!(!env.contains("NEW"));
//! ```
//!
//! The cache lives in a [`OnceCell`], so an `Env` is not `Sync`. Share it
//! across threads only behind a lock.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use serde_json::Value as Json;

use crate::error::EnvError;
use crate::registry::Registry;
use crate::value::{EnvPath, EnvValue, TokenSet};

/// Prior state of the variables touched by one [`Env::swap`] call.
#[derive(Debug)]
struct SwapFrame {
    /// `None` marks a variable that did not exist before the swap.
    saved: Vec<(String, Option<EnvValue>)>,
}

/// A shell environment with typed values.
#[derive(Debug)]
pub struct Env {
    vars: HashMap<String, EnvValue>,
    registry: Registry,
    detyped: OnceCell<BTreeMap<String, String>>,
    frames: Vec<SwapFrame>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    /// Create an empty environment using [`Registry::builtin`].
    pub fn new() -> Self {
        Self::with_registry(Registry::builtin())
    }

    /// Create an empty environment with custom converters.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            vars: HashMap::new(),
            registry,
            detyped: OnceCell::new(),
            frames: Vec::new(),
        }
    }

    /// Create an environment seeded from `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::Coerce`] if any value is rejected by its ensurer.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Json>,
    {
        let mut env = Self::new();
        env.update(vars)?;
        Ok(env)
    }

    /// Create an environment seeded from the current process environment.
    ///
    /// Values their ensurer rejects are kept as plain strings, and variables
    /// that are not valid UTF-8 are skipped.
    pub fn from_process_env() -> Self {
        let mut env = Self::new();
        for (key, value) in std::env::vars_os() {
            let (Some(key), Some(value)) = (key.to_str(), value.to_str()) else {
                tracing::debug!("skipping non UTF-8 environment variable {:?}", key);
                continue;
            };
            if let Err(e) = env.set(key, value) {
                tracing::warn!("keeping ${} as a string: {}", key, e);
                env.vars.insert(key.to_string(), EnvValue::Str(value.to_string()));
            }
        }
        env
    }

    /// The converters this environment was created with.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Look up a variable.
    ///
    /// Unset variables with a registered default (such as `HISTCONTROL`)
    /// yield that default; other unset variables yield `None`.
    pub fn get(&self, name: &str) -> Option<Cow<'_, EnvValue>> {
        self.vars
            .get(name)
            .map(Cow::Borrowed)
            .or_else(|| self.registry.default_for(name).map(Cow::Owned))
    }

    /// Like [`get`](Self::get) but reports a missing variable as an error.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::NotFound`] if the variable is unset and has no
    /// default.
    pub fn require(&self, name: &str) -> Result<Cow<'_, EnvValue>, EnvError> {
        self.get(name)
            .ok_or_else(|| EnvError::NotFound(name.to_string()))
    }

    /// Mutable access to a stored path list, for editing it in place.
    ///
    /// Returns `None` if `name` is unset or not a path list. Only the list is
    /// handed out, so the variable stays a path list. The detyped cache is
    /// dropped as soon as access is granted.
    pub fn get_path_mut(&mut self, name: &str) -> Option<&mut EnvPath> {
        if !self.vars.get(name).is_some_and(|v| v.as_path().is_some()) {
            return None;
        }
        self.record_prior(name);
        self.invalidate();
        self.vars.get_mut(name).and_then(EnvValue::as_path_mut)
    }

    /// String value of `name`, if it holds one.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Boolean value of `name`, if it holds one.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    /// Integer value of `name`, if it holds one.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    /// Path list value of `name`, if it holds one.
    pub fn get_paths(&self, name: &str) -> Option<EnvPath> {
        self.get(name).and_then(|v| v.as_path().cloned())
    }

    /// Token set value of `name`, if it holds one.
    pub fn get_tokens(&self, name: &str) -> Option<TokenSet> {
        self.get(name).and_then(|v| v.as_tokens().cloned())
    }

    /// Set a variable, converting `raw` with the variable's ensurer.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::Coerce`] if the ensurer rejects `raw`. The
    /// environment is left unchanged in that case.
    pub fn set(&mut self, name: impl Into<String>, raw: impl Into<Json>) -> Result<(), EnvError> {
        let name = name.into();
        let value = self.registry.ensure(&name, raw.into())?;
        self.record_prior(&name);
        self.invalidate();
        self.vars.insert(name, value);
        Ok(())
    }

    /// Set several variables. Stops at the first coercion failure; variables
    /// set before it keep their new values.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::Coerce`] for the first rejected value.
    pub fn update<I, K, V>(&mut self, vars: I) -> Result<(), EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Json>,
    {
        for (name, raw) in vars {
            self.set(name, raw)?;
        }
        Ok(())
    }

    /// Remove a variable, returning its value.
    pub fn delete(&mut self, name: &str) -> Option<EnvValue> {
        if !self.vars.contains_key(name) {
            return None;
        }
        self.record_prior(name);
        self.invalidate();
        self.vars.remove(name)
    }

    /// Returns true if `name` is set. Registered defaults do not count.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Number of set variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no variables are set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over set variables in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvValue)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The environment as plain strings, suitable for a child process.
    ///
    /// Variables without a string form are left out. The result is cached
    /// until the next write.
    pub fn detype(&self) -> &BTreeMap<String, String> {
        self.detyped.get_or_init(|| {
            self.vars
                .iter()
                .filter_map(|(name, value)| {
                    self.registry
                        .detype(name, value)
                        .map(|s| (name.clone(), s))
                })
                .collect()
        })
    }

    /// Returns true if a detyped view is currently cached.
    pub fn is_detype_cached(&self) -> bool {
        self.detyped.get().is_some()
    }

    /// Temporarily override variables until the returned guard is dropped.
    ///
    /// Later entries win when a name appears more than once, so a base mapping
    /// chained with extra pairs gives the extras precedence.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::Coerce`] if any value is rejected. Nothing is
    /// applied in that case.
    pub fn swap<I, K, V>(&mut self, overrides: I) -> Result<SwapGuard<'_>, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Json>,
    {
        let values = overrides
            .into_iter()
            .map(|(name, raw)| {
                let name = name.into();
                let value = self.registry.ensure(&name, raw.into())?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>, EnvError>>()?;

        let mut seen = HashSet::new();
        let mut saved = Vec::new();
        for (name, value) in values {
            let prior = self.vars.insert(name.clone(), value);
            if seen.insert(name.clone()) {
                saved.push((name, prior));
            }
        }
        self.invalidate();
        self.frames.push(SwapFrame { saved });
        tracing::debug!(depth = self.frames.len(), "entered override scope");

        Ok(SwapGuard { env: self })
    }

    /// Run `f` with variables overridden, restoring them afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::Coerce`] if any override is rejected; `f` is not
    /// called in that case.
    pub fn with_swap<I, K, V, R>(
        &mut self,
        overrides: I,
        f: impl FnOnce(&mut Env) -> R,
    ) -> Result<R, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Json>,
    {
        let mut guard = self.swap(overrides)?;
        Ok(f(&mut guard))
    }

    /// Number of active override scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn pop_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        for (name, prior) in frame.saved.into_iter().rev() {
            match prior {
                Some(value) => {
                    self.vars.insert(name, value);
                }
                None => {
                    self.vars.remove(&name);
                }
            }
        }
        self.invalidate();
        tracing::debug!(depth = self.frames.len(), "left override scope");
    }

    /// Save the current value of `name` in the innermost scope, unless that
    /// scope already holds one. Called before every write.
    fn record_prior(&mut self, name: &str) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if !frame.saved.iter().any(|(saved, _)| saved == name) {
            frame.saved.push((name.to_string(), self.vars.get(name).cloned()));
        }
    }

    fn invalidate(&mut self) {
        self.detyped.take();
    }
}

/// Guard returned by [`Env::swap`]. Derefs to the environment; dropping it
/// restores the overridden variables.
#[derive(Debug)]
#[must_use = "the overrides are undone as soon as the guard is dropped"]
pub struct SwapGuard<'a> {
    env: &'a mut Env,
}

impl SwapGuard<'_> {
    /// End the scope now. Equivalent to dropping the guard.
    pub fn restore(self) {}
}

impl Deref for SwapGuard<'_> {
    type Target = Env;

    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for SwapGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

impl Drop for SwapGuard<'_> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}
