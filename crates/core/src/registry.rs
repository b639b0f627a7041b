//! Namespaced registry keys.
//!
//! Item identities and loot table references are addressed by stable string
//! keys of the form `namespace:path` (e.g. `mdm:cobblestone`,
//! `mdm:chests/dungeon`). Keys order lexically so registries iterate
//! deterministically, and they persist as their display form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default namespace used when a key omits an explicit namespace.
pub const DEFAULT_NAMESPACE: &str = "mdm";

/// Error returned when parsing an invalid [`RegistryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryKeyError {
    /// Input was empty or whitespace only.
    #[error("registry key cannot be empty")]
    Empty,
    /// Namespace part was empty, too long, or used illegal characters.
    #[error("invalid registry key namespace `{0}` (allowed: a-z0-9_.-, max 64)")]
    Namespace(String),
    /// Path part was empty, too long, or used illegal characters.
    #[error("invalid registry key path `{0}` (allowed: a-z0-9_./-, max 128)")]
    Path(String),
}

/// A namespaced key of the form `namespace:path`.
///
/// Ordering is lexical by `(namespace, path)` and is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryKey {
    namespace: String,
    path: String,
}

impl RegistryKey {
    /// Parse a registry key, using [`DEFAULT_NAMESPACE`] when none is given.
    pub fn parse(input: &str) -> Result<Self, RegistryKeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryKeyError::Empty);
        }

        let (namespace, path) = input
            .split_once(':')
            .unwrap_or((DEFAULT_NAMESPACE, input));

        if !is_valid_segment(namespace, 64, false) {
            return Err(RegistryKeyError::Namespace(namespace.to_string()));
        }
        if !is_valid_segment(path, 128, true) {
            return Err(RegistryKeyError::Path(path.to_string()));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Build a key in the default namespace from a built-in literal.
    ///
    /// # Panics
    ///
    /// Panics, at the caller's location, when `path` is not a valid key.
    /// Use [`RegistryKey::parse`] for anything read from data.
    #[track_caller]
    pub fn mdm(path: &str) -> Self {
        match Self::parse(path) {
            Ok(key) => key,
            Err(err) => panic!("invalid built-in registry key `{path}`: {err}"),
        }
    }

    /// Registry key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registry key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_valid_segment(segment: &str, max_len: usize, allow_slash: bool) -> bool {
    !segment.is_empty()
        && segment.len() <= max_len
        && segment.chars().all(|c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.') || (allow_slash && c == '/')
        })
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for RegistryKey {
    type Err = RegistryKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RegistryKey {
    type Error = RegistryKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegistryKey> for String {
    fn from(key: RegistryKey) -> Self {
        key.to_string()
    }
}
