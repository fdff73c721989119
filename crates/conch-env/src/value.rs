//! Typed values held by the environment store.

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// Separator used when joining path lists into a single string.
pub const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// A value stored in an [`Env`](crate::Env).
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    /// Plain string
    Str(String),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Ordered list of paths
    Path(EnvPath),
    /// Set of normalized tokens
    Tokens(TokenSet),
    /// Anything else an undeclared variable was given (arrays, objects, null)
    Json(serde_json::Value),
}

impl EnvValue {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            EnvValue::Str(_) => "string",
            EnvValue::Int(_) => "integer",
            EnvValue::Float(_) => "float",
            EnvValue::Bool(_) => "boolean",
            EnvValue::Path(_) => "path list",
            EnvValue::Tokens(_) => "token set",
            EnvValue::Json(_) => "json",
        }
    }

    /// Returns the string if this is a [`EnvValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EnvValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the flag if this is a [`EnvValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EnvValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`EnvValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            EnvValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the path list if this is a [`EnvValue::Path`].
    pub fn as_path(&self) -> Option<&EnvPath> {
        match self {
            EnvValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable access to the path list if this is a [`EnvValue::Path`].
    pub fn as_path_mut(&mut self) -> Option<&mut EnvPath> {
        match self {
            EnvValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the token set if this is a [`EnvValue::Tokens`].
    pub fn as_tokens(&self) -> Option<&TokenSet> {
        match self {
            EnvValue::Tokens(t) => Some(t),
            _ => None,
        }
    }
}

impl From<&str> for EnvValue {
    fn from(s: &str) -> Self {
        EnvValue::Str(s.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(s: String) -> Self {
        EnvValue::Str(s)
    }
}

impl From<EnvPath> for EnvValue {
    fn from(p: EnvPath) -> Self {
        EnvValue::Path(p)
    }
}

impl From<TokenSet> for EnvValue {
    fn from(t: TokenSet) -> Self {
        EnvValue::Tokens(t)
    }
}

/// An ordered list of filesystem paths, such as `$PATH`.
///
/// Derefs to the underlying `Vec<String>` so elements can be edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvPath {
    paths: Vec<String>,
}

impl EnvPath {
    /// Create a path list from already-split elements, kept verbatim.
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    /// Split a combined string on [`PATH_SEPARATOR`].
    ///
    /// The empty string is the empty list.
    pub fn from_joined(s: &str) -> Self {
        if s.is_empty() {
            return Self::default();
        }
        Self {
            paths: s.split(PATH_SEPARATOR).map(str::to_string).collect(),
        }
    }

    /// Join the elements with [`PATH_SEPARATOR`].
    pub fn join(&self) -> String {
        let sep = PATH_SEPARATOR.to_string();
        self.paths.join(sep.as_str())
    }

    /// The elements as a slice.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Consume the list, returning its elements.
    pub fn into_inner(self) -> Vec<String> {
        self.paths
    }
}

impl Deref for EnvPath {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.paths
    }
}

impl DerefMut for EnvPath {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.paths
    }
}

impl<S: Into<String>> FromIterator<S> for EnvPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A set of comma-separated tokens, such as `$HISTCONTROL`.
///
/// Tokens are trimmed and lower-cased; empty tokens are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSet {
    tokens: BTreeSet<String>,
}

impl TokenSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated string.
    pub fn parse(s: &str) -> Self {
        s.split(',').collect()
    }

    /// Add a token, normalizing it first. Returns false for empty tokens or
    /// tokens already present.
    pub fn insert(&mut self, token: &str) -> bool {
        let token = normalize(token);
        if token.is_empty() {
            return false;
        }
        self.tokens.insert(token)
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(&normalize(token))
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the set has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over the tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Sorted tokens joined with commas.
    pub fn to_csv(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }
}

impl<'a> FromIterator<&'a str> for TokenSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = TokenSet::new();
        for token in iter {
            set.insert(token);
        }
        set
    }
}

fn normalize(token: &str) -> String {
    token.trim().to_lowercase()
}
