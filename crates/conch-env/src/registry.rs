//! Per-variable type converters.
//!
//! Every variable name maps to a [`Converter`]: an ensurer that turns raw JSON
//! input into the canonical [`EnvValue`], a detyper that turns it back into an
//! environment string, and an optional default used when the variable is unset.
//!
//! Lookup order is exact name, then suffix rules in registration order, then
//! the identity converter.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::error::EnvError;
use crate::value::{EnvPath, EnvValue, TokenSet};

/// Converts raw input into a typed value. Receives the variable name for error
/// reporting.
pub type EnsureFn = fn(&str, Json) -> Result<EnvValue, EnvError>;

/// Converts a typed value into its environment string, or `None` to omit it.
pub type DetypeFn = fn(&EnvValue) -> Option<String>;

/// Produces the value of an unset variable.
pub type DefaultFn = fn() -> EnvValue;

/// Converter triple for one variable or family of variables.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    /// Raw → typed
    pub ensure: EnsureFn,
    /// Typed → string
    pub detype: DetypeFn,
    /// Value reported for the variable while it is unset
    pub default: Option<DefaultFn>,
}

impl Converter {
    /// Identity conversion used for undeclared names.
    pub const IDENTITY: Converter = Converter {
        ensure: ensure_identity,
        detype: detype_scalar,
        default: None,
    };

    /// Ordered path list split on the platform separator.
    pub const PATH: Converter = Converter {
        ensure: ensure_path,
        detype: detype_path,
        default: None,
    };

    /// Path list with upper-cased elements, for executable extensions.
    pub const UPPER_PATH: Converter = Converter {
        ensure: ensure_upper_path,
        detype: detype_path,
        default: None,
    };

    /// Comma-separated token set.
    pub const TOKENS: Converter = Converter {
        ensure: ensure_tokens,
        detype: detype_tokens,
        default: None,
    };

    /// Boolean flag.
    pub const BOOL: Converter = Converter {
        ensure: ensure_bool,
        detype: detype_bool,
        default: None,
    };

    /// Integer.
    pub const INT: Converter = Converter {
        ensure: ensure_int,
        detype: detype_scalar,
        default: None,
    };

    /// String.
    pub const STRING: Converter = Converter {
        ensure: ensure_string,
        detype: detype_scalar,
        default: None,
    };

    /// Same converter with a default value.
    pub const fn with_default(self, default: DefaultFn) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

/// Default prompt template.
pub const DEFAULT_PROMPT: &str = "{user}@{hostname}:{cwd}{prompt_end} ";

/// Default history size.
pub const DEFAULT_HISTSIZE: i64 = 8128;

/// Mapping from variable names to converters.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    exact: HashMap<String, Converter>,
    suffixes: Vec<(String, Converter)>,
}

impl Registry {
    /// An empty registry: every name uses [`Converter::IDENTITY`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// The registry used by [`Env::new`](crate::Env::new).
    pub fn builtin() -> Self {
        Self::empty()
            .declare_suffix("PATH", Converter::PATH)
            .declare_suffix("DIRS", Converter::PATH)
            .declare("PATHEXT", Converter::UPPER_PATH.with_default(default_pathext))
            .declare(
                "HISTCONTROL",
                Converter::TOKENS.with_default(|| EnvValue::Tokens(TokenSet::new())),
            )
            .declare("HISTSIZE", Converter::INT.with_default(|| EnvValue::Int(DEFAULT_HISTSIZE)))
            .declare("LOADED_CONFIG", Converter::BOOL.with_default(|| EnvValue::Bool(false)))
            .declare("SHOW_TRACEBACK", Converter::BOOL.with_default(|| EnvValue::Bool(false)))
            .declare(
                "PROMPT",
                Converter::STRING.with_default(|| EnvValue::Str(DEFAULT_PROMPT.to_string())),
            )
            .declare("CONCH_CONFIG", Converter::STRING.with_default(default_config_file))
    }

    /// Declare a converter for an exact variable name.
    pub fn declare(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.exact.insert(name.into(), converter);
        self
    }

    /// Declare a converter for every name ending in `suffix`.
    pub fn declare_suffix(mut self, suffix: impl Into<String>, converter: Converter) -> Self {
        self.suffixes.push((suffix.into(), converter));
        self
    }

    /// The converter in effect for `name`.
    pub fn get(&self, name: &str) -> Converter {
        if let Some(conv) = self.exact.get(name) {
            return *conv;
        }
        self.suffixes
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix.as_str()))
            .map(|(_, conv)| *conv)
            .unwrap_or(Converter::IDENTITY)
    }

    /// Run the ensurer for `name`.
    pub fn ensure(&self, name: &str, raw: Json) -> Result<EnvValue, EnvError> {
        (self.get(name).ensure)(name, raw)
    }

    /// Run the detyper for `name`.
    pub fn detype(&self, name: &str, value: &EnvValue) -> Option<String> {
        (self.get(name).detype)(value)
    }

    /// The default value for `name`, if one is declared.
    pub fn default_for(&self, name: &str) -> Option<EnvValue> {
        self.get(name).default.map(|f| f())
    }
}

fn coerce_error(name: &str, expected: &'static str, found: &Json) -> EnvError {
    EnvError::Coerce {
        name: name.to_string(),
        expected,
        found: describe(found),
    }
}

/// Short description of a raw value for error messages.
pub(crate) fn describe(raw: &Json) -> String {
    match raw {
        Json::Null => "null".to_string(),
        Json::Bool(b) => format!("boolean {b}"),
        Json::Number(n) => format!("number {n}"),
        Json::String(s) => format!("string {s:?}"),
        Json::Array(a) => format!("array of {} items", a.len()),
        Json::Object(_) => "object".to_string(),
    }
}

fn ensure_identity(_name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    Ok(match raw {
        Json::String(s) => EnvValue::Str(s),
        Json::Bool(b) => EnvValue::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => EnvValue::Int(i),
            None => match n.as_f64() {
                Some(f) => EnvValue::Float(f),
                None => EnvValue::Json(Json::Number(n)),
            },
        },
        other => EnvValue::Json(other),
    })
}

fn ensure_string(name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    match raw {
        Json::String(s) => Ok(EnvValue::Str(s)),
        Json::Null => Ok(EnvValue::Str(String::new())),
        Json::Bool(b) => Ok(EnvValue::Str(b.to_string())),
        Json::Number(n) => Ok(EnvValue::Str(n.to_string())),
        other => Err(coerce_error(name, "string", &other)),
    }
}

fn string_items(
    name: &str,
    expected: &'static str,
    items: Vec<Json>,
) -> Result<Vec<String>, EnvError> {
    items
        .into_iter()
        .map(|item| match item {
            Json::String(s) => Ok(s),
            other => Err(coerce_error(name, expected, &other)),
        })
        .collect()
}

fn ensure_path(name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    match raw {
        Json::Null => Ok(EnvPath::default().into()),
        Json::String(s) => Ok(EnvPath::from_joined(&s).into()),
        Json::Array(items) => Ok(EnvPath::new(string_items(name, "path list", items)?).into()),
        other => Err(coerce_error(name, "path list", &other)),
    }
}

fn ensure_upper_path(name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    let mut value = ensure_path(name, raw)?;
    if let Some(path) = value.as_path_mut() {
        for element in path.iter_mut() {
            *element = element.to_uppercase();
        }
    }
    Ok(value)
}

fn ensure_tokens(name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    match raw {
        Json::Null => Ok(TokenSet::new().into()),
        Json::String(s) => Ok(TokenSet::parse(&s).into()),
        Json::Array(items) => {
            let items = string_items(name, "token set", items)?;
            Ok(items.iter().map(String::as_str).collect::<TokenSet>().into())
        }
        other => Err(coerce_error(name, "token set", &other)),
    }
}

/// Strings that read as false, compared case-insensitively.
const FALSE_STRINGS: &[&str] = &["", "0", "false", "no", "off", "n", "f"];

fn ensure_bool(name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    match raw {
        Json::Null => Ok(EnvValue::Bool(false)),
        Json::Bool(b) => Ok(EnvValue::Bool(b)),
        Json::Number(n) => Ok(EnvValue::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        Json::String(s) => {
            let lowered = s.trim().to_lowercase();
            Ok(EnvValue::Bool(!FALSE_STRINGS.contains(&lowered.as_str())))
        }
        other => Err(coerce_error(name, "boolean", &other)),
    }
}

fn ensure_int(name: &str, raw: Json) -> Result<EnvValue, EnvError> {
    let parsed = match &raw {
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(EnvValue::Int)
        .ok_or_else(|| coerce_error(name, "integer", &raw))
}

fn detype_scalar(value: &EnvValue) -> Option<String> {
    match value {
        EnvValue::Str(s) => Some(s.clone()),
        EnvValue::Int(i) => Some(i.to_string()),
        EnvValue::Float(f) => Some(f.to_string()),
        EnvValue::Bool(_) => detype_bool(value),
        EnvValue::Path(p) => Some(p.join()),
        EnvValue::Tokens(t) => Some(t.to_csv()),
        EnvValue::Json(_) => None,
    }
}

fn detype_path(value: &EnvValue) -> Option<String> {
    value.as_path().map(EnvPath::join)
}

fn detype_tokens(value: &EnvValue) -> Option<String> {
    value.as_tokens().map(TokenSet::to_csv)
}

fn detype_bool(value: &EnvValue) -> Option<String> {
    value
        .as_bool()
        .map(|b| if b { "1".to_string() } else { String::new() })
}

fn default_pathext() -> EnvValue {
    if cfg!(windows) {
        [".COM", ".EXE", ".BAT", ".CMD"].into_iter().collect::<EnvPath>().into()
    } else {
        EnvPath::default().into()
    }
}

fn default_config_file() -> EnvValue {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            format!("{home}/.config")
        });
    EnvValue::Str(format!("{config_home}/conch/config.json"))
}
