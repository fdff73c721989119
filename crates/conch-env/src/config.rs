//! Static JSON configuration.
//!
//! A config file is a JSON object. Its `env` member, if present, is an object
//! of variables to seed the environment with:
//!
//! ```json
//! { "env": { "HISTSIZE": 1000, "PATH": ["/usr/local/bin", "/usr/bin"] } }
//! ```

use std::path::{Path, PathBuf};

use serde_json::{Map, Value as Json};

use crate::env::Env;
use crate::error::{ConfigError, EnvError};
use crate::registry::describe;

/// Read the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, is not JSON, or its
/// top level is not an object.
pub fn read_static_config(path: impl AsRef<Path>) -> Result<Map<String, Json>, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    match serde_json::from_str(&text)? {
        Json::Object(conf) => Ok(conf),
        other => Err(ConfigError::NotAnObject(describe_kind(&other))),
    }
}

/// Read the config file at `path` and record the outcome in `$LOADED_CONFIG`.
///
/// Failures are logged and yield an empty map.
pub fn load_static_config(env: &mut Env, path: impl AsRef<Path>) -> Map<String, Json> {
    let path = path.as_ref();
    let (conf, loaded) = match read_static_config(path) {
        Ok(conf) => (conf, true),
        Err(e) => {
            tracing::warn!("could not load config {}: {}", path.display(), e);
            (Map::new(), false)
        }
    };
    if let Err(e) = env.set("LOADED_CONFIG", loaded) {
        tracing::warn!("could not record LOADED_CONFIG: {}", e);
    }
    conf
}

/// Set every variable in the `env` member of `conf`.
///
/// A missing `env` member is not an error. A non-object `env` is logged and
/// skipped.
///
/// # Errors
///
/// Returns the first [`EnvError::Coerce`]; variables applied before it keep
/// their new values.
pub fn apply_static_config(env: &mut Env, conf: &Map<String, Json>) -> Result<(), EnvError> {
    match conf.get("env") {
        None => Ok(()),
        Some(Json::Object(vars)) => env.update(vars.iter().map(|(k, v)| (k.as_str(), v.clone()))),
        Some(other) => {
            tracing::warn!("ignoring config env: expected object, found {}", describe(other));
            Ok(())
        }
    }
}

/// The config file named by `$CONCH_CONFIG`.
pub fn default_config_path(env: &Env) -> PathBuf {
    PathBuf::from(env.get_str("CONCH_CONFIG").unwrap_or_default())
}

fn describe_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
