//! Error types for the environment store and config loader.

use thiserror::Error;

/// Errors surfaced by [`Env`](crate::Env) operations.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The variable is not set and has no registered default.
    #[error("variable not found: {0}")]
    NotFound(String),
    /// A raw value could not be converted by the variable's ensurer.
    #[error("cannot convert {found} to {expected} for ${name}")]
    Coerce {
        /// Variable name
        name: String,
        /// The type the ensurer produces
        expected: &'static str,
        /// Short description of the rejected input
        found: String,
    },
}

/// Errors from reading a static config file.
///
/// Only [`read_static_config`](crate::read_static_config) returns these;
/// [`load_static_config`](crate::load_static_config) logs and discards them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The file parsed, but the top level is not an object
    #[error("config must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}
