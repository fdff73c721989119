//! Conch Env: typed shell environment
//!
//! The variable store behind the conch shell. Values are held typed (path
//! lists, token sets, booleans, integers) and converted on every write by a
//! per-variable converter. Child processes get a detyped string view, computed
//! lazily and cached until the next change.
//!
//! Also included:
//!
//! - scoped overrides ([`Env::swap`]) restored when the guard drops
//! - prompt template rendering ([`prompt`])
//! - `$PATH` / `$PATHEXT` command resolution ([`locate_binary`])
//! - loading a static JSON config ([`load_static_config`])
//!
//! ## Example
//!
//! ```
//! use conch_env::Env;
//!
//! let mut env = Env::new();
//! env.set("PATH", serde_json::json!(["/usr/local/bin", "/usr/bin"])).unwrap();
//! env.get_path_mut("PATH").unwrap().push("/opt/bin".into());
//!
//! let paths = env.get_paths("PATH").unwrap();
//! assert_eq!(paths.len(), 3);
//! # #[cfg(unix)]
//! assert_eq!(env.detype()["PATH"], "/usr/local/bin:/usr/bin:/opt/bin");
//! ```

mod config;
mod env;
mod error;
mod locate;
mod registry;
mod value;

pub mod prompt;

pub use config::{apply_static_config, default_config_path, load_static_config, read_static_config};
pub use env::{Env, SwapGuard};
pub use error::{ConfigError, EnvError};
pub use locate::{BinaryLocator, locate_binary};
pub use registry::{
    Converter, DEFAULT_HISTSIZE, DEFAULT_PROMPT, DefaultFn, DetypeFn, EnsureFn, Registry,
};
pub use value::{EnvPath, EnvValue, PATH_SEPARATOR, TokenSet};
