//! Standard prompt fields.

use std::path::{Component, Path};

use anyhow::Context as _;

use super::PromptFields;
use crate::env::Env;

/// The fields available to `$PROMPT` by default:
///
/// - `user` - `$USER` (or `$USERNAME`)
/// - `hostname` - `$HOSTNAME`, falling back to `/etc/hostname`
/// - `cwd` - current directory with `$HOME` shown as `~`
/// - `short_cwd` - like `cwd`, with every directory but the last shortened to
///   its first character
/// - `prompt_end` - `#` for root, `$` otherwise
/// - `env_name` - `(name) ` for the active `$VIRTUAL_ENV`, empty otherwise
///
/// The mapping also carries a snapshot of `env` for `{$VAR}` fields. Values
/// read from `env` are captured now; `cwd`, `short_cwd` and `hostname` are
/// computed on every render.
pub fn default_fields(env: &Env) -> PromptFields {
    let mut fields = PromptFields::new();

    if let Some(user) = env.get_str("USER").or_else(|| env.get_str("USERNAME")) {
        fields = fields.literal("user", user);
    }

    let hostname = env.get_str("HOSTNAME");
    let home = env.get_str("HOME");
    let cwd_home = home.clone();
    let virtual_env = env.get_str("VIRTUAL_ENV");

    fields
        .producer("hostname", move || match &hostname {
            Some(name) => Ok(Some(name.clone())),
            None => read_hostname().map(Some),
        })
        .producer("cwd", move || {
            let cwd = std::env::current_dir().context("reading current directory")?;
            Ok(Some(collapse_home(&cwd, cwd_home.as_deref())))
        })
        .producer("short_cwd", move || {
            let cwd = std::env::current_dir().context("reading current directory")?;
            Ok(Some(short_cwd(&collapse_home(&cwd, home.as_deref()))))
        })
        .literal("prompt_end", if is_root() { "#" } else { "$" })
        .producer("env_name", move || {
            Ok(virtual_env
                .as_deref()
                .and_then(|venv| Path::new(venv).file_name())
                .map(|name| format!("({}) ", name.to_string_lossy())))
        })
        .with_env(env)
}

/// Display `path` with a leading `home` replaced by `~`.
pub fn collapse_home(path: &Path, home: Option<&str>) -> String {
    let home = home.filter(|h| !h.is_empty()).map(Path::new);
    match home.and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~{}{}", std::path::MAIN_SEPARATOR, rest.display()),
        None => path.display().to_string(),
    }
}

/// Shorten every component of `path` except the last to its first character.
pub fn short_cwd(path: &str) -> String {
    let components: Vec<Component<'_>> = Path::new(path).components().collect();
    let Some((last, parents)) = components.split_last() else {
        return path.to_string();
    };

    let mut out = String::new();
    for component in parents {
        match component {
            Component::RootDir => out.push(std::path::MAIN_SEPARATOR),
            other => {
                let name = other.as_os_str().to_string_lossy();
                if let Some(first) = name.chars().next() {
                    out.push(first);
                }
                out.push(std::path::MAIN_SEPARATOR);
            }
        }
    }
    out.push_str(&last.as_os_str().to_string_lossy());
    out
}

fn read_hostname() -> anyhow::Result<String> {
    let name = std::fs::read_to_string("/etc/hostname").context("reading /etc/hostname")?;
    Ok(name.trim().to_string())
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}
