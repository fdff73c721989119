//! Resolving command names to executables on `$PATH`.
//!
//! On platforms where executables are identified by extension (windows), each
//! directory is searched for `name` plus every entry of `$PATHEXT`, matching
//! file names case-insensitively. Elsewhere, `dir/name` must be a regular file
//! with an execute bit.

use std::fs;
use std::path::{Path, PathBuf};

use crate::env::Env;

/// Search settings for [`locate_binary`].
#[derive(Debug, Clone, Default)]
pub struct BinaryLocator {
    dirs: Vec<String>,
    /// `Some` selects extension matching.
    extensions: Option<Vec<String>>,
}

impl BinaryLocator {
    /// Build a locator from `$PATH`, and `$PATHEXT` on windows.
    pub fn from_env(env: &Env) -> Self {
        let dirs = env
            .get_paths("PATH")
            .map(|p| p.into_inner())
            .unwrap_or_default();
        let extensions = cfg!(windows).then(|| {
            env.get_paths("PATHEXT")
                .map(|p| p.into_inner())
                .unwrap_or_default()
        });
        Self { dirs, extensions }
    }

    /// Build a locator searching `dirs` without extension matching.
    pub fn new(dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            extensions: None,
        }
    }

    /// Match names against `extensions` (such as `.EXE`), in order.
    pub fn with_extensions(
        mut self,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.into().to_uppercase())
                .collect(),
        );
        self
    }

    /// Find the first executable called `name`.
    ///
    /// Names containing a path separator are checked as given and not
    /// searched for. Returns `None` when nothing matches.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        if has_separator(name) {
            return self.check_in(Path::new(name).parent()?, file_name(name)?);
        }
        self.dirs
            .iter()
            .filter(|dir| !dir.is_empty())
            .find_map(|dir| self.check_in(Path::new(dir), name))
    }

    fn check_in(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        match &self.extensions {
            Some(exts) => find_with_extensions(dir, name, exts),
            None => {
                let candidate = dir.join(name);
                is_executable(&candidate).then_some(candidate)
            }
        }
    }
}

/// Resolve `name` using the environment's `$PATH` (and `$PATHEXT` on
/// windows).
pub fn locate_binary(env: &Env, name: &str) -> Option<PathBuf> {
    BinaryLocator::from_env(env).locate(name)
}

fn has_separator(name: &str) -> bool {
    name.contains('/') || (cfg!(windows) && name.contains('\\'))
}

fn file_name(name: &str) -> Option<&str> {
    Path::new(name).file_name()?.to_str()
}

fn find_with_extensions(dir: &Path, name: &str, exts: &[String]) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("skipping {}: {}", dir.display(), e);
            return None;
        }
    };
    let files: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| !t.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();

    let upper = name.to_uppercase();
    let candidates: Vec<String> = if exts.iter().any(|ext| upper.ends_with(ext.as_str())) {
        vec![upper]
    } else {
        exts.iter().map(|ext| format!("{upper}{ext}")).collect()
    };

    candidates.iter().find_map(|candidate| {
        files
            .iter()
            .find(|file| file.to_uppercase() == *candidate)
            .map(|file| dir.join(file))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
