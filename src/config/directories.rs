//! Working directory resolution
//!
//! Paths come from the `*_directory` settings under `processing` and
//! `storage`. Relative paths are resolved against a caller-supplied base
//! directory; the manager uses the process working directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::defaults::{builtin_defaults, keys};
use super::error::ConfigError;
use super::path::lookup;
use super::value::{ConfigTree, ConfigValue};

/// Categories whose `*_directory` settings are provisioned at startup
pub const PROVISIONED_CATEGORIES: [&str; 2] = ["processing", "storage"];

const DIRECTORY_SUFFIX: &str = "_directory";

/// The work/output/temp directory triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingDirectories {
    pub work: PathBuf,
    pub output: PathBuf,
    pub temp: PathBuf,
}

impl WorkingDirectories {
    /// Derive the paths from a tree without touching the filesystem
    pub fn from_tree(tree: &ConfigTree, base_dir: &Path) -> Self {
        Self {
            work: setting_path(tree, keys::PROCESSING_WORK_DIRECTORY, base_dir),
            output: setting_path(tree, keys::PROCESSING_OUTPUT_DIRECTORY, base_dir),
            temp: setting_path(tree, keys::PROCESSING_TEMP_DIRECTORY, base_dir),
        }
    }

    /// `(name, path)` pairs in a fixed order
    pub fn entries(&self) -> [(&'static str, &Path); 3] {
        [
            ("work", self.work.as_path()),
            ("output", self.output.as_path()),
            ("temp", self.temp.as_path()),
        ]
    }

    /// Create every directory that does not exist yet, parents included
    pub fn create_all(&self) -> Result<(), ConfigError> {
        for (name, path) in self.entries() {
            create_dir(name, path)?;
        }
        Ok(())
    }
}

/// Every non-empty `*_directory` string setting under
/// [`PROVISIONED_CATEGORIES`], keyed by key path and resolved against
/// `base_dir`
pub fn configured_directories(tree: &ConfigTree, base_dir: &Path) -> BTreeMap<String, PathBuf> {
    let mut dirs = BTreeMap::new();
    for category in PROVISIONED_CATEGORIES {
        let Some(ConfigValue::Table(table)) = tree.get(category) else {
            continue;
        };
        for (key, value) in table {
            if !key.ends_with(DIRECTORY_SUFFIX) {
                continue;
            }
            match value.as_str().map(str::trim) {
                Some(raw) if !raw.is_empty() => {
                    dirs.insert(format!("{}.{}", category, key), resolve_path(base_dir, raw));
                }
                _ => debug!(category, key = %key, "Skipping unset directory setting"),
            }
        }
    }
    dirs
}

/// Create every directory in `dirs` that does not exist yet
pub fn create_directories(dirs: &BTreeMap<String, PathBuf>) -> Result<(), ConfigError> {
    for (key_path, path) in dirs {
        create_dir(key_path, path)?;
    }
    Ok(())
}

fn create_dir(name: &str, path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        debug!(dir = name, path = %path.display(), "Directory exists");
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| ConfigError::io(path, e))?;
    info!(dir = name, path = %path.display(), "Created directory");
    Ok(())
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// joined onto `base_dir`
pub fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Read a string setting as a path, falling back to the built-in default
/// when the value is missing or not a string
fn setting_path(tree: &ConfigTree, key_path: &str, base_dir: &Path) -> PathBuf {
    if let Some(raw) = lookup(tree, key_path).found().and_then(|v| v.as_str()) {
        return resolve_path(base_dir, raw);
    }
    let defaults = builtin_defaults();
    let raw = lookup(&defaults, key_path)
        .found()
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    resolve_path(base_dir, raw)
}
