//! On-disk persistence for the configuration tree
//!
//! One JSON file, `~/.upscale_server/config.json` by default. The directory
//! is created before every read and write.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use super::defaults::{builtin_defaults, APP_DIR_NAME, CONFIG_FILE_NAME};
use super::error::{ConfigError, Diagnostic, DiagnosticKind};
use super::value::{tree_from_json, tree_to_json, ConfigTree};

/// Where a loaded tree came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    /// Built-in defaults (file absent or unreadable)
    Defaults,
    /// Parsed from the configuration file
    File,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    pub path: PathBuf,

    /// SHA-256 digest of raw file bytes (None when defaults were used)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Result of [`ConfigStore::load`]
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Raw tree as found on disk, not yet merged with defaults
    pub tree: ConfigTree,
    pub source: ConfigSource,
    /// Set when the file could not be used and defaults were substituted,
    /// or when writing the initial file failed
    pub diagnostic: Option<Diagnostic>,
}

/// Reads and writes the configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at `~/.upscale_server`, or `./.upscale_server` when the home
    /// directory is unknown
    pub fn default_location() -> Self {
        match Self::default_dir() {
            Ok(dir) => Self::new(dir),
            Err(e) => {
                warn!(error = %e, "Falling back to the current directory for configuration");
                Self::new(PathBuf::from(".").join(APP_DIR_NAME))
            }
        }
    }

    /// The per-user configuration directory
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(APP_DIR_NAME))
    }

    /// Directory holding the file; relative settings paths resolve against it
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the configuration file
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.dir).map_err(|e| ConfigError::io(&self.dir, e))
    }

    /// Read and parse the file. `Ok(None)` when it does not exist.
    pub fn read(&self) -> Result<Option<(ConfigTree, String)>, ConfigError> {
        self.ensure_dir()?;
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|e| ConfigError::io(&path, e))?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let tree = parse_tree(&bytes)?;
        Ok(Some((tree, digest)))
    }

    /// Serialize and write the whole tree
    pub fn write(&self, tree: &ConfigTree) -> Result<(), ConfigError> {
        self.ensure_dir()?;
        let path = self.path();
        write_tree(&path, tree)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Load the raw tree, never failing.
    ///
    /// - file present and valid: its contents
    /// - file present but unusable: a fresh copy of the defaults, plus a diagnostic
    /// - file absent: the defaults, which are also written to disk
    pub fn load(&self) -> LoadedConfig {
        let path = self.path();
        match self.read() {
            Ok(Some((tree, digest))) => {
                info!(path = %path.display(), digest = %digest, "Loaded configuration");
                LoadedConfig {
                    tree,
                    source: ConfigSource {
                        origin: ConfigOrigin::File,
                        path,
                        digest: Some(digest),
                    },
                    diagnostic: None,
                }
            }
            Ok(None) => {
                info!(path = %path.display(), "Config file not found, writing defaults");
                let tree = builtin_defaults();
                let diagnostic = self.write(&tree).err().map(|e| {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to write default configuration"
                    );
                    Diagnostic::new(DiagnosticKind::PersistFailure, &path, &e)
                });
                LoadedConfig {
                    tree,
                    source: ConfigSource {
                        origin: ConfigOrigin::Defaults,
                        path,
                        digest: None,
                    },
                    diagnostic,
                }
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load configuration, using defaults"
                );
                let diagnostic = Diagnostic::new(DiagnosticKind::ParseFailure, &path, &e);
                LoadedConfig {
                    tree: builtin_defaults(),
                    source: ConfigSource {
                        origin: ConfigOrigin::Defaults,
                        path,
                        digest: None,
                    },
                    diagnostic: Some(diagnostic),
                }
            }
        }
    }
}

/// Parse raw bytes as a JSON object tree
pub fn parse_tree(bytes: &[u8]) -> Result<ConfigTree, ConfigError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e)))?;
    match value {
        Value::Object(map) => tree_from_json(map, ""),
        _ => Err(ConfigError::Parse(
            "configuration root must be a JSON object".to_string(),
        )),
    }
}

/// Pretty JSON with 4-space indentation; non-ASCII text is written as-is
pub fn to_pretty_json(tree: &ConfigTree) -> Result<String, ConfigError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    tree_to_json(tree).serialize(&mut serializer)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))
}

/// Write a tree to an arbitrary file
pub fn write_tree(path: &Path, tree: &ConfigTree) -> Result<(), ConfigError> {
    let json = to_pretty_json(tree)?;
    fs::write(path, json).map_err(|e| ConfigError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::value::ConfigValue;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("nested").join("cfg"));

        let loaded = store.load();

        assert_eq!(loaded.source.origin, ConfigOrigin::Defaults);
        assert!(loaded.diagnostic.is_none());
        assert_eq!(loaded.tree, builtin_defaults());
        assert!(store.path().exists());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path());
        fs::write(store.path(), "{ not json").unwrap();

        let loaded = store.load();

        assert_eq!(loaded.tree, builtin_defaults());
        let diagnostic = loaded.diagnostic.expect("diagnostic expected");
        assert_eq!(diagnostic.kind, DiagnosticKind::ParseFailure);
        // The broken file is left alone
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_non_object_root_is_parse_failure() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path());
        fs::write(store.path(), "[1, 2]").unwrap();

        let loaded = store.load();
        assert_eq!(loaded.source.origin, ConfigOrigin::Defaults);
        assert!(loaded.diagnostic.unwrap().message.contains("JSON object"));
    }

    #[test]
    fn test_partial_file_loaded_raw() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path());
        fs::write(store.path(), r#"{"server": {"port": 9000}}"#).unwrap();

        let loaded = store.load();

        assert_eq!(loaded.source.origin, ConfigOrigin::File);
        assert_eq!(loaded.source.digest.as_ref().map(String::len), Some(64));
        let server = loaded.tree["server"].as_table().unwrap();
        assert_eq!(server.len(), 1);
        assert_eq!(server["port"], ConfigValue::Integer(9000));
    }

    #[test]
    fn test_pretty_json_format() {
        let mut tree = ConfigTree::new();
        tree.insert("gui".to_string(), ConfigValue::from("thème sombre"));

        let json = to_pretty_json(&tree).unwrap();

        assert_eq!(json, "{\n    \"gui\": \"thème sombre\"\n}\n");
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path());
        let tree = builtin_defaults();

        store.write(&tree).unwrap();
        let (read_back, _) = store.read().unwrap().unwrap();

        assert_eq!(read_back, tree);
    }
}
