//! The configuration manager
//!
//! One `ConfigManager` is built at startup and shared by reference with every
//! component that reads settings. The tree and the write-back to disk sit
//! behind a single mutex, so concurrent `set` calls serialize and the file
//! always holds the last completed mutation.
//!
//! Relative paths in settings resolve against the manager's base directory,
//! which is the process working directory unless the caller picks another.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use super::defaults::builtin_defaults;
use super::directories::{configured_directories, create_directories, WorkingDirectories};
use super::error::{ConfigError, Diagnostic, DiagnosticKind};
use super::merge::deep_merge;
use super::path::{assign, lookup};
use super::settings::{section, RealEsrganSettings, ServerSettings};
use super::store::{parse_tree, write_tree, ConfigSource, ConfigStore};
use super::validate::{validate_tree, ValidationReport};
use super::value::{ensure_tree_finite, ConfigTree, ConfigValue};

/// Oldest diagnostics are dropped past this many
pub const MAX_DIAGNOSTICS: usize = 64;

struct State {
    tree: ConfigTree,
    diagnostics: Vec<Diagnostic>,
}

impl State {
    fn record(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.len() >= MAX_DIAGNOSTICS {
            self.diagnostics.remove(0);
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Owns the merged configuration tree and its backing file
pub struct ConfigManager {
    store: ConfigStore,
    source: ConfigSource,
    base_dir: PathBuf,
    state: Mutex<State>,
}

impl ConfigManager {
    /// Open the configuration at the default per-user location
    pub fn load() -> Self {
        Self::open(ConfigStore::default_location())
    }

    /// Open the configuration held by `store`, merging it over the defaults
    pub fn open(store: ConfigStore) -> Self {
        let loaded = store.load();

        let mut tree = builtin_defaults();
        deep_merge(&mut tree, loaded.tree);

        Self {
            store,
            source: loaded.source,
            base_dir: working_dir(),
            state: Mutex::new(State {
                tree,
                diagnostics: loaded.diagnostic.into_iter().collect(),
            }),
        }
    }

    /// Resolve relative paths in settings against `base_dir` instead of the
    /// process working directory
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Where the tree was loaded from
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Directory holding the configuration file
    pub fn config_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Directory that relative paths in settings resolve against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Recovered failures (parse, persist) in the order they happened.
    /// At most [`MAX_DIAGNOSTICS`] are kept.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().diagnostics.clone()
    }

    /// Remove and return the recorded diagnostics
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.lock().diagnostics)
    }

    /// Copy of the whole tree
    pub fn snapshot(&self) -> ConfigTree {
        self.lock().tree.clone()
    }

    /// Value at `key_path`, or `None` when any segment is missing
    pub fn lookup(&self, key_path: &str) -> Option<ConfigValue> {
        lookup(&self.lock().tree, key_path).found().cloned()
    }

    /// Value at `key_path`, or `default` when it cannot be resolved
    pub fn get(&self, key_path: &str, default: impl Into<ConfigValue>) -> ConfigValue {
        self.lookup(key_path).unwrap_or_else(|| default.into())
    }

    pub fn get_str(&self, key_path: &str) -> Option<String> {
        self.lookup(key_path).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn get_i64(&self, key_path: &str) -> Option<i64> {
        self.lookup(key_path).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key_path: &str) -> Option<bool> {
        self.lookup(key_path).and_then(|v| v.as_bool())
    }

    pub fn get_f64(&self, key_path: &str) -> Option<f64> {
        self.lookup(key_path).and_then(|v| v.as_f64())
    }

    pub fn get_list(&self, key_path: &str) -> Option<Vec<String>> {
        self.lookup(key_path).and_then(|v| v.as_list().map(<[String]>::to_vec))
    }

    /// Assign a value and write the whole tree to disk before returning.
    ///
    /// Fails, leaving the tree unchanged, when [`assign`] rejects the key
    /// path or the value. A failed write is logged and recorded in
    /// [`diagnostics`](Self::diagnostics); the in-memory value is kept.
    pub fn set(&self, key_path: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let value = value.into();
        let mut state = self.lock();
        assign(&mut state.tree, key_path, value.clone())?;
        log_update(key_path, &value);
        self.persist(&mut state);
        Ok(())
    }

    /// Write the current tree to disk
    pub fn save(&self) {
        let mut state = self.lock();
        self.persist(&mut state);
    }

    /// Replace the tree with `tree` and write it to disk.
    ///
    /// A tree holding a non-finite float is rejected before anything changes.
    pub fn save_tree(&self, tree: ConfigTree) -> Result<(), ConfigError> {
        ensure_tree_finite(&tree, "")?;
        let mut state = self.lock();
        state.tree = tree;
        self.persist(&mut state);
        Ok(())
    }

    /// Run several updates with a single write at the end.
    ///
    /// The manager stays locked while `f` runs, so `f` must go through the
    /// [`Transaction`] and never call back into this manager: the mutex is
    /// not reentrant and such a call deadlocks. Nothing is written if `f`
    /// made no successful `set`. Updates made before a panic in `f` are
    /// still written while the panic unwinds.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Transaction<'_>) -> R) -> R {
        let mut tx = Transaction {
            manager: self,
            state: self.lock(),
            dirty: false,
        };
        f(&mut tx)
    }

    fn persist(&self, state: &mut State) {
        if let Err(e) = self.store.write(&state.tree) {
            let path = self.store.path();
            error!(path = %path.display(), error = %e, "Failed to save configuration");
            state.record(Diagnostic::new(DiagnosticKind::PersistFailure, path, &e));
        }
    }

    /// Check the tree for startup-blocking errors and advisory warnings
    pub fn validate(&self) -> ValidationReport {
        let report = validate_tree(&self.lock().tree, &self.base_dir);
        info!(
            valid = report.valid,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validated configuration"
        );
        report
    }

    /// Work/output/temp paths, without creating anything
    pub fn working_directory_paths(&self) -> WorkingDirectories {
        WorkingDirectories::from_tree(&self.lock().tree, &self.base_dir)
    }

    /// Work/output/temp paths, creating any directory that is missing
    pub fn resolve_working_directories(&self) -> Result<WorkingDirectories, ConfigError> {
        let dirs = self.working_directory_paths();
        dirs.create_all()?;
        Ok(dirs)
    }

    /// Create every `*_directory` setting under `processing` and `storage`.
    ///
    /// Returns the resolved paths keyed by key path.
    pub fn ensure_directories(&self) -> Result<BTreeMap<String, PathBuf>, ConfigError> {
        let dirs = configured_directories(&self.lock().tree, &self.base_dir);
        create_directories(&dirs)?;
        Ok(dirs)
    }

    /// Deserialize one category into a typed view
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        section(&self.lock().tree, name)
    }

    pub fn server_settings(&self) -> Result<ServerSettings, ConfigError> {
        self.section("server")
    }

    pub fn realesrgan_settings(&self) -> Result<RealEsrganSettings, ConfigError> {
        self.section("realesrgan")
    }

    /// Write a copy of the current tree to `path`, or to
    /// `config_export_<unix-seconds>.json` in the base directory
    pub fn export_config(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self
                .base_dir
                .join(format!("config_export_{}.json", Utc::now().timestamp())),
        };

        let tree = self.snapshot();
        write_tree(&path, &tree)?;
        info!(path = %path.display(), "Exported configuration");
        Ok(path)
    }

    /// Replace the tree with the contents of `path` merged over the defaults,
    /// then persist. On error the current tree is left untouched.
    pub fn import_config(&self, path: &Path) -> Result<(), ConfigError> {
        let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
        let imported = parse_tree(&bytes)?;

        let mut tree = builtin_defaults();
        deep_merge(&mut tree, imported);
        self.save_tree(tree)?;
        info!(path = %path.display(), "Imported configuration");
        Ok(())
    }
}

/// Batched updates; see [`ConfigManager::transaction`].
///
/// Holds the manager's lock and writes the tree when dropped, if any `set`
/// succeeded.
pub struct Transaction<'a> {
    manager: &'a ConfigManager,
    state: MutexGuard<'a, State>,
    dirty: bool,
}

impl Transaction<'_> {
    pub fn lookup(&self, key_path: &str) -> Option<&ConfigValue> {
        lookup(&self.state.tree, key_path).found()
    }

    pub fn get(&self, key_path: &str, default: impl Into<ConfigValue>) -> ConfigValue {
        self.lookup(key_path).cloned().unwrap_or_else(|| default.into())
    }

    /// Assign without writing; the write happens when the transaction ends
    pub fn set(
        &mut self,
        key_path: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigError> {
        let value = value.into();
        assign(&mut self.state.tree, key_path, value.clone())?;
        log_update(key_path, &value);
        self.dirty = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        if thread::panicking() {
            warn!("Transaction interrupted by a panic, saving the updates applied so far");
        }
        self.manager.persist(&mut self.state);
    }
}

fn log_update(key_path: &str, value: &ConfigValue) {
    info!(key_path = %key_path, value = %value, "Configuration updated");
}

/// Process working directory, or `.` when it cannot be read
fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        warn!(error = %e, "Could not read the working directory, using '.'");
        PathBuf::from(".")
    })
}
