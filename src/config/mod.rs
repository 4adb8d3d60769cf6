//! Hierarchical configuration for the upscaling server
//!
//! - `defaults`: the built-in schema
//! - `store`: the JSON file under `~/.upscale_server`
//! - `merge`: recursive merge of a loaded tree over the defaults
//! - `manager`: dot-path access, write-through persistence, validation,
//!   directory provisioning

mod defaults;
mod directories;
mod error;
mod manager;
mod merge;
mod path;
mod settings;
mod store;
mod validate;
mod value;

pub use defaults::{builtin_defaults, keys, leaf_paths, APP_DIR_NAME, CONFIG_FILE_NAME};
pub use directories::{
    configured_directories, create_directories, resolve_path, WorkingDirectories,
    PROVISIONED_CATEGORIES,
};
pub use error::{ConfigError, Diagnostic, DiagnosticKind};
pub use manager::{ConfigManager, Transaction, MAX_DIAGNOSTICS};
pub use merge::deep_merge;
pub use path::{assign, lookup, split_key_path, Lookup, SEPARATOR};
pub use settings::{section, RealEsrganSettings, ServerSettings};
pub use store::{parse_tree, to_pretty_json, ConfigOrigin, ConfigSource, ConfigStore, LoadedConfig};
pub use validate::{validate_tree, ValidationReport, PORT_RANGE};
pub use value::{
    ensure_finite, ensure_tree_finite, tree_from_json, tree_to_json, ConfigTree, ConfigValue,
};
