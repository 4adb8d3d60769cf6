//! Upscale Server Config - settings backbone for the distributed upscaling server
//!
//! This crate owns the server's configuration tree: the built-in schema, the
//! JSON file it is persisted to, the merge of that file over the defaults,
//! dot-path access for the other server components, and the startup
//! validation pass.

pub mod config;

pub use config::{
    ConfigError, ConfigManager, ConfigStore, ConfigTree, ConfigValue, Diagnostic,
    ValidationReport, WorkingDirectories,
};
