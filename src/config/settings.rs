//! Typed views over configuration categories

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ConfigError;
use super::value::{tree_to_json, ConfigTree, ConfigValue};

/// Deserialize one top-level category into `T`.
///
/// A missing category deserializes from an empty object, so `T`'s serde
/// defaults apply.
pub fn section<T: DeserializeOwned>(tree: &ConfigTree, name: &str) -> Result<T, ConfigError> {
    let json = match tree.get(name) {
        Some(ConfigValue::Table(table)) => tree_to_json(table),
        Some(other) => {
            return Err(ConfigError::InvalidSection {
                name: name.to_string(),
                reason: format!("expected a table, found {}", other.type_name()),
            })
        }
        None => Value::Object(Default::default()),
    };

    serde_json::from_value(json).map_err(|e| ConfigError::InvalidSection {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Network settings read by the transport layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub ssl_cert_file: String,
    pub ssl_key_file: String,
    pub max_clients: u32,
    /// Seconds between client heartbeats
    pub heartbeat_interval: u64,
    /// Seconds of silence before a client is dropped
    pub client_timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            use_ssl: false,
            ssl_cert_file: String::new(),
            ssl_key_file: String::new(),
            max_clients: 10,
            heartbeat_interval: 30,
            client_timeout: 120,
        }
    }
}

/// Invocation settings for the Real-ESRGAN executable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RealEsrganSettings {
    pub executable_path: String,
    pub models_directory: String,
    pub default_model: String,
    pub default_scale: u32,
    pub tile_size: u32,
    /// GPU index; negative selects the CPU
    pub gpu_id: i32,
    /// `load:proc:save` thread counts
    pub thread_load: String,
    pub tta_mode: bool,
}

impl Default for RealEsrganSettings {
    fn default() -> Self {
        Self {
            executable_path: "realesrgan-ncnn-vulkan/realesrgan-ncnn-vulkan".to_string(),
            models_directory: "models".to_string(),
            default_model: "RealESRGAN_x4plus".to_string(),
            default_scale: 4,
            tile_size: 256,
            gpu_id: 0,
            thread_load: "1:2:2".to_string(),
            tta_mode: false,
        }
    }
}
