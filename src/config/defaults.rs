//! Built-in defaults
//!
//! The canonical schema: every key the server recognizes, with its default
//! value. Loaded files are merged over this tree, so nothing listed here can
//! go missing.

use super::value::{ConfigTree, ConfigValue};

/// Directory (under the user's home) holding the configuration file
pub const APP_DIR_NAME: &str = ".upscale_server";

/// Configuration file name inside [`APP_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Dot-paths of the settings this crate reads itself
pub mod keys {
    pub const SERVER_PORT: &str = "server.port";
    pub const SERVER_MAX_CLIENTS: &str = "server.max_clients";
    pub const SERVER_USE_SSL: &str = "server.use_ssl";
    pub const SERVER_SSL_CERT_FILE: &str = "server.ssl_cert_file";
    pub const SERVER_SSL_KEY_FILE: &str = "server.ssl_key_file";
    pub const SECURITY_ENCRYPTION_ENABLED: &str = "security.encryption_enabled";
    pub const PROCESSING_MAX_CONCURRENT_BATCHES: &str = "processing.max_concurrent_batches";
    pub const PROCESSING_WORK_DIRECTORY: &str = "processing.work_directory";
    pub const PROCESSING_OUTPUT_DIRECTORY: &str = "processing.output_directory";
    pub const PROCESSING_TEMP_DIRECTORY: &str = "processing.temp_directory";
    pub const REALESRGAN_EXECUTABLE_PATH: &str = "realesrgan.executable_path";
}

fn table<const N: usize>(entries: [(&str, ConfigValue); N]) -> ConfigValue {
    ConfigValue::Table(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

/// Build a fresh copy of the default tree
pub fn builtin_defaults() -> ConfigTree {
    let categories = [
        (
            "server",
            table([
                ("host", "0.0.0.0".into()),
                ("port", 8765.into()),
                ("use_ssl", false.into()),
                ("ssl_cert_file", "".into()),
                ("ssl_key_file", "".into()),
                ("max_clients", 10.into()),
                ("heartbeat_interval", 30.into()),
                ("client_timeout", 120.into()),
            ]),
        ),
        (
            "security",
            table([
                ("encryption_enabled", true.into()),
                ("key_rotation_interval", 3600.into()),
                ("max_failed_attempts", 5.into()),
                ("session_timeout", 3600.into()),
            ]),
        ),
        (
            "processing",
            table([
                ("batch_size", 50.into()),
                ("max_concurrent_batches", 5.into()),
                ("duplicate_threshold", 5.into()),
                ("work_directory", "work".into()),
                ("output_directory", "output".into()),
                ("temp_directory", "temp".into()),
                ("output_format", "png".into()),
                ("max_retries", 3.into()),
                ("enable_gpu", true.into()),
            ]),
        ),
        (
            "video",
            table([
                ("supported_formats", vec!["mp4", "avi", "mkv", "mov", "webm"].into()),
                ("preserve_audio", true.into()),
                ("frame_extraction_format", "png".into()),
                ("ffmpeg_quality", "high".into()),
            ]),
        ),
        (
            "realesrgan",
            table([
                (
                    "executable_path",
                    "realesrgan-ncnn-vulkan/realesrgan-ncnn-vulkan".into(),
                ),
                ("models_directory", "models".into()),
                ("default_model", "RealESRGAN_x4plus".into()),
                ("default_scale", 4.into()),
                ("tile_size", 256.into()),
                ("gpu_id", 0.into()),
                ("thread_load", "1:2:2".into()),
                ("tta_mode", false.into()),
            ]),
        ),
        (
            "monitoring",
            table([
                ("log_level", "INFO".into()),
                ("enable_performance_monitoring", true.into()),
                ("metrics_interval", 60.into()),
                ("max_log_files", 10.into()),
                ("metrics_retention_days", 30.into()),
            ]),
        ),
        (
            "gui",
            table([
                ("theme", "dark".into()),
                ("auto_refresh_interval", 2000.into()),
                ("show_detailed_logs", true.into()),
                ("enable_notifications", true.into()),
                ("charts_history_points", 100.into()),
            ]),
        ),
        (
            "storage",
            table([
                ("input_directory", "input".into()),
                ("batches_directory", "batches".into()),
                ("logs_directory", "logs".into()),
                ("max_disk_usage_gb", 100.into()),
                ("min_free_space_gb", 5.into()),
                ("auto_cleanup", true.into()),
            ]),
        ),
    ];

    categories
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Every leaf path of a tree, dot-joined, in key order
pub fn leaf_paths(tree: &ConfigTree) -> Vec<String> {
    fn walk(tree: &ConfigTree, prefix: &str, out: &mut Vec<String>) {
        for (key, value) in tree {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                ConfigValue::Table(child) => walk(child, &path, out),
                _ => out.push(path),
            }
        }
    }

    let mut out = Vec::new();
    walk(tree, "", &mut out);
    out
}
