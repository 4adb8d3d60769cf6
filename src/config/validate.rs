//! Startup validation
//!
//! Each check runs independently. Errors block startup, warnings only inform.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::defaults::keys;
use super::directories::{resolve_path, WorkingDirectories};
use super::path::lookup;
use super::value::ConfigTree;

/// Valid range for `server.port`
pub const PORT_RANGE: std::ops::RangeInclusive<i64> = 1..=65535;

/// Outcome of [`validate_tree`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

/// Validate a merged tree. Relative paths resolve against `base_dir`.
pub fn validate_tree(tree: &ConfigTree, base_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_port(tree, &mut report);
    check_working_directories(tree, base_dir, &mut report);
    check_upscaler_executable(tree, base_dir, &mut report);
    check_ssl(tree, base_dir, &mut report);
    check_encryption_transport(tree, &mut report);
    check_batch_capacity(tree, &mut report);

    report.finish()
}

fn check_port(tree: &ConfigTree, report: &mut ValidationReport) {
    match lookup(tree, keys::SERVER_PORT).found() {
        Some(value) => match value.as_i64() {
            Some(port) if PORT_RANGE.contains(&port) => {}
            _ => report.errors.push(format!(
                "Invalid server port {} (must be an integer between {} and {})",
                value,
                PORT_RANGE.start(),
                PORT_RANGE.end()
            )),
        },
        None => report
            .errors
            .push(format!("Server port is not configured ({})", keys::SERVER_PORT)),
    }
}

fn check_working_directories(tree: &ConfigTree, base_dir: &Path, report: &mut ValidationReport) {
    let dirs = WorkingDirectories::from_tree(tree, base_dir);
    for (name, path) in dirs.entries() {
        if !path.is_dir() {
            report.warnings.push(format!(
                "The {} directory does not exist and will be created: {}",
                name,
                path.display()
            ));
        }
    }
}

fn check_upscaler_executable(tree: &ConfigTree, base_dir: &Path, report: &mut ValidationReport) {
    let raw = string_setting(tree, keys::REALESRGAN_EXECUTABLE_PATH);
    if raw.is_empty() {
        report.warnings.push(format!(
            "Real-ESRGAN executable path is not configured ({})",
            keys::REALESRGAN_EXECUTABLE_PATH
        ));
        return;
    }

    let path = resolve_path(base_dir, raw);
    if !path.is_file() {
        report
            .warnings
            .push(format!("Real-ESRGAN executable not found: {}", path.display()));
    }
}

fn check_ssl(tree: &ConfigTree, base_dir: &Path, report: &mut ValidationReport) {
    if !ssl_enabled(tree) {
        return;
    }

    for (label, key) in [
        ("certificate", keys::SERVER_SSL_CERT_FILE),
        ("key", keys::SERVER_SSL_KEY_FILE),
    ] {
        let raw = string_setting(tree, key);
        if raw.is_empty() {
            report.errors.push(format!(
                "SSL is enabled but no {} file is configured ({})",
                label, key
            ));
            continue;
        }

        let path = resolve_path(base_dir, raw);
        if !path.is_file() {
            report
                .errors
                .push(format!("SSL {} file not found: {}", label, path.display()));
        }
    }
}

fn check_encryption_transport(tree: &ConfigTree, report: &mut ValidationReport) {
    let encryption = lookup(tree, keys::SECURITY_ENCRYPTION_ENABLED)
        .found()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if encryption && !ssl_enabled(tree) {
        report
            .warnings
            .push("Payload encryption is enabled but SSL is disabled".to_string());
    }
}

fn check_batch_capacity(tree: &ConfigTree, report: &mut ValidationReport) {
    let max_clients = lookup(tree, keys::SERVER_MAX_CLIENTS).found().and_then(|v| v.as_i64());
    let max_batches = lookup(tree, keys::PROCESSING_MAX_CONCURRENT_BATCHES)
        .found()
        .and_then(|v| v.as_i64());

    if let (Some(clients), Some(batches)) = (max_clients, max_batches) {
        if batches > clients.saturating_mul(2) {
            report.warnings.push(format!(
                "max_concurrent_batches ({}) is high compared to max_clients ({})",
                batches, clients
            ));
        }
    }
}

fn ssl_enabled(tree: &ConfigTree) -> bool {
    lookup(tree, keys::SERVER_USE_SSL)
        .found()
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn string_setting<'a>(tree: &'a ConfigTree, key_path: &str) -> &'a str {
    lookup(tree, key_path)
        .found()
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
}
