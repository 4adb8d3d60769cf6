//! Configuration errors and recorded diagnostics

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid key path: '{0}'")]
    InvalidKeyPath(String),

    #[error("Cannot assign '{key_path}': '{segment}' holds a non-table value")]
    NotATable { key_path: String, segment: String },

    #[error("Non-finite number at '{key_path}' cannot be stored")]
    NonFiniteFloat { key_path: String },

    #[error("Section '{name}' is invalid: {reason}")]
    InvalidSection { name: String, reason: String },

    #[error("Could not determine the user home directory")]
    NoHomeDirectory,
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Kind of recovered failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The file existed but could not be read or parsed; defaults were used
    ParseFailure,
    /// Writing the file failed; the in-memory tree is still current
    PersistFailure,
}

/// A failure the manager recovered from, kept for the caller to inspect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: PathBuf,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<PathBuf>, error: &ConfigError) -> Self {
        Self {
            kind,
            path: path.into(),
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::ParseFailure => "parse failure",
            DiagnosticKind::PersistFailure => "persist failure",
        };
        write!(f, "{} ({}): {}", kind, self.path.display(), self.message)
    }
}
