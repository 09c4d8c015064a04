//! Error types for Kiln
//!
//! All modules use `KilnResult<T>` as their return type.

use crate::orchestration::LifecycleStage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Kiln operations
pub type KilnResult<T> = Result<T, KilnError>;

/// All errors that can occur in Kiln
#[derive(Error, Debug)]
pub enum KilnError {
    // Request and configuration errors
    #[error("Invalid {field}: {reason}")]
    RequestInvalid { field: &'static str, reason: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Fingerprint and manifest errors
    #[error("Cannot record {path} in the listing: {reason}")]
    UnrepresentablePath { path: PathBuf, reason: String },

    #[error("Malformed listing at line {line}: {reason}")]
    ManifestFormat { line: usize, reason: String },

    #[error("Failed to open archive {path}: {reason}")]
    ArchiveOpen { path: PathBuf, reason: String },

    #[error("Archive {archive} has no '{entry}' entry")]
    ManifestNotFound { archive: PathBuf, entry: String },

    // Container errors
    #[error("Container engine not found: {binary}")]
    EngineNotFound { binary: String },

    #[error("Image pull failed: {image}: {reason}")]
    ImagePull { image: String, reason: String },

    #[error("Container create failed: {0}")]
    ContainerCreate(String),

    #[error("Container {id} failed to start: {reason}")]
    ContainerStart { id: String, reason: String },

    #[error("Waiting for container {id} failed: {reason}")]
    ContainerWait { id: String, reason: String },

    #[error("Failed to fetch logs of container {id}: {reason}")]
    LogRetrieval { id: String, reason: String },

    #[error("Failed to remove container {id}: {reason}")]
    ContainerRemove { id: String, reason: String },

    #[error("Container {stage} timed out after {secs}s")]
    Timeout { stage: LifecycleStage, secs: u64 },

    #[error("Build script exited with code {code}\n{output}")]
    ScriptFailed { code: i64, output: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Interrupted")]
    Interrupted,

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KilnError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create an invalid request error
    pub fn request(field: &'static str, reason: impl Into<String>) -> Self {
        Self::RequestInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the existing output archive could not serve as a cache reference
    pub fn is_unusable_archive(&self) -> bool {
        matches!(
            self,
            Self::ArchiveOpen { .. } | Self::ManifestNotFound { .. } | Self::ManifestFormat { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EngineNotFound { .. } => {
                Some("Install podman, or set engine.kind = \"docker\" in the config")
            }
            Self::ArchiveOpen { .. } | Self::ManifestNotFound { .. } => Some(
                "Delete the output archive, or set cache.unusable_archive = \"rebuild\"",
            ),
            Self::ScriptFailed { .. } => Some("Re-run with -v to see the full container output"),
            Self::Timeout { .. } => Some("Raise the matching engine.*_timeout_secs value"),
            _ => None,
        }
    }
}
