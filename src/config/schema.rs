//! Configuration schema for Kiln
//!
//! Configuration is stored at `~/.config/kiln/config.toml`

use crate::cache::UnusableArchivePolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Container engine settings
    pub engine: EngineConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Supported container engine CLIs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Podman,
    Docker,
}

impl EngineKind {
    /// Default executable name
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            Self::Podman => "Podman",
            Self::Docker => "Docker",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Container engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Which engine CLI to drive
    pub kind: EngineKind,

    /// Explicit path to the engine executable
    pub binary: Option<String>,

    /// Shell used to run the build script inside the container
    pub shell: String,

    /// Image pull bound in seconds (0 = unbounded)
    pub pull_timeout_secs: u64,

    /// Bound on the script run in seconds (0 = unbounded)
    pub wait_timeout_secs: u64,

    /// Bound on create/start/logs/remove calls in seconds (0 = unbounded)
    pub call_timeout_secs: u64,

    /// Remove the container once the build finished
    pub remove_container: bool,
}

impl EngineConfig {
    /// Executable to invoke
    pub fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or_else(|| self.kind.binary())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            binary: None,
            shell: "/bin/sh".to_string(),
            pull_timeout_secs: 600,
            wait_timeout_secs: 3600,
            call_timeout_secs: 60,
            remove_container: true,
        }
    }
}

/// Per-stage bounds for container lifecycle calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub pull: Duration,
    pub wait: Duration,
    pub call: Duration,
}

impl From<&EngineConfig> for Timeouts {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            pull: Duration::from_secs(engine.pull_timeout_secs),
            wait: Duration::from_secs(engine.wait_timeout_secs),
            call: Duration::from_secs(engine.call_timeout_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the listing file staged into the input and read from the archive
    pub listing_name: String,

    /// What to do with an output archive that cannot be read
    pub unusable_archive: UnusableArchivePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_name: "listing".to_string(),
            unusable_archive: UnusableArchivePolicy::Fail,
        }
    }
}
