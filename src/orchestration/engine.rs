//! Container engine abstraction
//!
//! The orchestrator only ever talks to an engine through this trait, so
//! tests and alternative backends can be injected.

use crate::error::KilnResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// A host directory bind-mounted read/write into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Absolute host path
    pub source: PathBuf,
    /// Path inside the container
    pub target: String,
}

impl BindMount {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// `--mount` argument value
    pub fn mount_arg(&self) -> String {
        format!(
            "type=bind,source={},target={}",
            self.source.display(),
            self.target
        )
    }
}

/// Everything needed to create a build container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image reference
    pub image: String,
    /// Command and arguments
    pub command: Vec<String>,
    /// Bind mounts
    pub mounts: Vec<BindMount>,
}

/// Abstract container engine interface
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Pull an image, returning the engine's progress output
    async fn pull_image(&self, image: &str) -> KilnResult<Vec<u8>>;

    /// Create (but do not start) a container, returning its ID
    async fn create_container(&self, spec: &ContainerSpec) -> KilnResult<String>;

    /// Start a created container
    async fn start_container(&self, id: &str) -> KilnResult<()>;

    /// Block until the container exits, returning its exit code
    async fn wait_container(&self, id: &str) -> KilnResult<i64>;

    /// Fetch the container's stdout
    async fn container_logs(&self, id: &str) -> KilnResult<Vec<u8>>;

    /// Remove a container, stopping it first if needed
    async fn remove_container(&self, id: &str) -> KilnResult<()>;

    /// Get the human-readable engine name for display
    fn engine_name(&self) -> &'static str;
}
