//! Cache-check-and-build pipeline
//!
//! fingerprint -> decide -> stage listing -> run container -> unstage.
//! The first error stops the pipeline; the staged listing is removed on
//! every exit path.

use crate::cache::{self, CacheDecision, CacheState, UnusableArchivePolicy};
use crate::config::{Config, Timeouts};
use crate::error::{KilnError, KilnResult};
use crate::orchestration::{BuildOrchestrator, ContainerEngine, RunReport};
use crate::request::BuildRequest;
use std::path::Path;
use tracing::{debug, info, warn};

/// Knobs the pipeline needs, independent of where they came from
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub listing_name: String,
    pub unusable_archive: UnusableArchivePolicy,
    pub shell: String,
    pub timeouts: Timeouts,
    pub remove_container: bool,
}

impl BuildSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            listing_name: config.cache.listing_name.clone(),
            unusable_archive: config.cache.unusable_archive,
            shell: config.engine.shell.clone(),
            timeouts: Timeouts::from(&config.engine),
            remove_container: config.engine.remove_container,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What a build request ended in
#[derive(Debug)]
pub enum BuildOutcome {
    /// Archive was fresh, nothing ran
    Reused { decision: CacheDecision },
    /// Container ran and exited cleanly
    Built {
        decision: CacheDecision,
        report: RunReport,
    },
}

impl BuildOutcome {
    pub fn decision(&self) -> &CacheDecision {
        match self {
            Self::Reused { decision } | Self::Built { decision, .. } => decision,
        }
    }
}

/// Runs build requests against one container engine
pub struct Builder<'a> {
    engine: &'a dyn ContainerEngine,
    settings: BuildSettings,
}

impl<'a> Builder<'a> {
    pub fn new(engine: &'a dyn ContainerEngine, settings: BuildSettings) -> Self {
        Self { engine, settings }
    }

    /// Check the cache for `request` and build if it is not fresh
    pub async fn build(&self, request: &BuildRequest) -> KilnResult<BuildOutcome> {
        let request = request.resolve().await?;
        let archive_path = request.archive_path();

        let decision = check(&request.input_dir, &archive_path, &self.settings).await?;
        match decision.state {
            CacheState::Fresh => {
                info!("{} is up to date", archive_path.display());
                return Ok(BuildOutcome::Reused { decision });
            }
            CacheState::Absent => info!("No previous build of {}", archive_path.display()),
            CacheState::Stale => info!("Inputs changed ({}), rebuilding", decision.diff),
        }

        let staged = {
            let current = decision.current.clone();
            let input_dir = request.input_dir.clone();
            let listing_name = self.settings.listing_name.clone();
            blocking(move || cache::stage(&current, &input_dir, &listing_name)).await?
        };

        let orchestrator = BuildOrchestrator::new(
            self.engine,
            self.settings.shell.clone(),
            self.settings.timeouts,
        )
        .keep_container(!self.settings.remove_container);
        let result = orchestrator.run(&request).await;

        let cleanup = blocking(move || staged.unstage()).await;
        let report = match (result, cleanup) {
            (Ok(report), Ok(())) => report,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    warn!("Failed to remove staged listing: {}", cleanup_err);
                }
                return Err(e);
            }
        };

        debug!("Build of {} finished", archive_path.display());
        Ok(BuildOutcome::Built { decision, report })
    }
}

/// Decide the cache state of `archive_path` without side effects
pub async fn check(
    input_dir: &Path,
    archive_path: &Path,
    settings: &BuildSettings,
) -> KilnResult<CacheDecision> {
    let input_dir = input_dir.to_path_buf();
    let archive_path = archive_path.to_path_buf();
    let listing_name = settings.listing_name.clone();
    let policy = settings.unusable_archive;

    blocking(move || cache::decide(&input_dir, &archive_path, &listing_name, policy)).await
}

/// Run filesystem-heavy work off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> KilnResult<T>
where
    F: FnOnce() -> KilnResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| KilnError::Internal(format!("blocking task failed: {}", e)))?
}
