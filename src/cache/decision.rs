//! Rebuild-or-reuse decision
//!
//! Compares the fingerprint of the input tree against the listing embedded
//! in the previous output archive.

use crate::cache::archive;
use crate::cache::fingerprint::{fingerprint_dir, FingerprintMap};
use crate::cache::manifest;
use crate::error::KilnResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Cache state of an output archive relative to its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// No usable previous archive
    Absent,
    /// Previous listing differs from the inputs
    Stale,
    /// Previous listing matches the inputs exactly
    Fresh,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Stale => write!(f, "stale"),
            Self::Fresh => write!(f, "fresh"),
        }
    }
}

/// What to do when an output archive exists but cannot be read as a cache reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnusableArchivePolicy {
    /// Surface the error and stop
    #[default]
    Fail,
    /// Treat the archive as absent and rebuild over it
    Rebuild,
}

/// Paths that differ between two fingerprint maps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    /// In the inputs, not in the listing
    pub added: Vec<String>,
    /// In the listing, not in the inputs
    pub removed: Vec<String>,
    /// In both with different digests
    pub changed: Vec<String>,
}

impl ManifestDiff {
    /// Diff `previous` (archived) against `current` (on disk)
    pub fn between(previous: &FingerprintMap, current: &FingerprintMap) -> Self {
        let mut diff = Self::default();

        for (path, digest) in current {
            match previous.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old != digest => diff.changed.push(path.clone()),
                Some(_) => {}
            }
        }
        diff.removed = previous
            .iter()
            .filter(|(path, _)| !current.contains(path))
            .map(|(path, _)| path.clone())
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl fmt::Display for ManifestDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} changed",
            self.added.len(),
            self.removed.len(),
            self.changed.len()
        )
    }
}

/// Outcome of a cache check
#[derive(Debug, Clone)]
pub struct CacheDecision {
    pub state: CacheState,
    /// Fingerprint of the inputs, reused when staging the new listing
    pub current: FingerprintMap,
    /// Differences against the archived listing (empty unless stale)
    pub diff: ManifestDiff,
}

/// Decide whether the archive at `archive_path` is still valid for `input_dir`
pub fn decide(
    input_dir: &Path,
    archive_path: &Path,
    listing_name: &str,
    policy: UnusableArchivePolicy,
) -> KilnResult<CacheDecision> {
    let current = fingerprint_dir(input_dir, listing_name)?;

    let absent = |current: FingerprintMap| CacheDecision {
        state: CacheState::Absent,
        current,
        diff: ManifestDiff::default(),
    };

    if !archive_path.is_file() {
        debug!("No archive at {}, build required", archive_path.display());
        return Ok(absent(current));
    }

    debug!(
        "Archive {} exists, comparing '{}' listing",
        archive_path.display(),
        listing_name
    );

    let previous = match archive::read_entry(archive_path, listing_name)
        .and_then(|bytes| manifest::decode(&bytes))
    {
        Ok(previous) => previous,
        Err(e) if e.is_unusable_archive() && policy == UnusableArchivePolicy::Rebuild => {
            warn!("Ignoring unusable archive: {}", e);
            return Ok(absent(current));
        }
        Err(e) => return Err(e),
    };

    let diff = ManifestDiff::between(&previous, &current);
    let state = if diff.is_empty() {
        CacheState::Fresh
    } else {
        CacheState::Stale
    };
    debug!("Cache {} ({})", state, diff);

    Ok(CacheDecision {
        state,
        current,
        diff,
    })
}
