//! Staging the listing into the input tree
//!
//! The listing has to sit in the input directory while the container runs
//! so the build script can bundle it into the archive. Afterwards the input
//! tree must look exactly as the caller left it.

use crate::cache::fingerprint::FingerprintMap;
use crate::cache::manifest;
use crate::error::{KilnError, KilnResult};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A listing written into an input directory
///
/// Call [`StagedListing::unstage`] to remove it and observe failures. A guard
/// dropped without being unstaged removes the file on a best-effort basis.
#[derive(Debug)]
#[must_use = "dropping the guard removes the listing immediately"]
pub struct StagedListing {
    path: PathBuf,
    armed: bool,
}

impl StagedListing {
    /// Location of the staged file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged listing
    pub fn unstage(mut self) -> KilnResult<()> {
        self.armed = false;
        remove_listing(&self.path)
    }
}

impl Drop for StagedListing {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = remove_listing(&self.path) {
            warn!("Failed to clean up {}: {}", self.path.display(), e);
        }
    }
}

/// Write the listing for `current` to `input_dir/listing_name`
pub fn stage(
    current: &FingerprintMap,
    input_dir: &Path,
    listing_name: &str,
) -> KilnResult<StagedListing> {
    let path = input_dir.join(listing_name);
    let bytes = manifest::encode(current, listing_name);

    write_private(&path, &bytes)
        .map_err(|e| KilnError::io(format!("writing listing {}", path.display()), e))?;

    debug!("Staged {} entries in {}", current.len(), path.display());
    Ok(StagedListing { path, armed: true })
}

/// Remove `input_dir/listing_name` if present
pub fn unstage(input_dir: &Path, listing_name: &str) -> KilnResult<()> {
    remove_listing(&input_dir.join(listing_name))
}

fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}

fn remove_listing(path: &Path) -> KilnResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(KilnError::io(format!("removing listing {}", path.display()), e)),
    }
}
