//! Reading the listing back out of a produced zip archive
//!
//! The archive layout belongs to the build script; only the one named
//! entry is read.

use crate::error::{KilnError, KilnResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Read the raw bytes of `entry` from the zip archive at `archive_path`
pub fn read_entry(archive_path: &Path, entry: &str) -> KilnResult<Vec<u8>> {
    let file = File::open(archive_path)
        .map_err(|e| KilnError::io(format!("opening archive {}", archive_path.display()), e))?;

    let open_failed = |reason: String| KilnError::ArchiveOpen {
        path: archive_path.to_path_buf(),
        reason,
    };

    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| open_failed(e.to_string()))?;

    let mut listing = match archive.by_name(entry) {
        Ok(listing) => listing,
        Err(ZipError::FileNotFound) => {
            return Err(KilnError::ManifestNotFound {
                archive: archive_path.to_path_buf(),
                entry: entry.to_string(),
            })
        }
        Err(e) => return Err(open_failed(e.to_string())),
    };

    // The declared size comes from the archive, so it is not trusted
    let mut bytes = Vec::new();
    listing
        .read_to_end(&mut bytes)
        .map_err(|e| open_failed(format!("reading '{}': {}", entry, e)))?;

    Ok(bytes)
}
