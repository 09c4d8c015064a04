//! Content fingerprinting of an input tree
//!
//! Every regular file under the root is hashed with SHA256 and recorded by
//! its root-relative, forward-slash path (`/src/main.c`). Archive entry
//! names use the same convention, so listings compare across platforms.

use crate::error::{KilnError, KilnResult};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use walkdir::WalkDir;

/// SHA256 digest of a file's full byte content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Length of the lowercase hex rendering
    pub const HEX_LEN: usize = 64;

    /// Hash an in-memory buffer
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Hash everything a reader yields
    pub fn of_reader(mut reader: impl io::Read) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher)?;
        Ok(Self(hasher.finalize().into()))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentDigest {
    type Err = String;

    /// Parse a lowercase 64-character hex digest
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(format!(
                "digest must be {} hex characters, got {}",
                Self::HEX_LEN,
                s.len()
            ));
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err("digest must be lowercase hex".to_string());
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| e.to_string())?;
        Ok(Self(bytes))
    }
}

/// Mapping from root-relative path to content digest
///
/// Backed by a `BTreeMap` so iteration is always path-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintMap {
    entries: BTreeMap<String, ContentDigest>,
}

impl FingerprintMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the digest it replaced
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        digest: ContentDigest,
    ) -> Option<ContentDigest> {
        self.entries.insert(path.into(), digest)
    }

    pub fn get(&self, path: &str) -> Option<&ContentDigest> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> btree_map::Iter<'_, String, ContentDigest> {
        self.entries.iter()
    }
}

impl FromIterator<(String, ContentDigest)> for FingerprintMap {
    fn from_iter<I: IntoIterator<Item = (String, ContentDigest)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FingerprintMap {
    type Item = (&'a String, &'a ContentDigest);
    type IntoIter = btree_map::Iter<'a, String, ContentDigest>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Listing path of a listing file name (`listing` -> `/listing`)
pub fn listing_path(listing_name: &str) -> String {
    format!("/{}", listing_name)
}

/// Fingerprint every regular file under `root`
///
/// Symlinks, directories and special files are skipped. The entry for the
/// listing file itself is never recorded, even if it exists on disk. Any
/// unreadable file fails the whole walk.
pub fn fingerprint_dir(root: &Path, listing_name: &str) -> KilnResult<FingerprintMap> {
    let files = collect_files(root, listing_name)?;
    debug!("Hashing {} files under {}", files.len(), root.display());
    hash_files(files)
}

/// Walk `root` and return `(key, path)` for every file to hash
fn collect_files(root: &Path, listing_name: &str) -> KilnResult<Vec<(String, PathBuf)>> {
    let excluded = listing_path(listing_name);
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let context = format!("walking {}", e.path().unwrap_or(root).display());
            KilnError::io(context, io::Error::other(e))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative_key(root, entry.path())?;
        if rel == excluded {
            continue;
        }
        files.push((rel, entry.into_path()));
    }

    Ok(files)
}

/// Hash collected files in parallel; the first failure discards every result
fn hash_files(files: Vec<(String, PathBuf)>) -> KilnResult<FingerprintMap> {
    let hashed: Vec<(String, ContentDigest)> = files
        .into_par_iter()
        .map(|(rel, path)| {
            let digest = File::open(&path)
                .and_then(ContentDigest::of_reader)
                .map_err(|e| KilnError::io(format!("hashing {}", path.display()), e))?;
            Ok((rel, digest))
        })
        .collect::<KilnResult<_>>()?;

    Ok(hashed.into_iter().collect())
}

/// Build the `/a/b` key for a path below `root`
fn relative_key(root: &Path, path: &Path) -> KilnResult<String> {
    let rel = path.strip_prefix(root).map_err(|_| KilnError::UnrepresentablePath {
        path: path.to_path_buf(),
        reason: format!("not below {}", root.display()),
    })?;

    let mut key = String::new();
    for component in rel.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let part = part.to_str().ok_or_else(|| KilnError::UnrepresentablePath {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;
        if part.contains(['\n', '\r']) {
            return Err(KilnError::UnrepresentablePath {
                path: path.to_path_buf(),
                reason: "file name contains a line break".to_string(),
            });
        }
        key.push('/');
        key.push_str(part);
    }
    Ok(key)
}
