//! Listing codec
//!
//! A listing is UTF-8 text with one `<path> <digest>` entry per line, in
//! path order. Lines are split on their last space: digests never contain
//! one, so paths with spaces survive a round trip.

use crate::cache::fingerprint::{listing_path, ContentDigest, FingerprintMap};
use crate::error::{KilnError, KilnResult};

/// Serialize a fingerprint map, leaving out the listing's own entry
pub fn encode(map: &FingerprintMap, listing_name: &str) -> Vec<u8> {
    let own = listing_path(listing_name);
    let mut out = String::with_capacity(map.len() * (ContentDigest::HEX_LEN + 32));

    for (path, digest) in map.iter().filter(|(path, _)| **path != own) {
        out.push_str(path);
        out.push(' ');
        out.push_str(&digest.to_string());
        out.push('\n');
    }

    out.into_bytes()
}

/// Parse a listing; any malformed line aborts the whole decode
pub fn decode(bytes: &[u8]) -> KilnResult<FingerprintMap> {
    let text = std::str::from_utf8(bytes).map_err(|e| KilnError::ManifestFormat {
        line: 0,
        reason: format!("not valid UTF-8: {}", e),
    })?;

    let mut map = FingerprintMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let entry = raw.strip_suffix('\r').unwrap_or(raw);
        if entry.is_empty() {
            continue;
        }

        let fail = |reason: String| KilnError::ManifestFormat { line, reason };

        let (path, digest) = entry
            .rsplit_once(' ')
            .ok_or_else(|| fail("missing digest field".to_string()))?;

        if path.is_empty() {
            return Err(fail("empty path".to_string()));
        }
        if !path.starts_with('/') {
            return Err(fail(format!("path '{}' must start with '/'", path)));
        }

        let digest: ContentDigest = digest.parse().map_err(&fail)?;

        if map.insert(path, digest).is_some() {
            return Err(fail(format!("duplicate entry for '{}'", path)));
        }
    }

    Ok(map)
}
