//! Fingerprint command - print the listing a build would stage

use crate::cache::{fingerprint_dir, manifest};
use crate::cli::args::FingerprintArgs;
use crate::config::Config;
use crate::error::{KilnError, KilnResult};
use crate::pipeline::blocking;
use std::io::Write;

/// Execute the fingerprint command
pub async fn execute(args: FingerprintArgs, config: &Config) -> KilnResult<()> {
    let listing_name = args
        .listing
        .unwrap_or_else(|| config.cache.listing_name.clone());
    let dir = args.dir;

    let encoded = blocking(move || {
        let map = fingerprint_dir(&dir, &listing_name)?;
        Ok(manifest::encode(&map, &listing_name))
    })
    .await?;

    std::io::stdout()
        .write_all(&encoded)
        .map_err(|e| KilnError::io("writing listing to stdout", e))
}
