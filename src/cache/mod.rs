//! Incremental build cache
//!
//! Decides whether an input tree must be rebuilt by comparing its content
//! fingerprint with the listing embedded in the previous output archive.
//!
//! # Cache States
//!
//! | State | Build | Description |
//! |-------|-------|-------------|
//! | Absent | yes | No archive yet (or unusable, under the rebuild policy) |
//! | Stale | yes | Listing differs from the inputs |
//! | Fresh | no | Listing matches the inputs exactly |
//!
//! # Listing Lifecycle
//!
//! The new listing is staged into the input directory right before the
//! container runs, picked up by the build script, and removed afterwards
//! whatever the build outcome.

pub mod archive;
pub mod decision;
pub mod fingerprint;
pub mod manifest;
pub mod writer;

pub use decision::{decide, CacheDecision, CacheState, ManifestDiff, UnusableArchivePolicy};
pub use fingerprint::{fingerprint_dir, ContentDigest, FingerprintMap};
pub use writer::{stage, unstage, StagedListing};
