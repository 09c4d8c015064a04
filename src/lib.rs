//! Kiln - Incremental container builds
//!
//! Fingerprints a source tree, compares it against the listing stored in
//! the previous output archive, and reruns the containerized build only
//! when something changed.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod pipeline;
pub mod request;
pub mod ui;

pub use error::{KilnError, KilnResult};
