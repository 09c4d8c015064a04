//! UI module for consistent CLI output
//!
//! Spinners and glyphs in an interactive terminal, plain tagged lines in
//! CI and when output is redirected.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
