//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        println!("{} {} ({})", style("✓").green(), message, style(detail).dim());
    } else {
        println!("{} {} ({})", style("[OK]").green(), message, detail);
    }
}

/// Display a warning step with a follow-up hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        println!("{} {}", style("!").yellow(), message);
        println!("  {}", style(hint).dim());
    } else {
        println!("{} {}", style("[WARN]").yellow(), message);
        println!("  {}", hint);
    }
}

/// Display an aligned key/value line
pub fn key_value(key: &str, value: &str) {
    println!("  {:<10} {}", style(key).bold(), value);
}
