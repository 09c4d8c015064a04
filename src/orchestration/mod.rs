//! Orchestration module for build containers
//!
//! Provides an injectable container engine abstraction, a CLI-backed
//! implementation for Podman and Docker, and the orchestrator that runs one
//! build through the container lifecycle.

mod cli_engine;
mod engine;
mod factory;
mod orchestrator;

pub use cli_engine::CliEngine;
pub use engine::{BindMount, ContainerEngine, ContainerSpec};
pub use factory::create_engine;
pub use orchestrator::{BuildOrchestrator, RunReport, INPUT_MOUNT, OUTPUT_MOUNT};

use std::fmt;

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Container lifecycle calls, in the order they happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Pull,
    Create,
    Start,
    Wait,
    Logs,
    Remove,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pull => "pull",
            Self::Create => "create",
            Self::Start => "start",
            Self::Wait => "wait",
            Self::Logs => "logs",
            Self::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Extract the useful tail of container output for error diagnostics.
///
/// Returns the last `BUILD_ERROR_TAIL_LINES` lines so error messages are
/// actionable without being overwhelming.
pub(crate) fn log_tail(logs: &str) -> String {
    let lines: Vec<&str> = logs.lines().collect();
    let start = lines.len().saturating_sub(BUILD_ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
