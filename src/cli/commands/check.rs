//! Check command - report the cache state without building

use crate::cache::{CacheState, ManifestDiff};
use crate::cli::args::{CheckArgs, OutputFormat};
use crate::config::Config;
use crate::error::{KilnError, KilnResult};
use crate::pipeline::{self, BuildSettings};
use crate::ui::{self, UiContext};
use serde::Serialize;
use tokio::fs;

#[derive(Serialize)]
struct CheckReport<'a> {
    archive: String,
    state: CacheState,
    files: usize,
    diff: &'a ManifestDiff,
}

/// Execute the check command
pub async fn execute(args: CheckArgs, config: &Config) -> KilnResult<()> {
    let ctx = UiContext::detect();
    let input = &args.target.input;

    let is_dir = fs::metadata(input)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(KilnError::request(
            "input",
            format!("{} is not a directory", input.display()),
        ));
    }

    let archive = args.target.output.join(&args.target.filename);
    let settings = BuildSettings::from_config(config);
    let decision = pipeline::check(input, &archive, &settings).await?;

    match args.format {
        OutputFormat::Json => {
            let report = CheckReport {
                archive: archive.display().to_string(),
                state: decision.state,
                files: decision.current.len(),
                diff: &decision.diff,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => match decision.state {
            CacheState::Fresh => {
                ui::step_ok_detail(&ctx, "Fresh", &archive.display().to_string());
            }
            CacheState::Absent => ui::step_warn_hint(
                &ctx,
                &format!("Absent: {}", archive.display()),
                "Run `kiln build` to produce it",
            ),
            CacheState::Stale => {
                ui::step_warn_hint(
                    &ctx,
                    &format!("Stale: {}", archive.display()),
                    &decision.diff.to_string(),
                );
                for path in &decision.diff.added {
                    ui::key_value("added", path);
                }
                for path in &decision.diff.removed {
                    ui::key_value("removed", path);
                }
                for path in &decision.diff.changed {
                    ui::key_value("changed", path);
                }
            }
        },
    }

    Ok(())
}
