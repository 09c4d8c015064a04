//! Build command - rebuild the archive when its inputs changed

use crate::cache::{CacheState, ManifestDiff};
use crate::cli::args::{BuildArgs, OutputFormat};
use crate::config::Config;
use crate::error::{KilnError, KilnResult};
use crate::orchestration::create_engine;
use crate::pipeline::{BuildOutcome, BuildSettings, Builder};
use crate::request::BuildRequest;
use crate::ui::{self, TaskSpinner, UiContext};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Machine-readable build result
#[derive(Serialize)]
struct BuildReport<'a> {
    archive: String,
    state: CacheState,
    built: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    container_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i64>,
    diff: &'a ManifestDiff,
}

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> KilnResult<()> {
    let ctx = UiContext::detect();

    let request = BuildRequest {
        output_filename: args.target.filename,
        input_dir: args.target.input,
        output_dir: args.target.output,
        image: args.image,
        script: args.script,
    };
    let archive = request.archive_path();

    let engine = create_engine(&config.engine);
    let mut settings = BuildSettings::from_config(config);
    if args.keep_container {
        settings.remove_container = false;
    }
    debug!("Build settings: {:?}", settings);

    let builder = Builder::new(&*engine, settings);

    let spinner = (args.format == OutputFormat::Text).then(|| {
        TaskSpinner::start(&ctx, &format!("Checking {}...", request.output_filename))
    });

    let result = tokio::select! {
        result = builder.build(&request) => result,
        _ = tokio::signal::ctrl_c() => Err(KilnError::Interrupted),
    };

    if let Some(spinner) = spinner {
        spinner.clear();
    }

    let outcome = result?;
    match args.format {
        OutputFormat::Text => print_text(&ctx, &outcome, &archive),
        OutputFormat::Json => print_json(&outcome, &archive)?,
    }

    Ok(())
}

fn print_text(ctx: &UiContext, outcome: &BuildOutcome, archive: &Path) {
    match outcome {
        BuildOutcome::Reused { .. } => {
            ui::step_ok_detail(ctx, "Up to date", &archive.display().to_string());
        }
        BuildOutcome::Built { decision, .. } => {
            let detail = match decision.state {
                CacheState::Stale => decision.diff.to_string(),
                _ => "no previous build".to_string(),
            };
            ui::step_ok_detail(ctx, &format!("Built {}", archive.display()), &detail);
        }
    }
}

fn print_json(outcome: &BuildOutcome, archive: &Path) -> KilnResult<()> {
    let decision = outcome.decision();
    let (container_id, exit_code) = match outcome {
        BuildOutcome::Reused { .. } => (None, None),
        BuildOutcome::Built { report, .. } => {
            (Some(report.container_id.as_str()), Some(report.exit_code))
        }
    };

    let report = BuildReport {
        archive: archive.display().to_string(),
        state: decision.state,
        built: matches!(outcome, BuildOutcome::Built { .. }),
        container_id,
        exit_code,
        diff: &decision.diff,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
