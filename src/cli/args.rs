//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Kiln - Incremental container builds
///
/// Rebuilds a source directory inside a container only when its content
/// changed since the archive was last produced.
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KILN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the output archive if its inputs changed
    Build(BuildArgs),

    /// Report whether the output archive is fresh, stale or absent
    Check(CheckArgs),

    /// Print the listing of a directory
    Fingerprint(FingerprintArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Where the inputs are and where the archive goes
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Output archive file name
    #[arg(short, long, env = "KILN_FILENAME")]
    pub filename: String,

    /// Source directory
    #[arg(short, long, env = "KILN_INPUT")]
    pub input: PathBuf,

    /// Destination directory (created if missing)
    #[arg(short, long, env = "KILN_OUTPUT")]
    pub output: PathBuf,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Container image to build with
    #[arg(long, env = "KILN_IMAGE")]
    pub image: String,

    /// Build script, relative to the input directory
    #[arg(short, long, env = "KILN_SCRIPT")]
    pub script: PathBuf,

    /// Keep the build container after it exits
    #[arg(long)]
    pub keep_container: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the fingerprint command
#[derive(Parser, Debug)]
pub struct FingerprintArgs {
    /// Directory to fingerprint
    pub dir: PathBuf,

    /// Listing name to leave out (default: from config)
    #[arg(long)]
    pub listing: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for build and check
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}
