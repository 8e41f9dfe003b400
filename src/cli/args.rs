//! CLI argument definitions.

use super::validators::{parse_confidence, parse_positive_count};
use crate::config::BackendMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// HTTP gateway for bird species detection with `BirdNET`.
#[derive(Debug, Parser)]
#[command(name = "birda-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (default: serve).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options.
    #[command(flatten)]
    pub serve: ServeArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Options for running the gateway.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file (default: platform config dir).
    #[arg(short = 'C', long, global = true, env = "BIRDA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen host.
    #[arg(long, env = "BIRDA_HOST")]
    pub host: Option<String>,

    /// Listen port.
    #[arg(short, long, env = "BIRDA_PORT")]
    pub port: Option<u16>,

    /// Classifier backend mode.
    #[arg(long, value_enum, env = "BIRDA_BACKEND_MODE")]
    pub mode: Option<BackendMode>,

    /// Remote classifier base URL.
    #[arg(long, env = "BIRDA_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Maximum audio upload size in bytes.
    #[arg(long, env = "BIRDA_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<u64>,

    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "BIRDA_MIN_CONFIDENCE")]
    pub min_confidence: Option<f32>,

    /// Maximum number of species per result.
    #[arg(long, value_parser = parse_positive_count, env = "BIRDA_MAX_RESULTS")]
    pub max_results: Option<usize>,

    /// Classification timeout in seconds.
    #[arg(long, env = "BIRDA_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Startup readiness window in seconds.
    #[arg(long, env = "BIRDA_READY_TIMEOUT")]
    pub ready_timeout: Option<u64>,

    /// Suppress info output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}
