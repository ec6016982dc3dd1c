//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::commands::Commands;

/// Command-line client for the Twimbol API.
#[derive(Parser, Debug)]
#[command(name = "twimbol")]
#[command(author, version = env!("TWIMBOL_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// API base URL (e.g. https://api.example.com)
    #[arg(long, env = "TWIMBOL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Session file path [default: platform data directory]
    #[arg(long, env = "TWIMBOL_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,
}
