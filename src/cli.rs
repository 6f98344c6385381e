use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// telegraf-provision - Plan and configure Telegraf agent installs
#[derive(Parser)]
#[command(name = "telegraf-provision")]
#[command(about = "Resolves per-platform install plans and renders Telegraf configuration")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: report what would be written without touching the filesystem.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the facts detected on this host as JSON
    Facts,
    /// Resolve the platform profile and print it as JSON
    Resolve {
        /// Parameters file (JSON)
        #[arg(short, long)]
        params: PathBuf,
        /// Facts file (JSON); detected from this host when omitted
        #[arg(short, long)]
        facts: Option<PathBuf>,
    },
    /// Render the agent configuration to stdout
    Render {
        /// Parameters file (JSON)
        #[arg(short, long)]
        params: PathBuf,
    },
    /// Calculate the provision plan
    Plan {
        /// Parameters file (JSON)
        #[arg(short, long)]
        params: PathBuf,
        /// Facts file (JSON); detected from this host when omitted
        #[arg(short, long)]
        facts: Option<PathBuf>,
        /// Print the plan as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Validate a parameters file
    Validate {
        /// Path to parameters file to validate
        params: PathBuf,
    },
    /// Write the main config and drop-ins to the local filesystem
    WriteConfig {
        /// Parameters file (JSON)
        #[arg(short, long)]
        params: PathBuf,
        /// Facts file (JSON); detected from this host when omitted
        #[arg(short, long)]
        facts: Option<PathBuf>,
        /// Staging root the config paths are placed under
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
