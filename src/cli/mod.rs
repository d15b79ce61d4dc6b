pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Polls weather, feeds and calendars and serves the latest results", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "TRIBUTARY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the fetch pipeline and the HTTP API
    Serve,
    /// Validate the configuration and list registered sources
    Check,
    /// Fetch every source once and print the results
    Fetch {
        /// Only fetch this section
        section: Option<String>,
    },
}
