//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Server command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration management commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (token masked)
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the default configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (default: standard location)
        file: Option<PathBuf>,
    },
}
