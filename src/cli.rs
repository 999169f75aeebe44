//! Command-line interface definition for the SEO assistant
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the HTTP service and to generate a single
//! suggestion from the terminal.

use clap::{Parser, Subcommand};

/// SEO assistant - conversational SEO content backend
///
/// Serves the session API or generates one suggestion locally.
#[derive(Parser, Debug, Clone)]
#[command(name = "seo-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the SQLite database path
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Listen address, overriding `server.host`/`server.port`
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate one suggestion and print it as JSON
    Generate {
        /// Instruction for the assistant
        message: String,

        /// Session title used as context
        #[arg(short, long)]
        title: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            storage_path: None,
            command: Commands::Serve { bind: None },
        }
    }
}
