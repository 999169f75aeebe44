//! SEO assistant - conversational SEO content backend
//!
#![doc = "SEO assistant"]
#![doc = "Main entry point for the SEO assistant service."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seo_assistant::agent::metrics::init_metrics_exporter;
use seo_assistant::cli::{Cli, Commands};
use seo_assistant::commands;
use seo_assistant::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);
    init_metrics_exporter();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!("Starting API server");
            if let Some(b) = &bind {
                tracing::debug!("Using bind override: {}", b);
            }
            commands::serve::run_serve(config, bind).await?;
            Ok(())
        }
        Commands::Generate { message, title } => {
            tracing::info!("Generating a single suggestion");
            commands::generate::run_generate(config, message, title).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "seo_assistant=debug"
    } else {
        "seo_assistant=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
