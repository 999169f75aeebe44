/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `serve`    : Run the HTTP API
- `generate` : Produce a single suggestion and print it as JSON
*/

// Serve command handler
pub mod serve {
    use crate::config::Config;
    use crate::error::Result;
    use crate::server::{self, AppState};
    use std::sync::Arc;

    /// Run the HTTP API until the process is stopped
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `bind` - Optional `host:port` or `port` override
    pub async fn run_serve(mut config: Config, bind: Option<String>) -> Result<()> {
        if let Some(bind) = &bind {
            server::apply_bind_override(&mut config.server, bind)?;
        }

        tracing::info!(
            provider = %config.provider.provider_type,
            knowledge = config.knowledge.enabled,
            "Starting server"
        );

        let state = Arc::new(AppState::from_config(&config)?);
        server::serve(state, &config.server).await
    }
}

// Generate command handler
pub mod generate {
    use crate::agent::history::History;
    use crate::agent::pipeline::{PipelineOutput, SuggestionPipeline, TurnInput};
    use crate::config::Config;
    use crate::error::{Result, SeoAssistantError};
    use crate::providers::{create_provider, Provider};
    use crate::service::auto_title;
    use std::sync::Arc;

    /// Generate one suggestion and print it to stdout as JSON
    ///
    /// Nothing is persisted.
    pub async fn run_generate(
        config: Config,
        message: String,
        title: Option<String>,
    ) -> Result<()> {
        let provider: Arc<dyn Provider> = Arc::from(create_provider(&config.provider)?);
        let output = generate_once(&config, provider, &message, title.as_deref()).await?;

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Run an opening turn through the pipeline
    pub async fn generate_once(
        config: &Config,
        provider: Arc<dyn Provider>,
        message: &str,
        title: Option<&str>,
    ) -> Result<PipelineOutput> {
        if message.trim().is_empty() {
            return Err(
                SeoAssistantError::Validation("Message must not be empty".to_string()).into(),
            );
        }

        let pipeline = SuggestionPipeline::from_config(config, provider);
        let session_title = title
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| auto_title(message));
        let turn = TurnInput {
            session_title,
            instruction: message.to_string(),
            history: History::Opening,
        };

        pipeline.run(&turn).await
    }

}
