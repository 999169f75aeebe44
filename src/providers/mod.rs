//! Generation providers
//!
//! This module contains the provider abstraction and implementations for
//! OpenAI-compatible endpoints, Ollama, and a scripted fake.

pub mod base;
pub mod fake;
pub mod ollama;
pub mod openai;

pub use base::{parse_json_object, CompletionResponse, Message, Provider, TokenUsage};
pub use fake::{FakeProvider, FakeReply};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{Result, SeoAssistantError};

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration; `provider_type` selects the backend
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
///
/// # Examples
///
/// ```
/// use seo_assistant::config::Config;
/// use seo_assistant::providers::create_provider;
///
/// let mut config = Config::default();
/// config.provider.provider_type = "ollama".to_string();
/// let provider = create_provider(&config.provider).unwrap();
/// assert_eq!(provider.name(), "ollama");
/// ```
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(config.openai.clone())?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config.ollama.clone())?)),
        "fake" => {
            tracing::warn!("Using scripted fake provider; suggestions are canned");
            Ok(Box::new(FakeProvider::new()))
        }
        other => Err(SeoAssistantError::Config(format!("Unknown provider type: {}", other)).into()),
    }
}
