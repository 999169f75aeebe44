//! OpenAI-compatible chat completions provider
//!
//! Posts to `<api_base>/chat/completions` with `response_format` set to
//! `json_object`. Any server speaking the same protocol can be targeted by
//! changing `api_base`.

use crate::config::OpenAiConfig;
use crate::error::{Result, SeoAssistantError};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI-compatible API provider
///
/// # Examples
///
/// ```no_run
/// use seo_assistant::config::OpenAiConfig;
/// use seo_assistant::providers::{OpenAiProvider, Provider};
///
/// # async fn example() -> seo_assistant::error::Result<()> {
/// let config = OpenAiConfig {
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(config)?;
/// let object = provider.chat_json("Return JSON", "{}").await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [Message],
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Config` if no API key is configured, or
    /// `SeoAssistantError::Generation` if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SeoAssistantError::Config(
                    "provider.openai.api_key is required (or set OPENAI_API_KEY)".to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("seo-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SeoAssistantError::Generation(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        tracing::debug!("Sending OpenAI request: {} messages", messages.len());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI request failed: {}", e);
                SeoAssistantError::Generation(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI returned error {}: {}", status, error_text);
            return Err(SeoAssistantError::Generation(format!(
                "OpenAI returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            SeoAssistantError::Generation(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let choice = chat.choices.into_iter().next().ok_or_else(|| {
            SeoAssistantError::Generation("OpenAI response contained no choices".to_string())
        })?;

        let message = Message {
            role: choice.message.role.unwrap_or_else(|| "assistant".to_string()),
            content: choice.message.content.unwrap_or_default(),
        };

        Ok(match chat.usage {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> OpenAiConfig {
        OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_openai_provider_requires_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_openai_provider_blank_api_key_rejected() {
        let config = OpenAiConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(OpenAiProvider::new(config).is_err());
    }

    #[test]
    fn test_openai_provider_model() {
        let provider = OpenAiProvider::new(config_with_key()).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = config_with_key();
        config.api_base = "http://localhost:8080/v1/".to_string();
        let provider = OpenAiProvider::new(config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_serializes_json_mode() {
        let messages = [Message::system("s"), Message::user("u")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            temperature: 0.2,
            messages: &messages,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][1]["role"], "user");
    }
}
