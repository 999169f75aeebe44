//! Base provider trait and common types
//!
//! This module defines the Provider trait that all generation backends
//! implement, along with the chat message and response types and the JSON
//! object extraction shared by every backend.

use crate::error::{Result, SeoAssistantError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message structure for a chat completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use seo_assistant::providers::Message;
    ///
    /// let msg = Message::system("You are an SEO assistant");
    /// assert_eq!(msg.role, "system");
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use seo_assistant::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Completion response with message and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// Provider trait for generation backends
///
/// Implementations perform a single chat completion in JSON mode.
/// [`Provider::chat_json`] builds on `complete` to return a JSON object.
///
/// # Examples
///
/// ```no_run
/// use seo_assistant::providers::{CompletionResponse, Message, Provider};
/// use seo_assistant::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     fn name(&self) -> &str {
///         "mine"
///     }
///
///     fn model(&self) -> String {
///         "my-model".to_string()
///     }
///
///     async fn complete(&self, _messages: &[Message]) -> Result<CompletionResponse> {
///         Ok(CompletionResponse::new(Message::assistant("{}")))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider identifier used in logs
    fn name(&self) -> &str;

    /// Model requested from the backend
    fn model(&self) -> String;

    /// Completes a conversation in JSON mode
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Generation` if the request fails or the
    /// response cannot be decoded
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Sends a system instruction and a user payload, returning a JSON object
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Generation` on provider failure or when the
    /// reply is not a JSON object
    async fn chat_json(&self, system: &str, payload: &str) -> Result<Map<String, Value>> {
        let messages = [Message::system(system), Message::user(payload)];
        let response = self.complete(&messages).await?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                provider = self.name(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generation token usage"
            );
        }

        parse_json_object(&response.message.content)
    }
}

/// Parses a completion body into a JSON object
///
/// Surrounding whitespace and a single Markdown code fence are tolerated.
///
/// # Errors
///
/// Returns `SeoAssistantError::Generation` if the text is not JSON or is
/// JSON but not an object
pub fn parse_json_object(content: &str) -> Result<Map<String, Value>> {
    let body = strip_code_fence(content.trim());

    let value: Value = serde_json::from_str(body).map_err(|e| {
        SeoAssistantError::Generation(format!("Provider returned invalid JSON: {}", e))
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(SeoAssistantError::Generation(format!(
            "Provider returned JSON {} instead of an object",
            json_type_name(&other)
        ))
        .into()),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
