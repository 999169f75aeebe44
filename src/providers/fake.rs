//! Scripted in-process provider
//!
//! `FakeProvider` replays a queue of scripted replies and records the most
//! recent requests it receives. It backs the unit and integration tests and
//! can be selected at runtime with provider type `fake` for local demos.

use crate::error::{Result, SeoAssistantError};
use crate::providers::{CompletionResponse, Message, Provider};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// Return this text as the assistant message content
    Content(String),
    /// Fail with a generation error carrying this message
    Fail(String),
    /// Wait this long, then return the content
    Delayed(Duration, String),
}

/// Content returned once the script is exhausted
pub const DEFAULT_REPLY: &str = concat!(
    r#"{"page_title":"Generated Page","page_content":"Generated content.","#,
    r#""title_tag":"Generated Title","meta_description":"Generated meta description.","#,
    r#""meta_keywords":["seo","content"]}"#
);

/// Requests kept for inspection; older ones are dropped
pub const MAX_RECORDED_REQUESTS: usize = 64;

/// A provider that replays scripted replies
#[derive(Debug, Default)]
pub struct FakeProvider {
    replies: Mutex<VecDeque<FakeReply>>,
    requests: Mutex<VecDeque<Vec<Message>>>,
}

impl FakeProvider {
    /// Creates a provider with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that replays `replies` in order
    pub fn with_replies(replies: impl IntoIterator<Item = FakeReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the most recent message lists, oldest first
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Returns the user payload of each request
    pub fn payloads(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|messages| {
                messages
                    .into_iter()
                    .find(|m| m.role == "user")
                    .map(|m| m.content)
            })
            .collect()
    }

    fn record(&self, messages: &[Message]) {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        if requests.len() == MAX_RECORDED_REQUESTS {
            requests.pop_front();
        }
        requests.push_back(messages.to_vec());
    }

    fn next_reply(&self) -> FakeReply {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| FakeReply::Content(DEFAULT_REPLY.to_string()))
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> String {
        "scripted".to_string()
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        self.record(messages);

        match self.next_reply() {
            FakeReply::Content(content) => {
                Ok(CompletionResponse::new(Message::assistant(content)))
            }
            FakeReply::Fail(message) => Err(SeoAssistantError::Generation(message).into()),
            FakeReply::Delayed(delay, content) => {
                tokio::time::sleep(delay).await;
                Ok(CompletionResponse::new(Message::assistant(content)))
            }
        }
    }
}
