//! Opening versus continuation turns
//!
//! A user message is the opening turn of its session when it is the
//! session's first user message. Every later message is a continuation and
//! is anchored to that first request and to the latest agent draft.

use crate::agent::suggestion::Suggestion;
use crate::error::Result;
use crate::storage::SqliteStorage;

/// Conversation history relevant to one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum History {
    /// First user turn of the session
    Opening,
    /// Later turn, anchored to earlier conversation
    Continuation {
        /// Content of the session's first user message
        anchor: Option<String>,
        /// Suggestion of the most recent agent message
        draft: Option<Suggestion>,
    },
}

impl History {
    /// Whether this is a continuation turn
    pub fn is_continuation(&self) -> bool {
        matches!(self, Self::Continuation { .. })
    }

    /// Anchor text, if any
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Self::Continuation { anchor, .. } => anchor.as_deref(),
            Self::Opening => None,
        }
    }

    /// Current draft, if any
    pub fn draft(&self) -> Option<&Suggestion> {
        match self {
            Self::Continuation { draft, .. } => draft.as_ref(),
            Self::Opening => None,
        }
    }
}

/// Classify `user_message_id` within its session
///
/// Reads a snapshot of the first user message and the latest agent message.
pub fn classify(
    storage: &SqliteStorage,
    session_id: &str,
    user_message_id: &str,
) -> Result<History> {
    let first = storage.first_user_message(session_id)?;

    let first = match first {
        Some(first) if first.id != user_message_id => first,
        _ => {
            tracing::debug!(session_id = %session_id, "Opening turn");
            return Ok(History::Opening);
        }
    };

    let draft = storage
        .last_agent_message(session_id)?
        .and_then(|message| message.suggestion);
    let anchor = Some(first.content).filter(|c| !c.is_empty());

    tracing::debug!(
        session_id = %session_id,
        has_draft = draft.is_some(),
        "Continuation turn"
    );

    Ok(History::Continuation { anchor, draft })
}
