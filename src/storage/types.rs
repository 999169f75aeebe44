use crate::agent::suggestion::Suggestion;
use crate::error::SeoAssistantError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A resolved account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    /// Unique identifier for the user
    pub id: String,
    /// External identity subject
    pub auth_subject: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// When the user was created
    pub created_at: DateTime<Utc>,
    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// A conversation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Unique identifier for the session
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Session title, never empty
    pub title: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
}

/// A session row in a listing, with the time of its latest message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique identifier for the session
    pub id: String,
    /// Session title
    pub title: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
    /// Latest message time, or creation time for an empty session
    pub last_message_at: DateTime<Utc>,
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human turn
    User,
    /// Generated suggestion turn
    Agent,
}

impl Role {
    /// Returns the persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SeoAssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            other => Err(SeoAssistantError::Storage(format!("Unknown role: {}", other))),
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Unique identifier for the message
    pub id: String,
    /// Owning session
    pub session_id: String,
    /// Author, immutable once written
    pub role: Role,
    /// Text of a user turn; empty for agent turns
    pub content: String,
    /// Suggestion fields of an agent turn
    pub suggestion: Option<Suggestion>,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// When the message was last updated
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not yet picked up
    Pending,
    /// Generation in progress
    Generating,
    /// Agent message persisted
    Completed,
    /// Processing failed; terminal
    Failed,
}

impl JobStatus {
    /// Returns the persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` directly follows this state
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Generating)
                | (Self::Generating, Self::Completed)
                | (Self::Generating, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = SeoAssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(SeoAssistantError::Storage(format!(
                "Unknown job status: {}",
                other
            ))),
        }
    }
}

/// A background suggestion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredJob {
    /// Unique identifier for the job
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Session the job writes into
    pub session_id: String,
    /// User message that triggered the job
    pub user_message_id: String,
    /// Resulting agent message; set only when completed
    pub agent_message_id: Option<String>,
    /// Current status
    pub status: JobStatus,
    /// Elapsed seconds, set on a terminal transition
    pub processing_time_seconds: Option<f64>,
    /// Truncated failure text, set only when failed
    pub error_message: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}
