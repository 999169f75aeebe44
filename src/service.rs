//! Session and message operations
//!
//! `SessionService` is the entry point used by the HTTP layer and the CLI.
//! Synchronous operations run the pipeline inline and return the agent
//! message. Asynchronous operations persist a `pending` job and hand it to a
//! detached task.

use crate::agent::history;
use crate::agent::job::JobRunner;
use crate::agent::pipeline::{SuggestionPipeline, TurnInput};
use crate::config::Config;
use crate::error::{Result, SeoAssistantError};
use crate::providers::{create_provider, Provider};
use crate::storage::{SessionSummary, SqliteStorage, StoredJob, StoredMessage, StoredSession};
use std::sync::Arc;

/// Default number of sessions per listing
pub const DEFAULT_SESSION_LIMIT: usize = 50;
/// Largest allowed session listing
pub const MAX_SESSION_LIMIT: usize = 100;
/// Default number of messages per listing
pub const DEFAULT_MESSAGE_LIMIT: usize = 100;
/// Largest allowed message listing
pub const MAX_MESSAGE_LIMIT: usize = 500;
/// Longest allowed session title, in characters
pub const MAX_TITLE_LENGTH: usize = 255;

const AUTO_TITLE_LENGTH: usize = 30;
const DEFAULT_TITLE: &str = "New session";

/// Result of a synchronous session start
#[derive(Debug, Clone)]
pub struct SessionStart {
    /// Created session
    pub session: StoredSession,
    /// Opening user message
    pub user_message: StoredMessage,
    /// Generated agent reply
    pub agent_message: StoredMessage,
}

/// Result of an asynchronous session start
#[derive(Debug, Clone)]
pub struct AsyncSessionStart {
    /// Created session
    pub session: StoredSession,
    /// Opening user message
    pub user_message: StoredMessage,
    /// Job generating the reply
    pub job: StoredJob,
}

/// Result of an asynchronous message post
#[derive(Debug, Clone)]
pub struct AsyncMessage {
    /// Posted user message
    pub user_message: StoredMessage,
    /// Job generating the reply
    pub job: StoredJob,
}

/// Job with its agent message, when one exists
#[derive(Debug, Clone)]
pub struct JobStatusView {
    /// The job record
    pub job: StoredJob,
    /// Agent message of a completed job; absent if it was deleted
    pub agent_message: Option<StoredMessage>,
}

/// Session, message and job operations for authenticated users
#[derive(Clone)]
pub struct SessionService {
    storage: SqliteStorage,
    pipeline: Arc<SuggestionPipeline>,
    runner: JobRunner,
}

impl SessionService {
    /// Create a service over shared storage and pipeline
    pub fn new(
        storage: SqliteStorage,
        pipeline: Arc<SuggestionPipeline>,
        max_error_length: usize,
    ) -> Self {
        let runner = JobRunner::new(storage.clone(), Arc::clone(&pipeline), max_error_length);
        Self {
            storage,
            pipeline,
            runner,
        }
    }

    /// Build the service described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be created or the database
    /// cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider: Arc<dyn Provider> = Arc::from(create_provider(&config.provider)?);
        Self::with_provider(config, provider)
    }

    /// Build the service with an explicit provider
    pub fn with_provider(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let storage = SqliteStorage::from_config(&config.storage)?;
        let pipeline = SuggestionPipeline::from_config(config, provider);

        Ok(Self::new(
            storage,
            Arc::new(pipeline),
            config.generation.max_error_length,
        ))
    }

    /// Underlying storage
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Job runner used for asynchronous turns
    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Start a session and generate the first reply inline
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Validation` for a blank message or bad
    /// title; generation errors propagate unchanged
    pub async fn start_session_sync(
        &self,
        user_id: &str,
        message: &str,
        title: Option<&str>,
    ) -> Result<SessionStart> {
        let (session, user_message) = self.open_session(user_id, message, title)?;
        let agent_message = self.reply(&session, &user_message).await?;

        Ok(SessionStart {
            session,
            user_message,
            agent_message,
        })
    }

    /// Start a session and queue the first reply as a background job
    pub async fn start_session_async(
        &self,
        user_id: &str,
        message: &str,
        title: Option<&str>,
    ) -> Result<AsyncSessionStart> {
        let (session, user_message) = self.open_session(user_id, message, title)?;
        let job = self.enqueue(user_id, &session.id, &user_message.id)?;

        Ok(AsyncSessionStart {
            session,
            user_message,
            job,
        })
    }

    /// Post a message to an owned session and generate the reply inline
    ///
    /// Returns the agent message.
    pub async fn add_message_sync(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<StoredMessage> {
        require_message(message)?;
        let session = self.owned_session(session_id, user_id)?;

        let user_message = self.storage.create_user_message(&session.id, message)?;
        self.reply(&session, &user_message).await
    }

    /// Post a message to an owned session and queue the reply
    pub async fn add_message_async(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<AsyncMessage> {
        require_message(message)?;
        let session = self.owned_session(session_id, user_id)?;

        let user_message = self.storage.create_user_message(&session.id, message)?;
        let job = self.enqueue(user_id, &session.id, &user_message.id)?;

        Ok(AsyncMessage { user_message, job })
    }

    /// Look up a job owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::NotFound` if the job is unknown or
    /// belongs to another user
    pub fn job_status(&self, user_id: &str, job_id: &str) -> Result<JobStatusView> {
        let job = self
            .storage
            .get_job(job_id)?
            .filter(|job| job.user_id == user_id)
            .ok_or_else(|| SeoAssistantError::NotFound("Job not found".to_string()))?;

        let agent_message = match &job.agent_message_id {
            Some(id) => self.storage.get_message(id)?,
            None => None,
        };

        Ok(JobStatusView { job, agent_message })
    }

    /// List a user's sessions, most recently active first
    pub fn list_sessions(
        &self,
        user_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<SessionSummary>> {
        let limit = clamp_limit(limit, DEFAULT_SESSION_LIMIT, MAX_SESSION_LIMIT);
        self.storage
            .list_sessions(user_id, limit, offset.unwrap_or(0))
    }

    /// List messages of an owned session in conversation order
    pub fn list_messages(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<StoredMessage>> {
        let session = self.owned_session(session_id, user_id)?;
        let limit = clamp_limit(limit, DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT);
        self.storage
            .list_messages(&session.id, limit, offset.unwrap_or(0))
    }

    /// Apply an update to an owned session
    ///
    /// A `None` title leaves the session unchanged.
    pub fn update_session(
        &self,
        user_id: &str,
        session_id: &str,
        title: Option<&str>,
    ) -> Result<StoredSession> {
        let Some(title) = title else {
            return self.owned_session(session_id, user_id);
        };

        let title = require_title(title)?;
        self.storage
            .update_session_title(session_id, user_id, title)?
            .ok_or_else(|| SeoAssistantError::NotFound("Session not found".to_string()).into())
    }

    /// Delete an owned session and its messages
    pub fn delete_session(&self, user_id: &str, session_id: &str) -> Result<()> {
        if self.storage.delete_session(session_id, user_id)? {
            Ok(())
        } else {
            Err(SeoAssistantError::NotFound("Session not found".to_string()).into())
        }
    }

    fn open_session(
        &self,
        user_id: &str,
        message: &str,
        title: Option<&str>,
    ) -> Result<(StoredSession, StoredMessage)> {
        require_message(message)?;
        // A blank title at session start means "pick one for me"
        let title = match title.filter(|t| !t.trim().is_empty()) {
            Some(title) => require_title(title)?.to_string(),
            None => auto_title(message),
        };

        let session = self.storage.create_session(user_id, &title)?;
        let user_message = self.storage.create_user_message(&session.id, message)?;
        tracing::info!(session_id = %session.id, title = %session.title, "Session started");

        Ok((session, user_message))
    }

    fn owned_session(&self, session_id: &str, user_id: &str) -> Result<StoredSession> {
        self.storage
            .get_session(session_id, user_id)?
            .ok_or_else(|| SeoAssistantError::NotFound("Session not found".to_string()).into())
    }

    async fn reply(
        &self,
        session: &StoredSession,
        user_message: &StoredMessage,
    ) -> Result<StoredMessage> {
        let history = history::classify(&self.storage, &session.id, &user_message.id)?;
        let turn = TurnInput {
            session_title: session.title.clone(),
            instruction: user_message.content.clone(),
            history,
        };

        let output = self.pipeline.run(&turn).await?;
        self.storage
            .create_agent_message(&session.id, &output.suggestion)
    }

    fn enqueue(&self, user_id: &str, session_id: &str, user_message_id: &str) -> Result<StoredJob> {
        let job = self.storage.create_job(user_id, session_id, user_message_id)?;
        tracing::info!(job_id = %job.id, session_id = %session_id, "Job queued");

        let runner = self.runner.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            runner.process(&job_id).await;
        });

        Ok(job)
    }
}

/// Title derived from the first message
///
/// Whitespace is collapsed; text longer than 30 characters is cut to 29 and
/// suffixed with `…`.
///
/// # Examples
///
/// ```
/// use seo_assistant::service::auto_title;
///
/// assert_eq!(auto_title("  running   shoes "), "running shoes");
/// assert_eq!(auto_title("   "), "New session");
/// ```
pub fn auto_title(message: &str) -> String {
    let text = message.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() > AUTO_TITLE_LENGTH {
        let mut title: String = text.chars().take(AUTO_TITLE_LENGTH - 1).collect();
        title.push('…');
        title
    } else if text.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        text
    }
}

fn require_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(SeoAssistantError::Validation("Message must not be empty".to_string()).into());
    }
    Ok(())
}

fn require_title(title: &str) -> Result<&str> {
    if title.trim().is_empty() {
        return Err(SeoAssistantError::Validation("Title must not be empty".to_string()).into());
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(SeoAssistantError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        ))
        .into());
    }
    Ok(title)
}

fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).min(max)
}
