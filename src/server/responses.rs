//! Request and response bodies, and the error-to-status mapping

use crate::error::{error_kind, ErrorKind};
use crate::service::{AsyncMessage, AsyncSessionStart, JobStatusView, SessionStart};
use crate::storage::{JobStatus, Role, SessionSummary, StoredMessage, StoredSession};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Body of `POST /sessions` and `POST /sessions/async`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreateRequest {
    /// Opening instruction
    pub message: String,
    /// Explicit title; derived from the message when absent
    #[serde(default)]
    pub title: Option<String>,
}

/// Body of the message post endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreateRequest {
    /// User instruction
    pub message: String,
}

/// Body of `PATCH /sessions/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdateRequest {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
}

/// `limit`/`offset` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// Page size
    pub limit: Option<usize>,
    /// Rows to skip
    pub offset: Option<usize>,
}

/// Message as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct MessageOut {
    pub id: String,
    pub role: Role,
    pub message_content: String,
    pub suggested_page_title: Option<String>,
    pub suggested_page_content: Option<String>,
    pub suggested_title_tag: Option<String>,
    pub suggested_meta_description: Option<String>,
    pub suggested_meta_keywords: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredMessage> for MessageOut {
    fn from(message: &StoredMessage) -> Self {
        let suggestion = message.suggestion.as_ref();
        Self {
            id: message.id.clone(),
            role: message.role,
            message_content: message.content.clone(),
            suggested_page_title: suggestion.and_then(|s| s.page_title.clone()),
            suggested_page_content: suggestion.map(|s| s.page_content.clone()),
            suggested_title_tag: suggestion.and_then(|s| s.title_tag.clone()),
            suggested_meta_description: suggestion.and_then(|s| s.meta_description.clone()),
            suggested_meta_keywords: suggestion.map(|s| s.meta_keywords.clone()),
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

/// Response of a synchronous session start
#[derive(Debug, Clone, Serialize)]
pub struct SessionStartResponse {
    pub session_id: String,
    pub user_id: String,
    pub session_title: String,
    pub user_message: MessageOut,
    pub agent_message: MessageOut,
}

impl From<&SessionStart> for SessionStartResponse {
    fn from(start: &SessionStart) -> Self {
        Self {
            session_id: start.session.id.clone(),
            user_id: start.session.user_id.clone(),
            session_title: start.session.title.clone(),
            user_message: MessageOut::from(&start.user_message),
            agent_message: MessageOut::from(&start.agent_message),
        }
    }
}

/// Response of an asynchronous session start
#[derive(Debug, Clone, Serialize)]
pub struct AsyncSessionStartResponse {
    pub session_id: String,
    pub session_title: String,
    pub job_id: String,
    pub user_message: MessageOut,
    pub status: JobStatus,
}

impl From<&AsyncSessionStart> for AsyncSessionStartResponse {
    fn from(start: &AsyncSessionStart) -> Self {
        Self {
            session_id: start.session.id.clone(),
            session_title: start.session.title.clone(),
            job_id: start.job.id.clone(),
            user_message: MessageOut::from(&start.user_message),
            status: start.job.status,
        }
    }
}

/// Response of an asynchronous message post
#[derive(Debug, Clone, Serialize)]
pub struct AsyncMessageResponse {
    /// User message id
    pub id: String,
    pub session_id: String,
    pub job_id: String,
    pub user_message: MessageOut,
    pub status: JobStatus,
}

impl From<&AsyncMessage> for AsyncMessageResponse {
    fn from(posted: &AsyncMessage) -> Self {
        Self {
            id: posted.user_message.id.clone(),
            session_id: posted.user_message.session_id.clone(),
            job_id: posted.job.id.clone(),
            user_message: MessageOut::from(&posted.user_message),
            status: posted.job.status,
        }
    }
}

/// Response of `GET /jobs/{id}/status`
///
/// `agent_message` appears only for completed jobs, `error_message` only for
/// failed ones.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_message: Option<MessageOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JobStatusView> for JobStatusResponse {
    fn from(view: &JobStatusView) -> Self {
        let job = &view.job;
        let agent_message = match job.status {
            JobStatus::Completed => view.agent_message.as_ref().map(MessageOut::from),
            _ => None,
        };
        let error_message = match job.status {
            JobStatus::Failed => job.error_message.clone(),
            _ => None,
        };

        Self {
            job_id: job.id.clone(),
            status: job.status,
            agent_message,
            processing_time_seconds: job.processing_time_seconds,
            error_message,
            updated_at: job.updated_at,
        }
    }
}

/// Entry of `GET /sessions`
#[derive(Debug, Clone, Serialize)]
pub struct SessionListResponse {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl From<&SessionSummary> for SessionListResponse {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            last_message_at: summary.last_message_at,
        }
    }
}

/// Response of `PATCH /sessions/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdateResponse {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredSession> for SessionUpdateResponse {
    fn from(session: &StoredSession) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            updated_at: session.updated_at,
        }
    }
}

/// Error returned from handlers
///
/// Rendered as `{"detail": "..."}` with a status chosen by error kind.
#[derive(Debug)]
pub struct ApiError(pub anyhow::Error);

impl ApiError {
    /// Status code for this error
    pub fn status(&self) -> StatusCode {
        match error_kind(&self.0) {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Generation => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %format!("{:#}", self.0), "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "Request rejected");
            self.0.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
