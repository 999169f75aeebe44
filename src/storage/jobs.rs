use super::messages::insert_agent_message;
use super::{
    format_timestamp, new_id, now_timestamp, parse_timestamp, JobStatus, SqliteStorage, StoredJob,
    StoredMessage,
};
use crate::agent::suggestion::Suggestion;
use crate::error::{Result, SeoAssistantError};
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const JOB_COLUMNS: &str = "id, user_id, session_id, user_message_id, agent_message_id, status, \
     processing_time_seconds, error_message, created_at, updated_at";

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<StoredJob> {
    let status_raw: String = row.get(5)?;
    let status = status_raw.parse::<JobStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(StoredJob {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        user_message_id: row.get(3)?,
        agent_message_id: row.get(4)?,
        status,
        processing_time_seconds: row.get(6)?,
        error_message: row.get(7)?,
        created_at: parse_timestamp(8, &created_at)?,
        updated_at: parse_timestamp(9, &updated_at)?,
    })
}

fn query_job(conn: &Connection, id: &str) -> Result<Option<StoredJob>> {
    conn.query_row(
        &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
        params![id],
        job_from_row,
    )
    .optional()
    .context("Failed to query job")
    .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
}

/// Error for a guarded update that matched no row
fn rejected_transition(conn: &Connection, id: &str, to: JobStatus) -> anyhow::Error {
    match query_job(conn, id) {
        Ok(Some(job)) => SeoAssistantError::InvalidTransition {
            from: job.status.to_string(),
            to: to.to_string(),
        }
        .into(),
        Ok(None) => SeoAssistantError::NotFound(format!("Job {}", id)).into(),
        Err(e) => e,
    }
}

impl SqliteStorage {
    /// Create a `pending` job for a user message
    pub fn create_job(
        &self,
        user_id: &str,
        session_id: &str,
        user_message_id: &str,
    ) -> Result<StoredJob> {
        let conn = self.open()?;
        let id = new_id();
        let created = Utc::now();
        let now = format_timestamp(&created);

        conn.execute(
            "INSERT INTO jobs (id, user_id, session_id, user_message_id, status,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                user_id,
                session_id,
                user_message_id,
                JobStatus::Pending.as_str(),
                now,
                now
            ],
        )
        .context("Failed to insert job")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        tracing::debug!(job_id = %id, session_id = %session_id, "Created job");

        Ok(StoredJob {
            id,
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            user_message_id: user_message_id.to_string(),
            agent_message_id: None,
            status: JobStatus::Pending,
            processing_time_seconds: None,
            error_message: None,
            created_at: created,
            updated_at: created,
        })
    }

    /// Load a job by id
    pub fn get_job(&self, id: &str) -> Result<Option<StoredJob>> {
        let conn = self.open()?;
        query_job(&conn, id)
    }

    /// Move a job from `pending` to `generating`
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::InvalidTransition` if the job is not
    /// pending, or `SeoAssistantError::NotFound` if it does not exist
    pub fn mark_generating(&self, id: &str) -> Result<()> {
        let conn = self.open()?;

        let changed = conn
            .execute(
                "UPDATE jobs SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
                params![
                    JobStatus::Generating.as_str(),
                    now_timestamp(),
                    id,
                    JobStatus::Pending.as_str()
                ],
            )
            .context("Failed to update job status")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(rejected_transition(&conn, id, JobStatus::Generating));
        }

        Ok(())
    }

    /// Persist the agent message and complete the job in one transaction
    ///
    /// Either both writes land or neither does.
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::InvalidTransition` if the job is not
    /// generating; the agent message is rolled back in that case
    pub fn complete_job_with_message(
        &self,
        job_id: &str,
        session_id: &str,
        suggestion: &Suggestion,
        processing_time_seconds: f64,
    ) -> Result<StoredMessage> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        let message = insert_agent_message(&tx, session_id, suggestion)?;

        let changed = tx
            .execute(
                "UPDATE jobs SET status = ?, agent_message_id = ?, processing_time_seconds = ?,
                    updated_at = ?
                WHERE id = ? AND status = ?",
                params![
                    JobStatus::Completed.as_str(),
                    message.id,
                    processing_time_seconds,
                    now_timestamp(),
                    job_id,
                    JobStatus::Generating.as_str()
                ],
            )
            .context("Failed to complete job")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(rejected_transition(&tx, job_id, JobStatus::Completed));
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        Ok(message)
    }

    /// Move a job from `generating` to `failed`
    ///
    /// `error_message` is stored as given; callers bound its length.
    pub fn fail_job(
        &self,
        id: &str,
        error_message: &str,
        processing_time_seconds: f64,
    ) -> Result<()> {
        let conn = self.open()?;

        let changed = conn
            .execute(
                "UPDATE jobs SET status = ?, error_message = ?, processing_time_seconds = ?,
                    updated_at = ?
                WHERE id = ? AND status = ?",
                params![
                    JobStatus::Failed.as_str(),
                    error_message,
                    processing_time_seconds,
                    now_timestamp(),
                    id,
                    JobStatus::Generating.as_str()
                ],
            )
            .context("Failed to fail job")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(rejected_transition(&conn, id, JobStatus::Failed));
        }

        Ok(())
    }
}
