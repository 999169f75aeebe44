use super::{
    format_timestamp, new_id, now_timestamp, parse_timestamp, SessionSummary, SqliteStorage,
    StoredSession,
};
use crate::error::{Result, SeoAssistantError};
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSession> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(StoredSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
        updated_at: parse_timestamp(4, &updated_at)?,
    })
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(SeoAssistantError::Validation("Session title cannot be empty".into()).into());
    }
    Ok(())
}

impl SqliteStorage {
    /// Create a session owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Validation` if the title is blank
    pub fn create_session(&self, user_id: &str, title: &str) -> Result<StoredSession> {
        require_title(title)?;

        let conn = self.open()?;
        let id = new_id();
        let created = Utc::now();
        let now = format_timestamp(&created);

        conn.execute(
            "INSERT INTO sessions (id, user_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)",
            params![id, user_id, title, now, now],
        )
        .context("Failed to insert session")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        tracing::debug!(session_id = %id, user_id = %user_id, "Created session");

        Ok(StoredSession {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: created,
            updated_at: created,
        })
    }

    /// Load a session if it exists and belongs to `user_id`
    pub fn get_session(&self, id: &str, user_id: &str) -> Result<Option<StoredSession>> {
        let conn = self.open()?;

        conn.query_row(
            "SELECT id, user_id, title, created_at, updated_at
            FROM sessions WHERE id = ? AND user_id = ?",
            params![id, user_id],
            session_from_row,
        )
        .optional()
        .context("Failed to query session")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
    }

    /// Load a session regardless of owner
    ///
    /// Used by background jobs, which already carry an owner check.
    pub(crate) fn get_session_unscoped(&self, id: &str) -> Result<Option<StoredSession>> {
        let conn = self.open()?;

        conn.query_row(
            "SELECT id, user_id, title, created_at, updated_at FROM sessions WHERE id = ?",
            params![id],
            session_from_row,
        )
        .optional()
        .context("Failed to query session")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
    }

    /// List a user's sessions, most recently active first
    ///
    /// Sessions are ordered by their latest message time (creation time for
    /// sessions without messages), then by creation time.
    pub fn list_sessions(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionSummary>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT s.id, s.title, s.created_at, s.updated_at,
                    COALESCE(m.last_message_at, s.created_at) AS last_activity
                FROM sessions s
                LEFT JOIN (
                    SELECT session_id, MAX(created_at) AS last_message_at
                    FROM messages GROUP BY session_id
                ) m ON m.session_id = s.id
                WHERE s.user_id = ?
                ORDER BY last_activity DESC, s.created_at DESC
                LIMIT ? OFFSET ?",
            )
            .context("Failed to prepare session listing")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id, limit as i64, offset as i64], |row| {
                let created_at: String = row.get(2)?;
                let updated_at: String = row.get(3)?;
                let last_message_at: String = row.get(4)?;
                Ok(SessionSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: parse_timestamp(2, &created_at)?,
                    updated_at: parse_timestamp(3, &updated_at)?,
                    last_message_at: parse_timestamp(4, &last_message_at)?,
                })
            })
            .context("Failed to query sessions")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(
                row.context("Failed to read session row")
                    .map_err(|e| SeoAssistantError::Storage(e.to_string()))?,
            );
        }

        Ok(sessions)
    }

    /// Rename a session owned by `user_id`
    ///
    /// Returns `None` if the session does not exist for this user.
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Validation` if the title is blank
    pub fn update_session_title(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
    ) -> Result<Option<StoredSession>> {
        require_title(title)?;

        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE sessions SET title = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![title, now_timestamp(), id, user_id],
            )
            .context("Failed to update session")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        if changed == 0 {
            return Ok(None);
        }

        self.get_session(id, user_id)
    }

    /// Delete a session owned by `user_id` along with all its messages
    ///
    /// Jobs that reference the session are left in place. Returns whether a
    /// session was deleted.
    pub fn delete_session(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.open()?;

        let deleted = conn
            .execute(
                "DELETE FROM sessions WHERE id = ? AND user_id = ?",
                params![id, user_id],
            )
            .context("Failed to delete session")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        if deleted > 0 {
            tracing::info!(session_id = %id, "Deleted session");
        }

        Ok(deleted > 0)
    }
}
