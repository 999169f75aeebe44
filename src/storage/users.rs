use super::{format_timestamp, new_id, parse_timestamp, SqliteStorage, StoredUser};
use crate::error::{Result, SeoAssistantError};
use crate::identity::Claims;
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, auth_subject, email, display_name, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<StoredUser> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(StoredUser {
        id: row.get(0)?,
        auth_subject: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
        updated_at: parse_timestamp(5, &updated_at)?,
    })
}

impl SqliteStorage {
    /// Resolve verified claims to a user, creating one on first sight
    ///
    /// Matches by subject first, then by email. Idempotent for the same
    /// claims.
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Unauthorized` if the claims carry neither
    /// a subject nor an email
    pub fn ensure_user(&self, claims: &Claims) -> Result<StoredUser> {
        let subject = claims.subject_id.as_deref().filter(|s| !s.is_empty());
        let email = claims.email.as_deref().filter(|e| !e.is_empty());

        if subject.is_none() && email.is_none() {
            return Err(
                SeoAssistantError::Unauthorized("Invalid token (no sub/email)".to_string()).into(),
            );
        }

        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        let mut existing = None;
        if let Some(subject) = subject {
            existing = tx
                .query_row(
                    &format!("SELECT {} FROM users WHERE auth_subject = ?", USER_COLUMNS),
                    params![subject],
                    user_from_row,
                )
                .optional()
                .context("Failed to query user by subject")
                .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;
        }

        if existing.is_none() {
            if let Some(email) = email {
                existing = tx
                    .query_row(
                        &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                        params![email],
                        user_from_row,
                    )
                    .optional()
                    .context("Failed to query user by email")
                    .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;
            }
        }

        if let Some(user) = existing {
            return Ok(user);
        }

        let id = new_id();
        let created = Utc::now();
        let now = format_timestamp(&created);
        tx.execute(
            "INSERT INTO users (id, auth_subject, email, display_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)",
            params![id, subject, email, claims.display_name, now, now],
        )
        .context("Failed to insert user")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        tracing::info!(user_id = %id, "Created user");

        Ok(StoredUser {
            id,
            auth_subject: subject.map(String::from),
            email: email.map(String::from),
            display_name: claims.display_name.clone(),
            created_at: created,
            updated_at: created,
        })
    }

    /// Load a user by id
    pub fn get_user(&self, id: &str) -> Result<Option<StoredUser>> {
        let conn = self.open()?;

        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            params![id],
            user_from_row,
        )
        .optional()
        .context("Failed to query user")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
    }
}
