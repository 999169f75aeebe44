use super::{format_timestamp, new_id, parse_timestamp, Role, SqliteStorage, StoredMessage};
use crate::agent::suggestion::Suggestion;
use crate::error::{Result, SeoAssistantError};
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, suggested_page_title, \
     suggested_page_content, suggested_title_tag, suggested_meta_description, \
     suggested_meta_keywords, created_at, updated_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let role_raw: String = row.get(2)?;
    let role = role_raw.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let suggestion = match role {
        Role::User => None,
        Role::Agent => {
            let keywords_raw: Option<String> = row.get(8)?;
            let meta_keywords = match keywords_raw {
                Some(raw) => serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        8,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                None => Vec::new(),
            };
            Some(Suggestion {
                page_title: row.get(4)?,
                page_content: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                title_tag: row.get(6)?,
                meta_description: row.get(7)?,
                meta_keywords,
            })
        }
    };

    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role,
        content: row.get(3)?,
        suggestion,
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}

/// Insert an agent message on an existing connection or transaction
pub(super) fn insert_agent_message(
    conn: &Connection,
    session_id: &str,
    suggestion: &Suggestion,
) -> Result<StoredMessage> {
    let id = new_id();
    let created = Utc::now();
    let now = format_timestamp(&created);
    let keywords = serde_json::to_string(&suggestion.meta_keywords)
        .context("Failed to serialize keywords")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

    conn.execute(
        "INSERT INTO messages (id, session_id, role, content, suggested_page_title,
            suggested_page_content, suggested_title_tag, suggested_meta_description,
            suggested_meta_keywords, created_at, updated_at)
        VALUES (?, ?, 'agent', '', ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            session_id,
            suggestion.page_title,
            suggestion.page_content,
            suggestion.title_tag,
            suggestion.meta_description,
            keywords,
            now,
            now
        ],
    )
    .context("Failed to insert agent message")
    .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

    Ok(StoredMessage {
        id,
        session_id: session_id.to_string(),
        role: Role::Agent,
        content: String::new(),
        suggestion: Some(suggestion.clone()),
        created_at: created,
        updated_at: created,
    })
}

impl SqliteStorage {
    /// Append a user turn to a session
    pub fn create_user_message(&self, session_id: &str, content: &str) -> Result<StoredMessage> {
        let conn = self.open()?;
        let id = new_id();
        let created = Utc::now();
        let now = format_timestamp(&created);

        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, created_at, updated_at)
            VALUES (?, ?, 'user', ?, ?, ?)",
            params![id, session_id, content, now, now],
        )
        .context("Failed to insert user message")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        Ok(StoredMessage {
            id,
            session_id: session_id.to_string(),
            role: Role::User,
            content: content.to_string(),
            suggestion: None,
            created_at: created,
            updated_at: created,
        })
    }

    /// Append an agent turn carrying `suggestion` to a session
    pub fn create_agent_message(
        &self,
        session_id: &str,
        suggestion: &Suggestion,
    ) -> Result<StoredMessage> {
        let conn = self.open()?;
        insert_agent_message(&conn, session_id, suggestion)
    }

    /// Load a message by id
    pub fn get_message(&self, id: &str) -> Result<Option<StoredMessage>> {
        let conn = self.open()?;

        conn.query_row(
            &format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS),
            params![id],
            message_from_row,
        )
        .optional()
        .context("Failed to query message")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
    }

    /// List a session's messages in conversation order
    pub fn list_messages(
        &self,
        session_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM messages WHERE session_id = ?
                ORDER BY created_at ASC, rowid ASC LIMIT ? OFFSET ?",
                MESSAGE_COLUMNS
            ))
            .context("Failed to prepare message listing")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![session_id, limit as i64, offset as i64],
                message_from_row,
            )
            .context("Failed to query messages")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(
                row.context("Failed to read message row")
                    .map_err(|e| SeoAssistantError::Storage(e.to_string()))?,
            );
        }

        Ok(messages)
    }

    /// Earliest user message of a session
    pub fn first_user_message(&self, session_id: &str) -> Result<Option<StoredMessage>> {
        let conn = self.open()?;

        conn.query_row(
            &format!(
                "SELECT {} FROM messages WHERE session_id = ? AND role = 'user'
                ORDER BY created_at ASC, rowid ASC LIMIT 1",
                MESSAGE_COLUMNS
            ),
            params![session_id],
            message_from_row,
        )
        .optional()
        .context("Failed to query first user message")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
    }

    /// Most recent agent message of a session
    pub fn last_agent_message(&self, session_id: &str) -> Result<Option<StoredMessage>> {
        let conn = self.open()?;

        conn.query_row(
            &format!(
                "SELECT {} FROM messages WHERE session_id = ? AND role = 'agent'
                ORDER BY created_at DESC, rowid DESC LIMIT 1",
                MESSAGE_COLUMNS
            ),
            params![session_id],
            message_from_row,
        )
        .optional()
        .context("Failed to query last agent message")
        .map_err(|e| SeoAssistantError::Storage(e.to_string()).into())
    }
}
