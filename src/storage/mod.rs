use crate::config::StorageConfig;
use crate::error::{Result, SeoAssistantError};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod jobs;
mod messages;
mod sessions;
pub mod types;
mod users;

pub use types::{
    JobStatus, Role, SessionSummary, StoredJob, StoredMessage, StoredSession, StoredUser,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    auth_subject TEXT UNIQUE,
    email TEXT UNIQUE,
    display_name TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL CHECK (length(title) > 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('user', 'agent')),
    content TEXT NOT NULL DEFAULT '',
    suggested_page_title TEXT,
    suggested_page_content TEXT,
    suggested_title_tag TEXT,
    suggested_meta_description TEXT,
    suggested_meta_keywords TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);

CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    user_message_id TEXT NOT NULL,
    agent_message_id TEXT,
    status TEXT NOT NULL,
    processing_time_seconds REAL,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id);
";

/// SQLite storage backend for users, sessions, messages and jobs
///
/// Every operation opens its own connection, so the handle is cheap to clone
/// and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a storage instance at the configured location
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new_with_path(config.resolve_database_path()?)
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// Parent directories are created and the schema is applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use seo_assistant::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("seo.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(SCHEMA)
            .context("Failed to create tables")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        tracing::debug!(db_path = %self.db_path.display(), "Storage initialized");
        Ok(())
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(|e| SeoAssistantError::Storage(e.to_string()))?;

        Ok(conn)
    }
}

/// Current time in the fixed-width form stored in every timestamp column
fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
