//! SEO assistant library
//!
//! This library provides a conversational backend that turns user
//! instructions into structured SEO suggestions (page title, body, title tag,
//! meta description and keywords). Turns run synchronously or as background
//! jobs polled by clients.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Context assembly, the generation pipeline, validation and jobs
//! - `providers`: Generation backends (OpenAI-compatible, Ollama, scripted)
//! - `storage`: SQLite persistence for users, sessions, messages and jobs
//! - `identity`: Bearer token verification against a JWKS key set
//! - `knowledge`: SEO guideline retrieval
//! - `service`: Session and message operations
//! - `server`: HTTP API
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use seo_assistant::{Config, SessionService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let service = SessionService::from_config(&config)?;
//!     let start = service
//!         .start_session_sync("user-1", "Write a page about trail shoes", None)
//!         .await?;
//!     println!("{}", start.session.title);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod knowledge;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use agent::{PipelineOutput, Suggestion, SuggestionPipeline};
pub use config::Config;
pub use error::{Result, SeoAssistantError};
pub use service::SessionService;
pub use storage::SqliteStorage;

#[cfg(test)]
pub mod test_utils;
