//! Test utilities for the SEO assistant
//!
//! This module provides common test utilities including temporary storage,
//! service construction over a scripted provider, and assertion helpers.

use crate::agent::context::Constraints;
use crate::agent::pipeline::SuggestionPipeline;
use crate::config::Config;
use crate::knowledge::NoKnowledge;
use crate::providers::FakeProvider;
use crate::service::SessionService;
use crate::storage::SqliteStorage;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create storage backed by a database in a fresh temporary directory
///
/// Keep the returned directory alive for as long as the storage is used.
pub fn temp_storage() -> (SqliteStorage, TempDir) {
    let dir = temp_dir();
    let storage =
        SqliteStorage::new_with_path(dir.path().join("seo.db")).expect("Failed to create storage");
    (storage, dir)
}

/// Create a pipeline over `provider` without knowledge retrieval
pub fn test_pipeline(provider: Arc<FakeProvider>) -> SuggestionPipeline {
    SuggestionPipeline::new(
        provider,
        Arc::new(NoKnowledge),
        Constraints::default(),
        Duration::from_secs(5),
    )
}

/// Create a session service over temporary storage and `provider`
pub fn test_service(provider: Arc<FakeProvider>) -> (SessionService, TempDir) {
    let (storage, dir) = temp_storage();
    let service = SessionService::new(storage, Arc::new(test_pipeline(provider)), 500);
    (service, dir)
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: anyhow::Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with the scripted provider
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.provider.provider_type = "fake".to_string();
    config
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
provider:
  type: ollama
  ollama:
    host: http://localhost:11434
    model: llama3.2:latest

generation:
  timeout_seconds: 30
  max_error_length: 200
  constraints:
    title_max: 60
    meta_description_min: 150
    meta_description_max: 160

auth:
  issuer: https://issuer.example.com
  audience: seo-api

knowledge:
  enabled: false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_storage_creates_database() {
        let (storage, _dir) = temp_storage();
        assert!(storage.db_path().exists());
    }
}
