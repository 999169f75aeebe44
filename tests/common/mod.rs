use async_trait::async_trait;
use seo_assistant::agent::context::Constraints;
use seo_assistant::agent::SuggestionPipeline;
use seo_assistant::error::SeoAssistantError;
use seo_assistant::identity::{Claims, IdentityVerifier};
use seo_assistant::knowledge::NoKnowledge;
use seo_assistant::providers::FakeProvider;
use seo_assistant::server::AppState;
use seo_assistant::service::{JobStatusView, SessionService};
use seo_assistant::storage::SqliteStorage;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const MAX_ERROR_LENGTH: usize = 40;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("seo.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn create_service(provider: Arc<FakeProvider>) -> (SessionService, TempDir) {
    let (storage, tmp) = create_temp_storage();
    let pipeline = SuggestionPipeline::new(
        provider,
        Arc::new(NoKnowledge),
        Constraints::default(),
        Duration::from_secs(5),
    );
    (
        SessionService::new(storage, Arc::new(pipeline), MAX_ERROR_LENGTH),
        tmp,
    )
}

/// Verifier that accepts `token-<name>` and maps it to subject `<name>`
#[allow(dead_code)]
pub struct StaticVerifier;

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> seo_assistant::Result<Claims> {
        let subject = token
            .strip_prefix("token-")
            .ok_or_else(|| SeoAssistantError::Unauthorized("Invalid token".to_string()))?;

        Ok(Claims {
            subject_id: Some(subject.to_string()),
            email: Some(format!("{}@example.com", subject)),
            display_name: None,
        })
    }
}

#[allow(dead_code)]
pub fn create_app_state(provider: Arc<FakeProvider>) -> (Arc<AppState>, TempDir) {
    let (service, tmp) = create_service(provider);
    (Arc::new(AppState::new(service, Arc::new(StaticVerifier))), tmp)
}

/// Poll a job until it reaches a terminal state
#[allow(dead_code)]
pub async fn wait_for_terminal(
    service: &SessionService,
    user_id: &str,
    job_id: &str,
) -> JobStatusView {
    for _ in 0..300 {
        let view = service
            .job_status(user_id, job_id)
            .expect("job status lookup failed");
        if view.job.status.is_terminal() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state", job_id);
}
