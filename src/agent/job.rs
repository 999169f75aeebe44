//! Background job state machine
//!
//! A job moves `pending -> generating -> completed | failed` and never
//! leaves a terminal state. [`JobRunner::process`] drives one job to a
//! terminal state and never returns an error: every failure after the job
//! entered `generating` is recorded on the job itself.

use crate::agent::history;
use crate::agent::metrics::JobMetrics;
use crate::agent::pipeline::{SuggestionPipeline, TurnInput};
use crate::error::{error_kind, ErrorKind, Result, SeoAssistantError};
use crate::storage::{JobStatus, SqliteStorage, StoredMessage};
use std::sync::Arc;
use std::time::Instant;

/// Coarse classification of a job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Provider error or unusable output
    Generation,
    /// Provider did not answer in time
    Timeout,
    /// Storage or bookkeeping failure
    Internal,
}

impl FailureKind {
    /// Classify an error from a job run
    pub fn classify(err: &anyhow::Error) -> Self {
        let timed_out = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<SeoAssistantError>(),
                Some(SeoAssistantError::Timeout { .. })
            )
        });
        if timed_out {
            return Self::Timeout;
        }

        match error_kind(err) {
            ErrorKind::Generation => Self::Generation,
            _ => Self::Internal,
        }
    }

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

/// How a call to [`JobRunner::process`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Job completed with the given agent message
    Completed {
        /// Persisted agent message id
        agent_message_id: String,
    },
    /// Job was marked failed
    Failed {
        /// Failure classification
        kind: FailureKind,
        /// Stored (truncated) error text
        error_message: String,
    },
    /// Job was missing or already claimed; nothing was changed
    Skipped,
    /// Storage failed before the job could be claimed; it is still pending
    Errored {
        /// Storage error text
        error_message: String,
    },
}

/// Drives background jobs through the generation pipeline
#[derive(Clone)]
pub struct JobRunner {
    storage: SqliteStorage,
    pipeline: Arc<SuggestionPipeline>,
    max_error_length: usize,
}

impl JobRunner {
    /// Create a runner
    pub fn new(
        storage: SqliteStorage,
        pipeline: Arc<SuggestionPipeline>,
        max_error_length: usize,
    ) -> Self {
        Self {
            storage,
            pipeline,
            max_error_length,
        }
    }

    /// Process one job to a terminal state
    pub async fn process(&self, job_id: &str) -> JobOutcome {
        let started = Instant::now();

        let job = match self.storage.get_job(job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(job_id = %job_id, "Job not found, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to load job");
                return JobOutcome::Errored {
                    error_message: format!("{:#}", e),
                };
            }
        };

        if !job.status.can_transition_to(JobStatus::Generating) {
            tracing::debug!(job_id = %job_id, status = %job.status, "Job already claimed");
            return JobOutcome::Skipped;
        }

        if let Err(e) = self.storage.mark_generating(job_id) {
            if lost_claim(&e) {
                tracing::warn!(job_id = %job_id, error = %e, "Job claimed elsewhere, skipping");
                return JobOutcome::Skipped;
            }
            tracing::error!(job_id = %job_id, error = %e, "Failed to mark job generating");
            return JobOutcome::Errored {
                error_message: format!("{:#}", e),
            };
        }

        let mut metrics = JobMetrics::new(job_id.to_string(), false);
        tracing::info!(job_id = %job_id, "Job generating");

        match self.generate(job_id, started, &mut metrics).await {
            Ok(message) => {
                metrics.record_completion();
                tracing::info!(
                    job_id = %job_id,
                    agent_message_id = %message.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
                JobOutcome::Completed {
                    agent_message_id: message.id,
                }
            }
            Err(e) => {
                let kind = FailureKind::classify(&e);
                let error_message = truncate_chars(&format!("{:#}", e), self.max_error_length);
                let elapsed = started.elapsed().as_secs_f64();

                if let Err(store_err) = self.storage.fail_job(job_id, &error_message, elapsed) {
                    tracing::error!(
                        job_id = %job_id,
                        error = %store_err,
                        "Failed to record job failure"
                    );
                }
                metrics.record_failure(kind.as_str());
                tracing::warn!(
                    job_id = %job_id,
                    kind = kind.as_str(),
                    error = %error_message,
                    "Job failed"
                );

                JobOutcome::Failed {
                    kind,
                    error_message,
                }
            }
        }
    }

    async fn generate(
        &self,
        job_id: &str,
        started: Instant,
        metrics: &mut JobMetrics,
    ) -> Result<StoredMessage> {
        let job = self
            .storage
            .get_job(job_id)?
            .ok_or_else(|| SeoAssistantError::NotFound(format!("Job {}", job_id)))?;

        let session = self
            .storage
            .get_session_unscoped(&job.session_id)?
            .ok_or_else(|| SeoAssistantError::NotFound("Session not found".to_string()))?;
        let user_message = self
            .storage
            .get_message(&job.user_message_id)?
            .ok_or_else(|| SeoAssistantError::NotFound("User message not found".to_string()))?;

        let history = history::classify(&self.storage, &session.id, &user_message.id)?;
        metrics.set_continuation(history.is_continuation());

        let turn = TurnInput {
            session_title: session.title,
            instruction: user_message.content,
            history,
        };
        let output = self.pipeline.run(&turn).await?;

        self.storage.complete_job_with_message(
            job_id,
            &session.id,
            &output.suggestion,
            started.elapsed().as_secs_f64(),
        )
    }
}

/// Whether a claim failed because the job vanished or moved on
fn lost_claim(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<SeoAssistantError>(),
            Some(SeoAssistantError::NotFound(_) | SeoAssistantError::InvalidTransition { .. })
        )
    })
}

/// Truncate to at most `max` characters
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FakeProvider, FakeReply};
    use crate::test_utils::{temp_storage, test_pipeline};
    use std::time::Duration;

    fn runner(
        storage: &SqliteStorage,
        provider: Arc<FakeProvider>,
        max_error: usize,
    ) -> JobRunner {
        JobRunner::new(storage.clone(), Arc::new(test_pipeline(provider)), max_error)
    }

    fn pending_job(storage: &SqliteStorage) -> (String, String) {
        let session = storage.create_session("user-1", "Shoes").unwrap();
        let message = storage.create_user_message(&session.id, "Write").unwrap();
        let job = storage.create_job("user-1", &session.id, &message.id).unwrap();
        (session.id, job.id)
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_classify_failure_kinds() {
        let timeout: anyhow::Error = SeoAssistantError::Timeout { seconds: 1 }.into();
        let generation: anyhow::Error = SeoAssistantError::Generation("x".into()).into();
        let storage: anyhow::Error = SeoAssistantError::Storage("x".into()).into();

        assert_eq!(FailureKind::classify(&timeout), FailureKind::Timeout);
        assert_eq!(FailureKind::classify(&generation), FailureKind::Generation);
        assert_eq!(FailureKind::classify(&storage), FailureKind::Internal);
    }

    #[tokio::test]
    async fn test_process_completes_job() {
        let (storage, _dir) = temp_storage();
        let (session_id, job_id) = pending_job(&storage);

        let outcome = runner(&storage, Arc::new(FakeProvider::new()), 500)
            .process(&job_id)
            .await;

        let JobOutcome::Completed { agent_message_id } = outcome else {
            panic!("expected completion, got {:?}", outcome);
        };
        let job = storage.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.agent_message_id.as_deref(), Some(agent_message_id.as_str()));
        assert!(job.processing_time_seconds.is_some());

        let agent = storage.last_agent_message(&session_id).unwrap().unwrap();
        assert_eq!(agent.id, agent_message_id);
    }

    #[tokio::test]
    async fn test_process_failure_truncates_error() {
        let (storage, _dir) = temp_storage();
        let (_, job_id) = pending_job(&storage);
        let provider = Arc::new(FakeProvider::with_replies([FakeReply::Fail("x".repeat(100))]));

        let outcome = runner(&storage, provider, 20).process(&job_id).await;

        assert!(matches!(
            outcome,
            JobOutcome::Failed {
                kind: FailureKind::Generation,
                ..
            }
        ));
        let job = storage.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.unwrap().chars().count(), 20);
        assert!(job.agent_message_id.is_none());
    }

    #[tokio::test]
    async fn test_process_missing_job_is_skipped() {
        let (storage, _dir) = temp_storage();
        let outcome = runner(&storage, Arc::new(FakeProvider::new()), 500)
            .process("nope")
            .await;
        assert_eq!(outcome, JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_terminal_job_is_not_reprocessed() {
        let (storage, _dir) = temp_storage();
        let (_, job_id) = pending_job(&storage);
        let runner = runner(&storage, Arc::new(FakeProvider::new()), 500);

        runner.process(&job_id).await;
        let outcome = runner.process(&job_id).await;

        assert_eq!(outcome, JobOutcome::Skipped);
        let job = storage.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_deleted_session_fails_job() {
        let (storage, _dir) = temp_storage();
        let (session_id, job_id) = pending_job(&storage);
        storage.delete_session(&session_id, "user-1").unwrap();

        let outcome = runner(&storage, Arc::new(FakeProvider::new()), 500)
            .process(&job_id)
            .await;

        assert!(matches!(
            outcome,
            JobOutcome::Failed {
                kind: FailureKind::Internal,
                ..
            }
        ));
        let job = storage.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_job() {
        let (storage, _dir) = temp_storage();
        let (_, job_id) = pending_job(&storage);
        let provider = Arc::new(FakeProvider::with_replies([FakeReply::Delayed(
            Duration::from_secs(60),
            r#"{"page_title": "Too late"}"#.to_string(),
        )]));

        let outcome = runner(&storage, provider, 500).process(&job_id).await;

        let JobOutcome::Failed {
            kind,
            error_message,
        } = outcome
        else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert_eq!(kind, FailureKind::Timeout);
        assert!(error_message.contains("timed out"));

        let job = storage.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.agent_message_id.is_none());
        assert!(job.error_message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_storage_failure_before_claim_is_reported() {
        let (storage, _dir) = temp_storage();
        let (_, job_id) = pending_job(&storage);
        let conn = rusqlite::Connection::open(storage.db_path()).unwrap();
        conn.execute_batch("DROP TABLE jobs").unwrap();

        let outcome = runner(&storage, Arc::new(FakeProvider::new()), 500)
            .process(&job_id)
            .await;

        let JobOutcome::Errored { error_message } = outcome else {
            panic!("expected storage error, got {:?}", outcome);
        };
        assert!(error_message.contains("Failed to query job"));
    }

    #[tokio::test]
    async fn test_generating_job_is_not_claimed_twice() {
        let (storage, _dir) = temp_storage();
        let (_, job_id) = pending_job(&storage);
        storage.mark_generating(&job_id).unwrap();
        let provider = Arc::new(FakeProvider::new());

        let outcome = runner(&storage, provider.clone(), 500).process(&job_id).await;

        assert_eq!(outcome, JobOutcome::Skipped);
        assert!(provider.requests().is_empty());
        let job = storage.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Generating);
    }

    #[test]
    fn test_lost_claim_distinguishes_storage_errors() {
        let moved: anyhow::Error = SeoAssistantError::InvalidTransition {
            from: "completed".into(),
            to: "generating".into(),
        }
        .into();
        let missing: anyhow::Error = SeoAssistantError::NotFound("Job x".into()).into();
        let broken: anyhow::Error = SeoAssistantError::Storage("disk I/O error".into()).into();

        assert!(lost_claim(&moved));
        assert!(lost_claim(&missing));
        assert!(!lost_claim(&broken));
    }
}
