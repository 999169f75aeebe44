//! End-to-end session scenarios over a scripted provider
//!
//! - A: synchronous session start yields a complete suggestion
//! - B: a follow-up message is generated as a continuation
//! - C: asynchronous submission is polled to completion
//! - D: a failing provider leaves a failed job and no agent message

mod common;

use common::{create_service, wait_for_terminal, MAX_ERROR_LENGTH};
use seo_assistant::providers::{FakeProvider, FakeReply};
use seo_assistant::storage::{JobStatus, Role};
use std::sync::Arc;
use std::time::Duration;

const FIRST_REPLY: &str = r#"{
    "page_title": "Wireless Headphones That Keep Up",
    "page_content": "Discover wireless headphones built for all-day comfort.",
    "title_tag": "Wireless Headphones | Long Battery, Deep Bass Sound",
    "meta_description": "Shop wireless headphones with long battery life and rich sound.",
    "meta_keywords": ["wireless headphones", "bluetooth headphones", "noise cancelling"]
}"#;

const SHORTER_REPLY: &str = r#"{
    "page_title": "Wireless Headphones That Keep Up",
    "page_content": "Discover wireless headphones built for all-day comfort.",
    "title_tag": "Wireless Headphones",
    "meta_description": "Shop wireless headphones with long battery life and rich sound.",
    "meta_keywords": ["wireless headphones", "bluetooth headphones"]
}"#;

#[tokio::test]
async fn test_scenario_a_sync_start_returns_complete_suggestion() {
    let provider = Arc::new(FakeProvider::with_replies([FakeReply::Content(
        FIRST_REPLY.to_string(),
    )]));
    let (service, _tmp) = create_service(provider.clone());

    let start = service
        .start_session_sync(
            "user-1",
            "Help me write a product page for wireless headphones",
            None,
        )
        .await
        .expect("sync start failed");

    let suggestion = start
        .agent_message
        .suggestion
        .as_ref()
        .expect("agent message has no suggestion");
    assert!(suggestion.page_title.is_some());
    assert!(!suggestion.page_content.is_empty());
    let title_tag = suggestion.title_tag.as_deref().expect("missing title tag");
    assert!(!title_tag.is_empty());
    assert!(title_tag.chars().count() <= 60);
    assert!(suggestion.meta_description.is_some());
    assert!(!suggestion.meta_keywords.is_empty());

    assert_eq!(start.session.title, "Help me write a product page …");
    let payload = &provider.payloads()[0];
    assert!(!payload.contains("Original Request"));
    assert!(!payload.contains("Current Draft"));
}

#[tokio::test]
async fn test_scenario_b_continuation_uses_anchor_and_draft() {
    let provider = Arc::new(FakeProvider::with_replies([
        FakeReply::Content(FIRST_REPLY.to_string()),
        FakeReply::Content(SHORTER_REPLY.to_string()),
    ]));
    let (service, _tmp) = create_service(provider.clone());

    let start = service
        .start_session_sync(
            "user-1",
            "Help me write a product page for wireless headphones",
            None,
        )
        .await
        .expect("sync start failed");
    let first_tag = start
        .agent_message
        .suggestion
        .as_ref()
        .and_then(|s| s.title_tag.clone())
        .expect("missing first title tag");

    let reply = service
        .add_message_sync("user-1", &start.session.id, "Make the title shorter")
        .await
        .expect("follow-up failed");

    let payload = &provider.payloads()[1];
    assert!(payload.contains(
        "Original Request: \"\"\"Help me write a product page for wireless headphones\"\"\""
    ));
    assert!(payload.contains("Current Draft:"));
    assert!(payload.contains(&format!("title_tag: {}", first_tag)));
    assert!(payload.contains("Current User Instruction: \"\"\"Make the title shorter\"\"\""));

    let second_tag = reply
        .suggestion
        .as_ref()
        .and_then(|s| s.title_tag.clone())
        .expect("missing second title tag");
    assert_ne!(first_tag, second_tag);

    let messages = service
        .list_messages("user-1", &start.session.id, None, None)
        .expect("list failed");
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Agent, Role::User, Role::Agent]);
}

#[tokio::test]
async fn test_scenario_c_async_job_is_polled_to_completion() {
    let provider = Arc::new(FakeProvider::with_replies([FakeReply::Delayed(
        Duration::from_millis(50),
        FIRST_REPLY.to_string(),
    )]));
    let (service, _tmp) = create_service(provider);

    let start = service
        .start_session_async("user-1", "Write about wireless headphones", None)
        .await
        .expect("async start failed");
    assert_eq!(start.job.status, JobStatus::Pending);

    let early = service
        .job_status("user-1", &start.job.id)
        .expect("early poll failed");
    assert!(matches!(
        early.job.status,
        JobStatus::Pending | JobStatus::Generating
    ));

    let done = wait_for_terminal(&service, "user-1", &start.job.id).await;
    assert_eq!(done.job.status, JobStatus::Completed);
    let agent = done.agent_message.expect("completed job has no agent message");
    assert_eq!(agent.role, Role::Agent);
    assert!(done.job.processing_time_seconds.expect("no processing time") > 0.0);
    assert!(done.job.error_message.is_none());
}

#[tokio::test]
async fn test_scenario_d_failed_job_truncates_error() {
    let provider = Arc::new(FakeProvider::with_replies([FakeReply::Fail(
        "upstream exploded ".repeat(20),
    )]));
    let (service, _tmp) = create_service(provider);

    let start = service
        .start_session_async("user-1", "Write about boots", None)
        .await
        .expect("async start failed");

    let done = wait_for_terminal(&service, "user-1", &start.job.id).await;
    assert_eq!(done.job.status, JobStatus::Failed);
    assert!(done.job.agent_message_id.is_none());
    assert!(done.agent_message.is_none());
    let error = done.job.error_message.expect("failed job has no error");
    assert_eq!(error.chars().count(), MAX_ERROR_LENGTH);

    let messages = service
        .list_messages("user-1", &start.session.id, None, None)
        .expect("list failed");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, start.user_message.id);
}

#[tokio::test]
async fn test_async_follow_up_is_continuation() {
    let provider = Arc::new(FakeProvider::with_replies([
        FakeReply::Content(FIRST_REPLY.to_string()),
        FakeReply::Content(SHORTER_REPLY.to_string()),
    ]));
    let (service, _tmp) = create_service(provider.clone());

    let start = service
        .start_session_sync("user-1", "Write about headphones", Some("Headphones"))
        .await
        .expect("sync start failed");
    let posted = service
        .add_message_async("user-1", &start.session.id, "Shorter title")
        .await
        .expect("async post failed");

    let done = wait_for_terminal(&service, "user-1", &posted.job.id).await;
    assert_eq!(done.job.status, JobStatus::Completed);
    assert!(provider.payloads()[1]
        .contains("Original Request: \"\"\"Write about headphones\"\"\""));
}

#[tokio::test]
async fn test_deleted_session_leaves_orphaned_job_readable() {
    let provider = Arc::new(FakeProvider::new());
    let (service, _tmp) = create_service(provider);

    let start = service
        .start_session_async("user-1", "Write about boots", None)
        .await
        .expect("async start failed");
    let done = wait_for_terminal(&service, "user-1", &start.job.id).await;
    assert_eq!(done.job.status, JobStatus::Completed);

    service
        .delete_session("user-1", &start.session.id)
        .expect("delete failed");

    assert!(service
        .storage()
        .list_messages(&start.session.id, 100, 0)
        .expect("list failed")
        .is_empty());

    let orphan = service
        .job_status("user-1", &start.job.id)
        .expect("orphaned job lookup failed");
    assert_eq!(orphan.job.status, JobStatus::Completed);
    assert!(orphan.agent_message.is_none());
}

#[tokio::test]
async fn test_malformed_output_is_stored_empty() {
    let provider = Arc::new(FakeProvider::with_replies([FakeReply::Content(
        r#"{"page_title": 42, "meta_keywords": "a, b"}"#.to_string(),
    )]));
    let (service, _tmp) = create_service(provider);

    let start = service
        .start_session_sync("user-1", "Write", None)
        .await
        .expect("sync start failed");
    let suggestion = start.agent_message.suggestion.expect("no suggestion");
    assert_eq!(suggestion.page_content, "");
}
