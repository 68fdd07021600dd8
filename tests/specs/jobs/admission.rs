//! Storage tier admission and the happy path.

use crate::prelude::*;

#[tokio::test]
async fn tiny_request_lands_in_smallest_tier_and_succeeds() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine
        .submit(JobRequest::new("echo hi").storage_bytes(1))
        .await
        .unwrap();
    assert_eq!(job.storage_bytes, 10 * MB);
    assert_eq!(job.volume_path, stack.volumes().root().join("10mb"));

    let done = wait_terminal(&engine, &job.id).await;
    assert_eq!(done.status, JobStatus::Success);
    assert_eq!(done.job_trial, 1);
    assert!(done.volume_path.is_dir());

    let messages = stack.log_messages(&job.id).await;
    assert!(
        messages.iter().any(|m| m.contains("command succeeded")),
        "{messages:?}"
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn request_between_tiers_rounds_up() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine
        .submit(JobRequest::new("true").storage_bytes(11 * MB))
        .await
        .unwrap();
    assert_eq!(job.storage_bytes, 25 * MB);
    assert_eq!(job.volume_path, stack.volumes().root().join("25mb"));

    wait_terminal(&engine, &job.id).await;
    engine.shutdown().await;
}

#[tokio::test]
async fn oversized_request_is_rejected_before_a_job_exists() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let err = engine
        .submit(JobRequest::new("echo hi").storage_bytes(50 * MB + 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Admission(_)), "{err}");
    assert!(engine.jobs().await.unwrap().is_empty());
    assert_eq!(engine.queue_length().await.unwrap(), 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn blank_command_is_rejected() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let err = engine.submit(JobRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)), "{err}");
    assert_eq!(engine.queue_length().await.unwrap(), 0);
    engine.shutdown().await;
}
