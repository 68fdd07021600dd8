//! Command output captured into the job log.

use crate::prelude::*;

#[tokio::test]
async fn command_output_lands_in_job_log() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine
        .submit(JobRequest::new("echo OUT_$((40+2))"))
        .await
        .unwrap();
    let done = wait_terminal(&engine, &job.id).await;
    assert_eq!(done.status, JobStatus::Success);

    let messages = stack.log_messages(&job.id).await;
    assert!(messages.iter().any(|m| m == "OUT_42"), "{messages:?}");
    assert!(!messages.iter().any(|m| m.contains("$((")));
    engine.shutdown().await;
}

#[tokio::test]
async fn failing_command_output_is_kept() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine
        .submit(JobRequest::new("echo before-failure >&2; exit 4").max_retries(0))
        .await
        .unwrap();
    let done = wait_terminal(&engine, &job.id).await;
    assert_eq!(done.status, JobStatus::Failed);

    let messages = stack.log_messages(&job.id).await;
    assert!(messages.iter().any(|m| m == "before-failure"), "{messages:?}");
    engine.shutdown().await;
}
