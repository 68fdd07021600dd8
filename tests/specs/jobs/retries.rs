//! Retry budget: a job runs at most max_retries + 1 times.

use crate::prelude::*;

#[tokio::test]
async fn failing_job_is_attempted_three_times_with_two_retries() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine
        .submit(JobRequest::new("exit 1").max_retries(2))
        .await
        .unwrap();
    let done = wait_terminal(&engine, &job.id).await;

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.job_trial, 3);
    assert_eq!(done.failure, Some(FailureKind::Exit));
    assert_eq!(done.exit_code, Some(1));
    assert_eq!(stack.starts(&job.id).await, 3);
    engine.shutdown().await;
}

#[tokio::test]
async fn zero_retries_means_a_single_attempt() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine
        .submit(JobRequest::new("echo oops >&2; exit 3").max_retries(0))
        .await
        .unwrap();
    let done = wait_terminal(&engine, &job.id).await;

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.job_trial, 1);
    assert_eq!(done.exit_code, Some(3));
    let error = done.error.as_deref().unwrap_or_default();
    assert!(error.contains("oops"), "{error:?}");
    assert_eq!(stack.starts(&job.id).await, 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn flaky_job_succeeds_on_retry() {
    let stack = Stack::new();
    let engine = stack.start().await;
    let marker = stack.volumes().root().join("10mb").join("flaky.marker");

    let command = format!(
        "if [ -f {0} ]; then exit 0; else touch {0}; exit 1; fi",
        marker.display()
    );
    let job = engine.submit(JobRequest::new(command)).await.unwrap();
    let done = wait_terminal(&engine, &job.id).await;

    assert_eq!(done.status, JobStatus::Success);
    assert_eq!(done.job_trial, 2);
    engine.shutdown().await;
}
