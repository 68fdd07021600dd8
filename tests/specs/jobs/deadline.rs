//! Per-job deadline enforcement.

use std::time::Duration;

use crate::prelude::*;

#[tokio::test]
async fn long_running_job_reports_deadline_exceeded() {
    let stack = Stack::new();
    let config = stack.config().with_job_timeout(Duration::from_secs(1));
    let engine = stack.start_with(config).await;

    let job = engine
        .submit(JobRequest::new("sleep 30").max_retries(1))
        .await
        .unwrap();
    let done = wait_terminal(&engine, &job.id).await;

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.failure, Some(FailureKind::DeadlineExceeded));
    // retry ceiling still applies to deadline failures
    assert_eq!(done.job_trial, 2);
    assert_eq!(stack.starts(&job.id).await, 2);
    engine.shutdown().await;
}
