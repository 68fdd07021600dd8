//! Cancellation of running, queued, finished and unknown jobs.

use std::time::{Duration, Instant};

use crate::prelude::*;
use gr_core::JobId;

#[tokio::test]
async fn cancelling_running_job_terminates_it() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine.submit(JobRequest::new("sleep 30")).await.unwrap();
    wait_for(&engine, &job.id, |job| job.status == JobStatus::Running).await;

    let started = Instant::now();
    engine.cancel(&job.id).await.unwrap();
    let done = wait_terminal(&engine, &job.id).await;

    assert_eq!(done.status, JobStatus::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));

    // the executor reports the cancelled attempt in the job log
    let messages = stack.wait_for_log(&job.id, "cancelled").await;
    assert!(messages.iter().any(|m| m == "job cancelled"));

    // no subprocess left holding shutdown to the 30s job deadline
    let stopping = Instant::now();
    engine.shutdown().await;
    let elapsed = stopping.elapsed();
    assert!(elapsed < Duration::from_secs(5), "shutdown took {elapsed:?}");

    // stays cancelled once the subprocess outcome is drained
    let record = stack.jobs().get_job(&job.id).await.unwrap();
    assert_eq!(record.status, JobStatus::Cancelled);
    assert_eq!(stack.lists().len(PROCESSING_LIST).await.unwrap(), 0);
}

#[tokio::test]
async fn cancelling_queued_job_skips_execution() {
    let stack = Stack::new();
    let engine = stack.start_with(stack.config().with_workers(1)).await;

    let blocker = engine.submit(JobRequest::new("sleep 1")).await.unwrap();
    wait_for(&engine, &blocker.id, |job| job.status == JobStatus::Running).await;
    let queued = engine.submit(JobRequest::new("echo never")).await.unwrap();

    let cancelled = engine.cancel(&queued.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    wait_terminal(&engine, &blocker.id).await;
    engine.shutdown().await;

    assert_eq!(stack.starts(&queued.id).await, 0);
    let record = stack.jobs().get_job(&queued.id).await.unwrap();
    assert_eq!(record.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn cancelling_unknown_job_is_not_running() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let err = engine
        .cancel(&JobId::new("no-such-job"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, EngineError::Cancel(CancelError::NotRunning(_))),
        "{err}"
    );
    assert!(engine.jobs().await.unwrap().is_empty());
    engine.shutdown().await;
}

#[tokio::test]
async fn cancelling_finished_job_has_no_effect() {
    let stack = Stack::new();
    let engine = stack.start().await;

    let job = engine.submit(JobRequest::new("true")).await.unwrap();
    wait_terminal(&engine, &job.id).await;

    let err = engine.cancel(&job.id).await.unwrap_err();
    assert!(
        matches!(err, EngineError::Cancel(CancelError::NotRunning(_))),
        "{err}"
    );
    let record = engine.job(&job.id).await.unwrap();
    assert_eq!(record.status, JobStatus::Success);
    engine.shutdown().await;
}
