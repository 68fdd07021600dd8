//! At-least-once delivery across restarts.

use std::sync::Arc;

use crate::prelude::*;
use gr_core::{Job, SystemClock};

#[tokio::test]
async fn unacknowledged_job_is_redispatched_after_crash() {
    let stack = Stack::new();

    // a previous process dequeued the job and died before acknowledging
    let job = Job::from_request(
        JobRequest::new("echo recovered"),
        &stack.volumes(),
        &SystemClock,
    )
    .unwrap();
    let job = stack.jobs().create_job(job).await.unwrap();
    let raw = serde_json::to_string(&job).unwrap();
    stack.lists().push(PROCESSING_LIST, &raw).await.unwrap();

    let engine = stack.start().await;
    let done = wait_terminal(&engine, &job.id).await;
    assert_eq!(done.status, JobStatus::Success);
    engine.shutdown().await;

    let lists = stack.lists();
    assert_eq!(lists.len(PROCESSING_LIST).await.unwrap(), 0);
    assert_eq!(lists.len(PENDING_LIST).await.unwrap(), 0);
    assert_eq!(stack.starts(&job.id).await, 1);
}

#[tokio::test]
async fn acknowledged_job_is_never_reintroduced() {
    let stack = Stack::new();
    let engine = stack.start().await;
    let job = engine.submit(JobRequest::new("true")).await.unwrap();
    wait_terminal(&engine, &job.id).await;
    engine.shutdown().await;

    // restart twice: nothing left to requeue
    for _ in 0..2 {
        let engine = stack.start().await;
        assert_eq!(engine.queue_length().await.unwrap(), 0);
        engine.shutdown().await;
    }
    assert_eq!(stack.starts(&job.id).await, 1);
    let record = stack.jobs().get_job(&job.id).await.unwrap();
    assert_eq!(record.status, JobStatus::Success);
}

#[tokio::test]
async fn pending_jobs_survive_restart() {
    let stack = Stack::new();
    let lists: Arc<dyn ListStore> = Arc::new(stack.lists());
    let queue = gr_engine::DurableQueue::new(Arc::clone(&lists));

    let mut ids = Vec::new();
    for i in 0..3 {
        let job = Job::from_request(
            JobRequest::new(format!("echo {i}")),
            &stack.volumes(),
            &SystemClock,
        )
        .unwrap();
        let job = stack.jobs().create_job(job).await.unwrap();
        queue.enqueue(&job).await.unwrap();
        ids.push(job.id);
    }
    drop(queue);
    drop(lists);

    let engine = stack.start().await;
    for id in &ids {
        assert_eq!(wait_terminal(&engine, id).await.status, JobStatus::Success);
    }
    engine.shutdown().await;
}
