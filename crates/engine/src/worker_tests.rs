// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job_logger::JobLogger;
use crate::queue::{DurableQueue, Receipt};
use gr_adapters::FakeLogSink;
use gr_core::{FakeClock, JobRequest};
use gr_storage::{FakeListStore, MemoryJobStore};
use std::time::Instant;
use tempfile::TempDir;

struct Harness {
    jobs: MemoryJobStore,
    executor: Arc<Executor>,
    dir: TempDir,
    shutdown: CancellationToken,
    dispatch_tx: mpsc::Sender<Dispatch>,
    results_rx: mpsc::Receiver<Outcome>,
    handles: Vec<JoinHandle<()>>,
}

fn harness(workers: usize, timeout: Duration) -> Harness {
    let jobs = MemoryJobStore::default();
    let executor = Arc::new(Executor::new("sh", "jobrunner"));
    let dir = tempfile::tempdir().unwrap();
    let shutdown = CancellationToken::new();
    let (dispatch_tx, dispatch_rx) = mpsc::channel(8);
    let (results_tx, results_rx) = mpsc::channel(8);

    let pool = WorkerPool::new(
        workers,
        Arc::clone(&executor),
        Arc::new(jobs.clone()),
        VolumeLayout::new(dir.path()),
        timeout,
        FakeClock::new(),
    );
    let handles = pool.spawn(dispatch_rx, results_tx, shutdown.clone());
    Harness {
        jobs,
        executor,
        dir,
        shutdown,
        dispatch_tx,
        results_rx,
        handles,
    }
}

/// Create the record, then build a dispatch for it via a real queue round trip.
async fn dispatch(h: &Harness, command: &str) -> Dispatch {
    let job = Job::from_request(
        JobRequest::new(command),
        &VolumeLayout::new(h.dir.path()),
        &FakeClock::new(),
    )
    .unwrap();
    let job = h.jobs.create_job(job).await.unwrap();

    let queue = DurableQueue::new(Arc::new(FakeListStore::new()));
    queue.enqueue(&job).await.unwrap();
    let delivery = queue.dequeue(Duration::from_millis(20)).await.unwrap();
    Dispatch {
        logger: JobLogger::new(
            job.id.clone(),
            Arc::new(FakeLogSink::new()),
            &FakeClock::new(),
        ),
        job: delivery.job,
        receipt: delivery.receipt,
    }
}

#[tokio::test]
async fn success_outcome_keeps_receipt() {
    let mut h = harness(1, Duration::from_secs(5));
    let d = dispatch(&h, "echo ok").await;
    let receipt: Receipt = d.receipt.clone();
    h.dispatch_tx.send(d).await.unwrap();

    let outcome = h.results_rx.recv().await.unwrap();
    assert_eq!(outcome.job.status, JobStatus::Success);
    assert_eq!(outcome.receipt, receipt);
    assert!(outcome.job.started_at_ms.is_some());
}

#[tokio::test]
async fn running_state_is_recorded_before_execution() {
    let mut h = harness(1, Duration::from_secs(5));
    let d = dispatch(&h, "sleep 0.3").await;
    let id = d.job.id.clone();
    h.dispatch_tx.send(d).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let record = h.jobs.get_job(&id).await.unwrap();
    assert_eq!(record.status, JobStatus::Running);
    assert!(h.executor.is_running(&id));

    h.results_rx.recv().await.unwrap();
}

#[tokio::test]
async fn failure_outcome_records_kind() {
    let mut h = harness(1, Duration::from_secs(5));
    let d = dispatch(&h, "exit 7").await;
    h.dispatch_tx.send(d).await.unwrap();

    let outcome = h.results_rx.recv().await.unwrap();
    assert_eq!(outcome.job.status, JobStatus::Failed);
    assert_eq!(outcome.job.failure, Some(FailureKind::Exit));
    assert_eq!(outcome.job.exit_code, Some(7));
}

#[tokio::test]
async fn deadline_outcome_is_failed_deadline_exceeded() {
    let mut h = harness(1, Duration::from_millis(200));
    let d = dispatch(&h, "sleep 10").await;
    h.dispatch_tx.send(d).await.unwrap();

    let outcome = h.results_rx.recv().await.unwrap();
    assert_eq!(outcome.job.status, JobStatus::Failed);
    assert_eq!(outcome.job.failure, Some(FailureKind::DeadlineExceeded));
}

#[tokio::test]
async fn cancelled_record_is_skipped_without_running() {
    let mut h = harness(1, Duration::from_secs(5));
    let marker = h.dir.path().join("ran");
    let d = dispatch(&h, &format!("touch {}", marker.display())).await;
    h.jobs.cancel_job(&d.job.id).await.unwrap();
    h.dispatch_tx.send(d).await.unwrap();

    let outcome = h.results_rx.recv().await.unwrap();
    assert_eq!(outcome.job.status, JobStatus::Cancelled);
    assert!(!marker.exists());
}

#[tokio::test]
async fn executor_cancel_yields_cancelled_outcome() {
    let mut h = harness(1, Duration::from_secs(30));
    let d = dispatch(&h, "sleep 10").await;
    let id = d.job.id.clone();
    h.dispatch_tx.send(d).await.unwrap();

    while !h.executor.is_running(&id) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    h.executor.cancel_job(&id).unwrap();

    let outcome = h.results_rx.recv().await.unwrap();
    assert_eq!(outcome.job.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn workers_run_concurrently() {
    let mut h = harness(3, Duration::from_secs(5));
    for _ in 0..3 {
        let d = dispatch(&h, "sleep 0.5").await;
        h.dispatch_tx.send(d).await.unwrap();
    }

    let start = Instant::now();
    for _ in 0..3 {
        h.results_rx.recv().await.unwrap();
    }
    let elapsed = start.elapsed();
    assert!(elapsed < Duration::from_millis(1400), "took {elapsed:?}");
}

#[tokio::test]
async fn closing_dispatch_channel_stops_workers() {
    let h = harness(2, Duration::from_secs(5));
    drop(h.dispatch_tx);
    for handle in h.handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn shutdown_lets_in_flight_job_finish() {
    let mut h = harness(1, Duration::from_secs(5));
    let d = dispatch(&h, "sleep 0.3; echo done").await;
    h.dispatch_tx.send(d).await.unwrap();
    while h.executor.running_count() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    h.shutdown.cancel();
    let outcome = h.results_rx.recv().await.unwrap();
    assert_eq!(outcome.job.status, JobStatus::Success);
    for handle in h.handles {
        handle.await.unwrap();
    }
}
