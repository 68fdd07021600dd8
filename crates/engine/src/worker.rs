// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: executes dispatched jobs and publishes their outcomes.

use crate::dispatch::Dispatch;
use crate::executor::{ExecError, Executor};
use crate::job_logger::JobLogger;
use crate::queue::Receipt;
use gr_core::{Clock, FailureKind, Job, JobStatus, VolumeLayout};
use gr_storage::{JobStore, JobStoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// A finished attempt, handed to the retry coordinator.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub job: Job,
    pub receipt: Receipt,
}

pub struct WorkerPool<C: Clock> {
    workers: usize,
    executor: Arc<Executor>,
    jobs: Arc<dyn JobStore>,
    volumes: VolumeLayout,
    job_timeout: Duration,
    clock: C,
}

impl<C: Clock> WorkerPool<C> {
    pub fn new(
        workers: usize,
        executor: Arc<Executor>,
        jobs: Arc<dyn JobStore>,
        volumes: VolumeLayout,
        job_timeout: Duration,
        clock: C,
    ) -> Self {
        Self {
            workers: workers.max(1),
            executor,
            jobs,
            volumes,
            job_timeout,
            clock,
        }
    }

    /// Spawn the worker loops.
    ///
    /// Each loop exits when the dispatch channel closes or `shutdown` fires.
    /// A job already being executed runs to completion or its own deadline.
    pub fn spawn(
        self,
        rx: mpsc::Receiver<Dispatch>,
        results: mpsc::Sender<Outcome>,
        shutdown: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let rx = Arc::new(Mutex::new(rx));
        let pool = Arc::new(self);
        (0..pool.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    pool: Arc::clone(&pool),
                };
                let rx = Arc::clone(&rx);
                let results = results.clone();
                let shutdown = shutdown.clone();
                let span = tracing::info_span!("worker", id);
                tokio::spawn(worker.run(rx, results, shutdown).instrument(span))
            })
            .collect()
    }
}

struct Worker<C: Clock> {
    id: usize,
    pool: Arc<WorkerPool<C>>,
}

impl<C: Clock> Worker<C> {
    async fn run(
        self,
        rx: Arc<Mutex<mpsc::Receiver<Dispatch>>>,
        results: mpsc::Sender<Outcome>,
        shutdown: CancellationToken,
    ) {
        tracing::debug!(worker = self.id, "worker started");
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                next = async { rx.lock().await.recv().await } => next,
            };
            let Some(dispatch) = next else { break };

            let outcome = self.process(dispatch).await;
            if results.send(outcome).await.is_err() {
                tracing::warn!("results channel closed");
                break;
            }
        }
        tracing::debug!(worker = self.id, "worker stopped");
    }

    async fn process(&self, dispatch: Dispatch) -> Outcome {
        let Dispatch {
            mut job,
            receipt,
            logger,
        } = dispatch;
        let pool = &self.pool;

        // cancelled while still queued
        match pool.jobs.get_job(&job.id).await {
            Ok(record) if record.status == JobStatus::Cancelled => {
                return self.skip_cancelled(job, receipt, &logger).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "job record lookup failed");
            }
        }

        job.mark_running(&pool.clock);
        match job.tier() {
            Ok(tier) => job.volume_path = pool.volumes.volume_for(tier),
            Err(e) => {
                job.mark_failed(FailureKind::Spawn, e.to_string(), None, &pool.clock);
                return Outcome { job, receipt };
            }
        }

        // independent of pool shutdown; in-flight jobs run to completion.
        // Registered before the running state is recorded so a cancel
        // landing in between is never lost.
        let registration = pool.executor.register(job.id.clone());

        match pool.jobs.update_job(&job).await {
            Err(JobStoreError::Finalized(_)) => {
                drop(registration);
                return self.skip_cancelled(job, receipt, &logger).await;
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "failed to record running state");
            }
            Ok(()) => {}
        }

        tracing::info!(job_id = %job.id, trial = job.job_trial, "running job");
        let result = pool
            .executor
            .run_job(&job, pool.job_timeout, registration, &logger)
            .await;

        match result {
            Ok(_) => {
                job.mark_success(&pool.clock);
                tracing::info!(job_id = %job.id, trial = job.job_trial, "job succeeded");
            }
            Err(ExecError::Cancelled) => {
                job.mark_cancelled(&pool.clock);
                tracing::info!(job_id = %job.id, "job cancelled");
            }
            Err(e) => {
                job.mark_failed(e.kind(), e.to_string(), e.exit_code(), &pool.clock);
                tracing::warn!(
                    job_id = %job.id,
                    trial = job.job_trial,
                    failure = %e.kind(),
                    error = %e,
                    "job failed",
                );
            }
        }
        Outcome { job, receipt }
    }

    async fn skip_cancelled(&self, mut job: Job, receipt: Receipt, logger: &JobLogger) -> Outcome {
        tracing::info!(job_id = %job.id, "skipping job cancelled before start");
        logger.warn("cancelled before start").await;
        job.mark_cancelled(&self.pool.clock);
        Outcome { job, receipt }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
