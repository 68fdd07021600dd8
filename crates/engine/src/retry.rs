// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry coordinator: turns execution outcomes into durable follow-ups.
//!
//! For every outcome the follow-up (record update or re-enqueue) is made
//! durable first and the processing entry acknowledged after, so a crash in
//! between yields a duplicate run rather than a lost job.

use crate::queue::{DurableQueue, Receipt};
use crate::worker::Outcome;
use gr_core::{Job, JobStatus};
use gr_storage::{JobStore, JobStoreError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// What the coordinator did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Succeeded,
    Retried { trial: u32 },
    Exhausted,
    Finalized(JobStatus),
    /// The follow-up could not be made durable; the entry stays in
    /// processing for recovery.
    Deferred,
}

pub struct RetryCoordinator {
    queue: DurableQueue,
    jobs: Arc<dyn JobStore>,
}

impl RetryCoordinator {
    pub fn new(queue: DurableQueue, jobs: Arc<dyn JobStore>) -> Self {
        Self { queue, jobs }
    }

    /// Consume outcomes until every worker has dropped its sender.
    pub fn spawn(self, rx: mpsc::Receiver<Outcome>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx).instrument(tracing::info_span!("retry")))
    }

    async fn run(self, mut rx: mpsc::Receiver<Outcome>) {
        while let Some(outcome) = rx.recv().await {
            self.handle(outcome).await;
        }
        tracing::info!("retry coordinator stopped");
    }

    pub async fn handle(&self, outcome: Outcome) -> Decision {
        let Outcome { mut job, receipt } = outcome;

        match job.status {
            JobStatus::Success => {
                self.record(&job).await;
                self.acknowledge(&job, &receipt).await;
                Decision::Succeeded
            }
            JobStatus::Failed if job.can_retry() => {
                job.prepare_retry();
                match self.jobs.update_job(&job).await {
                    Err(JobStoreError::Finalized(_)) => {
                        tracing::info!(job_id = %job.id, "not retrying cancelled job");
                        self.acknowledge(&job, &receipt).await;
                        return Decision::Finalized(JobStatus::Cancelled);
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %job.id, error = %e, "failed to record retry");
                    }
                    Ok(()) => {}
                }
                if let Err(e) = self.queue.enqueue(&job).await {
                    tracing::error!(
                        job_id = %job.id,
                        error = %e,
                        "re-enqueue failed; left for recovery",
                    );
                    return Decision::Deferred;
                }
                tracing::info!(job_id = %job.id, trial = job.job_trial, "job re-queued");
                self.acknowledge(&job, &receipt).await;
                Decision::Retried {
                    trial: job.job_trial,
                }
            }
            JobStatus::Failed => {
                tracing::warn!(
                    job_id = %job.id,
                    trial = job.job_trial,
                    max_retries = job.max_retries,
                    "retries exhausted",
                );
                self.record(&job).await;
                self.acknowledge(&job, &receipt).await;
                Decision::Exhausted
            }
            status => {
                self.record(&job).await;
                self.acknowledge(&job, &receipt).await;
                Decision::Finalized(status)
            }
        }
    }

    async fn record(&self, job: &Job) {
        match self.jobs.update_job(job).await {
            Ok(()) => {}
            Err(JobStoreError::Finalized(_)) => {
                tracing::info!(
                    job_id = %job.id,
                    status = %job.status,
                    "record already cancelled; keeping it",
                );
            }
            Err(e) => tracing::warn!(job_id = %job.id, error = %e, "failed to record job state"),
        }
    }

    /// Failures are logged, not retried; the entry is recovered at the next
    /// start.
    async fn acknowledge(&self, job: &Job, receipt: &Receipt) {
        match self.queue.acknowledge(receipt).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(job_id = %job.id, "processing entry already gone"),
            Err(e) => tracing::warn!(job_id = %job.id, error = %e, "acknowledge failed"),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
