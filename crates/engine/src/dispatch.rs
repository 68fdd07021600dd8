// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch bridge: drains the durable queue into the worker channel.

use crate::job_logger::JobLogger;
use crate::queue::{DurableQueue, QueueError, Receipt};
use gr_adapters::LogSink;
use gr_core::{Clock, Job};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Pause after a broker error before dequeuing again.
const BROKER_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A dequeued job on its way to a worker.
pub struct Dispatch {
    pub job: Job,
    pub receipt: Receipt,
    /// Rebuilt after every dequeue; never part of the queued form.
    pub logger: JobLogger,
}

pub struct DispatchBridge<C: Clock> {
    queue: DurableQueue,
    logs: Arc<dyn LogSink>,
    dequeue_timeout: Duration,
    clock: C,
}

impl<C: Clock> DispatchBridge<C> {
    pub fn new(
        queue: DurableQueue,
        logs: Arc<dyn LogSink>,
        dequeue_timeout: Duration,
        clock: C,
    ) -> Self {
        Self {
            queue,
            logs,
            dequeue_timeout,
            clock,
        }
    }

    /// Run until `shutdown` fires, then drop `tx` so workers drain and exit.
    ///
    /// A job dequeued but not yet handed over when shutdown fires stays in the
    /// processing list and is recovered on the next start.
    pub fn spawn(self, tx: mpsc::Sender<Dispatch>, shutdown: CancellationToken) -> JoinHandle<()> {
        let span = tracing::info_span!("dispatch");
        tokio::spawn(self.run(tx, shutdown).instrument(span))
    }

    async fn run(self, tx: mpsc::Sender<Dispatch>, shutdown: CancellationToken) {
        tracing::info!("dispatch bridge started");
        loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.queue.dequeue(self.dequeue_timeout) => result,
            };

            let delivery = match result {
                Ok(delivery) => delivery,
                Err(QueueError::Empty(_)) => continue,
                Err(e @ QueueError::Malformed { .. }) => {
                    tracing::warn!(error = %e, "dropping malformed queue entry");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dequeue failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(BROKER_RETRY_DELAY) => continue,
                    }
                }
            };

            let job_id = delivery.job.id.clone();
            let logger = JobLogger::new(job_id.clone(), Arc::clone(&self.logs), &self.clock);
            let dispatch = Dispatch {
                job: delivery.job,
                receipt: delivery.receipt,
                logger,
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!(
                        job_id = %job_id,
                        "shutdown before hand-off; job left for recovery",
                    );
                    break;
                }
                sent = tx.send(dispatch) => {
                    if sent.is_err() {
                        tracing::warn!("worker channel closed");
                        break;
                    }
                    tracing::debug!(job_id = %job_id, "dispatched");
                }
            }
        }
        drop(tx);
        tracing::info!("dispatch bridge stopped");
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
