// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine runtime: wires queue, bridge, workers and coordinator together.

use crate::config::EngineConfig;
use crate::dispatch::DispatchBridge;
use crate::error::EngineError;
use crate::executor::{CancelError, Executor};
use crate::job_logger::{JobLogger, LogLevel};
use crate::log_fields;
use crate::queue::DurableQueue;
use crate::retry::RetryCoordinator;
use crate::worker::WorkerPool;
use gr_adapters::{LogLine, LogSink};
use gr_core::{Clock, Job, JobId, JobRequest};
use gr_storage::{JobStore, JobStoreError, ListStore};
use serde_json::Map;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Engine adapter dependencies
pub struct EngineDeps {
    /// Backing store of the durable queue
    pub lists: Arc<dyn ListStore>,
    /// Record of truth for job state
    pub jobs: Arc<dyn JobStore>,
    /// Per-job log transport
    pub logs: Arc<dyn LogSink>,
}

pub struct Engine;

impl Engine {
    /// Recover stale jobs and start every background loop.
    ///
    /// Fails only if the backing store cannot be reached; after this
    /// returns, errors inside the loops are logged and never fatal.
    pub async fn start<C: Clock>(
        config: EngineConfig,
        deps: EngineDeps,
        clock: C,
    ) -> Result<EngineHandle<C>, EngineError> {
        let queue = DurableQueue::new(deps.lists);
        queue.ping().await?;
        let requeued = queue.requeue_stale().await?;
        let pending = queue.queue_length().await?;
        tracing::info!(requeued, pending, "recovered durable queue");

        let shutdown = CancellationToken::new();
        let executor = Arc::new(Executor::new(config.shell.clone(), config.run_as_user.clone()));
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_capacity);
        let (results_tx, results_rx) = mpsc::channel(config.results_capacity);

        let bridge = DispatchBridge::new(
            queue.clone(),
            Arc::clone(&deps.logs),
            config.dequeue_timeout,
            clock.clone(),
        )
        .spawn(dispatch_tx, shutdown.clone());
        let workers = WorkerPool::new(
            config.workers,
            Arc::clone(&executor),
            Arc::clone(&deps.jobs),
            config.volumes.clone(),
            config.job_timeout,
            clock.clone(),
        )
        .spawn(dispatch_rx, results_tx, shutdown.clone());
        let coordinator =
            RetryCoordinator::new(queue.clone(), Arc::clone(&deps.jobs)).spawn(results_rx);

        tracing::info!(workers = config.workers, "engine started");
        Ok(EngineHandle {
            config,
            queue,
            jobs: deps.jobs,
            logs: deps.logs,
            executor,
            clock,
            shutdown,
            tasks: Tasks {
                bridge,
                workers,
                coordinator,
            },
        })
    }
}

struct Tasks {
    bridge: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    coordinator: JoinHandle<()>,
}

/// Running engine.
pub struct EngineHandle<C: Clock> {
    config: EngineConfig,
    queue: DurableQueue,
    jobs: Arc<dyn JobStore>,
    logs: Arc<dyn LogSink>,
    executor: Arc<Executor>,
    clock: C,
    shutdown: CancellationToken,
    tasks: Tasks,
}

impl<C: Clock> EngineHandle<C> {
    /// Admit, record and enqueue a job.
    ///
    /// Oversized storage requests are rejected before any record exists.
    pub async fn submit(&self, request: JobRequest) -> Result<Job, EngineError> {
        let job = Job::from_request(request, &self.config.volumes, &self.clock)?;
        let job = self.jobs.create_job(job).await?;

        if let Err(e) = self.queue.enqueue(&job).await {
            // never scheduled; don't leave a pending record behind
            if let Err(cancel_err) = self.jobs.cancel_job(&job.id).await {
                tracing::warn!(
                    job_id = %job.id,
                    error = %cancel_err,
                    "failed to retire unqueued job",
                );
            }
            return Err(e.into());
        }

        self.job_logger(&job.id)
            .log(
                LogLevel::Info,
                "job submitted",
                log_fields! {
                    "storage_bytes" => job.storage_bytes,
                    "max_retries" => job.max_retries,
                },
            )
            .await;
        tracing::info!(job_id = %job.id, storage_bytes = job.storage_bytes, "job submitted");
        Ok(job)
    }

    /// Cancel a pending or running job.
    ///
    /// A running job's subprocess is signalled; a pending one is skipped when
    /// it reaches a worker. Unknown and finished jobs are `NotRunning`, with
    /// no side effect.
    pub async fn cancel(&self, id: &JobId) -> Result<Job, EngineError> {
        self.cancel_with_reason(id, None).await
    }

    /// [`cancel`](Self::cancel), recording `reason` in the job log.
    pub async fn cancel_with_reason(
        &self,
        id: &JobId,
        reason: Option<&str>,
    ) -> Result<Job, EngineError> {
        let job = match self.jobs.cancel_job(id).await {
            Ok(job) => job,
            Err(JobStoreError::NotFound(_) | JobStoreError::NotCancellable { .. }) => {
                return Err(CancelError::NotRunning(id.clone()).into());
            }
            Err(e) => return Err(e.into()),
        };

        match self.executor.cancel_job(id) {
            Ok(()) => tracing::info!(job_id = %id, "signalled running job"),
            Err(CancelError::NotRunning(_)) => {
                tracing::info!(job_id = %id, "cancelled queued job");
            }
        }

        let fields = match reason {
            Some(reason) => log_fields! { "reason" => reason },
            None => Map::new(),
        };
        self.job_logger(id)
            .log(LogLevel::Warn, "job cancelled", fields)
            .await;
        Ok(job)
    }

    pub async fn job(&self, id: &JobId) -> Result<Job, EngineError> {
        Ok(self.jobs.get_job(id).await?)
    }

    pub async fn jobs(&self) -> Result<Vec<Job>, EngineError> {
        Ok(self.jobs.list_jobs().await?)
    }

    /// Pending entries in the durable queue.
    pub async fn queue_length(&self) -> Result<usize, EngineError> {
        Ok(self.queue.queue_length().await?)
    }

    /// Live tail of a job's log; ends when `cancel` fires.
    pub fn stream_logs(
        &self,
        id: JobId,
        from_offset: u64,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<LogLine> {
        Arc::clone(&self.logs).stream(id, from_offset, cancel)
    }

    fn job_logger(&self, id: &JobId) -> JobLogger {
        JobLogger::new(id.clone(), Arc::clone(&self.logs), &self.clock)
    }

    /// Stop dequeuing, let in-flight jobs finish, drain their outcomes.
    pub async fn shutdown(self) {
        tracing::info!(in_flight = self.executor.running_count(), "engine shutting down");
        self.shutdown.cancel();

        let Tasks {
            bridge,
            workers,
            coordinator,
        } = self.tasks;
        if let Err(e) = bridge.await {
            tracing::error!(error = %e, "dispatch bridge task failed");
        }
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker task failed");
            }
        }
        if let Err(e) = coordinator.await {
            tracing::error!(error = %e, "retry coordinator task failed");
        }
        tracing::info!("engine stopped");
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
