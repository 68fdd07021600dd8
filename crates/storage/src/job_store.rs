// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records: the record of truth for job state outside the queue.

use crate::snapshot::{JobSnapshot, SnapshotError};
use async_trait::async_trait;
use gr_core::{Clock, IdGen, Job, JobId, JobStatus};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} is {status} and cannot be cancelled")]
    NotCancellable { id: JobId, status: JobStatus },
    #[error("job {0} was cancelled; record is final")]
    Finalized(JobId),
    #[error("invalid job: {0}")]
    Invalid(String),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Store a new job, assigning its id. The command must be non-blank.
    async fn create_job(&self, job: Job) -> Result<Job, JobStoreError>;

    async fn get_job(&self, id: &JobId) -> Result<Job, JobStoreError>;

    /// Replace an existing record. A cancelled record is never overwritten
    /// by another status.
    async fn update_job(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Mark a pending or running job cancelled and return the updated record.
    async fn cancel_job(&self, id: &JobId) -> Result<Job, JobStoreError>;

    /// All jobs, ordered by id.
    async fn list_jobs(&self) -> Result<Vec<Job>, JobStoreError>;
}

/// Record rules shared by every store implementation.
#[derive(Debug, Clone, Default)]
struct JobTable {
    jobs: BTreeMap<JobId, Job>,
}

impl JobTable {
    fn from_jobs(jobs: Vec<Job>) -> Self {
        Self {
            jobs: jobs.into_iter().map(|job| (job.id.clone(), job)).collect(),
        }
    }

    fn create(&mut self, mut job: Job, ids: &dyn IdGen) -> Result<Job, JobStoreError> {
        if job.command.trim().is_empty() {
            return Err(JobStoreError::Invalid("command is empty".to_string()));
        }
        job.id = JobId::new(ids.next());
        job.status = JobStatus::Pending;
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn get(&self, id: &JobId) -> Result<Job, JobStoreError> {
        self.jobs
            .get(id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))
    }

    fn update(&mut self, job: &Job) -> Result<(), JobStoreError> {
        let current = self
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| JobStoreError::NotFound(job.id.clone()))?;
        if current.status == JobStatus::Cancelled && job.status != JobStatus::Cancelled {
            return Err(JobStoreError::Finalized(job.id.clone()));
        }
        *current = job.clone();
        Ok(())
    }

    fn cancel(&mut self, id: &JobId, clock: &impl Clock) -> Result<Job, JobStoreError> {
        let job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;
        if !job.status.is_cancellable() {
            return Err(JobStoreError::NotCancellable {
                id: id.clone(),
                status: job.status,
            });
        }
        job.mark_cancelled(clock);
        Ok(job.clone())
    }

    fn list(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }
}

/// Job store persisted as a compressed snapshot after every mutation.
pub struct SnapshotJobStore<C: Clock> {
    table: Mutex<JobTable>,
    path: PathBuf,
    ids: Arc<dyn IdGen>,
    clock: C,
}

impl<C: Clock> SnapshotJobStore<C> {
    /// Load the snapshot at `path`, or start empty.
    pub fn open(path: &Path, ids: Arc<dyn IdGen>, clock: C) -> Result<Self, JobStoreError> {
        let jobs = JobSnapshot::load(path)?.map(|s| s.jobs).unwrap_or_default();
        info!(path = %path.display(), jobs = jobs.len(), "loaded job snapshot");
        Ok(Self {
            table: Mutex::new(JobTable::from_jobs(jobs)),
            path: path.to_owned(),
            ids,
            clock,
        })
    }

    /// Apply `f` to a copy of the table and commit it once the snapshot is
    /// on disk.
    fn persist<R>(
        &self,
        f: impl FnOnce(&mut JobTable) -> Result<R, JobStoreError>,
    ) -> Result<R, JobStoreError> {
        let mut table = self.table.lock();
        let mut next = table.clone();
        let result = f(&mut next)?;
        JobSnapshot::new(next.list()).save(&self.path)?;
        *table = next;
        Ok(result)
    }
}

#[async_trait]
impl<C: Clock> JobStore for SnapshotJobStore<C> {
    async fn create_job(&self, job: Job) -> Result<Job, JobStoreError> {
        self.persist(|table| table.create(job, self.ids.as_ref()))
    }

    async fn get_job(&self, id: &JobId) -> Result<Job, JobStoreError> {
        self.table.lock().get(id)
    }

    async fn update_job(&self, job: &Job) -> Result<(), JobStoreError> {
        self.persist(|table| table.update(job))
    }

    async fn cancel_job(&self, id: &JobId) -> Result<Job, JobStoreError> {
        self.persist(|table| table.cancel(id, &self.clock))
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, JobStoreError> {
        Ok(self.table.lock().list())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryJobStore;

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::*;
    use gr_core::{FakeClock, SequentialIdGen};

    /// Unpersisted job store with sequential ids (`job-1`, `job-2`, ...).
    #[derive(Clone)]
    pub struct MemoryJobStore {
        table: Arc<Mutex<JobTable>>,
        ids: Arc<SequentialIdGen>,
        clock: FakeClock,
    }

    impl Default for MemoryJobStore {
        fn default() -> Self {
            Self::new(FakeClock::new())
        }
    }

    impl MemoryJobStore {
        pub fn new(clock: FakeClock) -> Self {
            Self {
                table: Arc::new(Mutex::new(JobTable::default())),
                ids: Arc::new(SequentialIdGen::new("job")),
                clock,
            }
        }
    }

    #[async_trait]
    impl JobStore for MemoryJobStore {
        async fn create_job(&self, job: Job) -> Result<Job, JobStoreError> {
            self.table.lock().create(job, self.ids.as_ref())
        }

        async fn get_job(&self, id: &JobId) -> Result<Job, JobStoreError> {
            self.table.lock().get(id)
        }

        async fn update_job(&self, job: &Job) -> Result<(), JobStoreError> {
            self.table.lock().update(job)
        }

        async fn cancel_job(&self, id: &JobId) -> Result<Job, JobStoreError> {
            self.table.lock().cancel(id, &self.clock)
        }

        async fn list_jobs(&self) -> Result<Vec<Job>, JobStoreError> {
            Ok(self.table.lock().list())
        }
    }
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
