//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::sync::Arc;
use std::time::Duration;

use gr_adapters::{FileLogSink, LogSink};
use gr_core::{Job, JobId, SystemClock, UuidIdGen, VolumeLayout};
use gr_engine::{Engine, EngineConfig, EngineDeps, EngineHandle};
use gr_storage::{JournalListStore, SnapshotJobStore};
use tempfile::TempDir;

pub use gr_core::{FailureKind, JobRequest, JobStatus};
pub use gr_engine::{CancelError, EngineError, PENDING_LIST, PROCESSING_LIST};
pub use gr_storage::{JobStore, ListStore};

// Status polling
pub const SPEC_POLL_INTERVAL_MS: u64 = 20;
pub const SPEC_WAIT_MAX_MS: u64 = 15_000;

pub const MB: u64 = 1024 * 1024;

/// An isolated state directory: journal, snapshot, job logs and volumes.
pub struct Stack {
    dir: TempDir,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn volumes(&self) -> VolumeLayout {
        VolumeLayout::new(self.dir.path().join("volumes"))
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_shell("sh")
            .with_dequeue_timeout(Duration::from_millis(100))
            .with_volumes(self.volumes())
    }

    /// Open the queue journal as a restarted process would.
    pub fn lists(&self) -> JournalListStore {
        JournalListStore::open(&self.dir.path().join("jobs.journal")).unwrap()
    }

    pub fn jobs(&self) -> SnapshotJobStore<SystemClock> {
        let path = self.dir.path().join("jobs.snapshot");
        SnapshotJobStore::open(&path, Arc::new(UuidIdGen), SystemClock).unwrap()
    }

    pub fn logs(&self) -> FileLogSink {
        FileLogSink::new(self.dir.path().join("logs"))
    }

    pub async fn start(&self) -> EngineHandle<SystemClock> {
        self.start_with(self.config()).await
    }

    pub async fn start_with(&self, config: EngineConfig) -> EngineHandle<SystemClock> {
        let deps = EngineDeps {
            lists: Arc::new(self.lists()),
            jobs: Arc::new(self.jobs()),
            logs: Arc::new(self.logs()),
        };
        Engine::start(config, deps, SystemClock).await.unwrap()
    }

    /// Job log messages, in append order.
    pub async fn log_messages(&self, id: &JobId) -> Vec<String> {
        self.logs()
            .read(id, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|line| line.message)
            .collect()
    }

    /// Poll the job log until a message equals `message`.
    pub async fn wait_for_log(&self, id: &JobId, message: &str) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        loop {
            let messages = self.log_messages(id).await;
            if messages.iter().any(|m| m == message) {
                return messages;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for {message:?} in log of {id}: {messages:?}");
            }
            tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
        }
    }

    /// How many times the executor started this job.
    pub async fn starts(&self, id: &JobId) -> usize {
        self.log_messages(id)
            .await
            .iter()
            .filter(|m| m.contains("starting command"))
            .count()
    }
}

/// Poll until the job reaches a terminal status.
pub async fn wait_terminal(engine: &EngineHandle<SystemClock>, id: &JobId) -> Job {
    wait_for(engine, id, |job| job.is_terminal()).await
}

pub async fn wait_for(
    engine: &EngineHandle<SystemClock>,
    id: &JobId,
    pred: impl Fn(&Job) -> bool,
) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        let job = engine.job(id).await.unwrap();
        if pred(&job) {
            return job;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting on job {id}: last status {}", job.status);
        }
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}
