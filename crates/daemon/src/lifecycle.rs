// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use gr_adapters::FileLogSink;
use gr_core::{SystemClock, UuidIdGen, VolumeLayout};
use gr_engine::{Engine, EngineConfig, EngineDeps, EngineError, EngineHandle};
use gr_storage::{JobStoreError, JournalListStore, ListStore, ListStoreError, SnapshotJobStore};
use thiserror::Error;
use tracing::{info, warn};

use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/gr)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Durable queue journal
    pub journal_path: PathBuf,
    /// Job record snapshot
    pub snapshot_path: PathBuf,
    /// Per-job log files
    pub logs_path: PathBuf,
    /// Redis backing store instead of the journal
    pub redis_url: Option<String>,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::for_state_dir(env::state_dir()?);

        if let Some(workers) = env::workers()? {
            config.engine = config.engine.with_workers(workers);
        }
        if let Some(timeout) = env::job_timeout()? {
            config.engine = config.engine.with_job_timeout(timeout);
        }
        if let Some(timeout) = env::dequeue_timeout()? {
            config.engine = config.engine.with_dequeue_timeout(timeout);
        }
        if let Some(root) = env::volume_root() {
            config.engine = config.engine.with_volumes(VolumeLayout::new(root));
        }
        config.redis_url = env::redis_url();
        Ok(config)
    }

    /// Fixed layout under `state_dir` with default engine settings.
    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            journal_path: state_dir.join("queue").join("jobs.journal"),
            snapshot_path: state_dir.join("jobs.snapshot"),
            logs_path: state_dir.join("logs"),
            redis_url: None,
            engine: EngineConfig::default(),
            state_dir,
        }
    }
}

/// Running daemon.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub engine: EngineHandle<SystemClock>,
}

impl DaemonState {
    /// Drain the engine, then release the lock.
    pub async fn shutdown(self) {
        info!("Shutting down daemon...");
        self.engine.shutdown().await;

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("List store error: {0}")]
    ListStore(#[from] ListStoreError),

    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // The lock file belongs to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Don't truncate before holding the lock: that would wipe the running
    // daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::create_dir_all(&config.logs_path)?;

    let lists = open_list_store(config)?;
    let jobs = SnapshotJobStore::open(&config.snapshot_path, Arc::new(UuidIdGen), SystemClock)?;
    let logs = FileLogSink::new(&config.logs_path);

    let deps = EngineDeps {
        lists,
        jobs: Arc::new(jobs),
        logs: Arc::new(logs),
    };
    info!(root = %config.engine.volumes.root().display(), "Using volume root");
    let engine = Engine::start(config.engine.clone(), deps, SystemClock).await?;
    let recovered = engine.jobs().await?.len();
    info!(jobs = recovered, "Recovered job records");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        engine,
    })
}

fn open_list_store(config: &Config) -> Result<Arc<dyn ListStore>, LifecycleError> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        info!("Using redis list store");
        return Ok(Arc::new(gr_storage::RedisListStore::new(url)?));
    }
    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        warn!("GR_REDIS_URL ignored: built without the redis feature");
    }

    if let Some(parent) = config.journal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    info!(path = %config.journal_path.display(), "Using journal list store");
    Ok(Arc::new(JournalListStore::open(&config.journal_path)?))
}

fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.lock_path) {
            warn!("Failed to remove PID file: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
