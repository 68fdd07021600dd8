// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor: runs one command as an isolated subprocess.
//!
//! Isolation is directory and environment scoping: the command runs in the
//! job's volume with the volume prepended to `PATH` and a fixed `USER`. There
//! is no OS-level sandbox.

use crate::job_logger::{JobLogger, LogLevel};
use crate::log_fields;
use gr_adapters::{run_cancellable, RunError};
use gr_core::{FailureKind, Job, JobId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Why an execution attempt did not succeed.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cancelled")]
    Cancelled,
    #[error("deadline of {}ms exceeded", .0.as_millis())]
    DeadlineExceeded(Duration),
    #[error("exited with {}: {stderr}", exit_status(.code))]
    Exit {
        code: Option<i32>,
        stderr: String,
        output: String,
    },
    #[error("failed to start: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ExecError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecError::Cancelled => FailureKind::Cancelled,
            ExecError::DeadlineExceeded(_) => FailureKind::DeadlineExceeded,
            ExecError::Exit { .. } => FailureKind::Exit,
            ExecError::Spawn(_) => FailureKind::Spawn,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "signal".to_string(),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CancelError {
    #[error("job {0} is not running")]
    NotRunning(JobId),
}

/// Runs job commands and tracks a cancel handle per running job.
///
/// Each installed handle carries a generation, so a run that ends can only
/// remove its own handle, never one a newer run of the same job installed.
pub struct Executor {
    shell: String,
    run_as_user: String,
    cancels: RwLock<HashMap<JobId, (u64, CancellationToken)>>,
    generation: AtomicU64,
}

impl Executor {
    pub fn new(shell: impl Into<String>, run_as_user: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            run_as_user: run_as_user.into(),
            cancels: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(1),
        }
    }

    /// Install the cancel handle for a job about to run, replacing any
    /// earlier one. Returns the generation to remove it by.
    pub fn set_cancel_handle(&self, job_id: JobId, handle: CancellationToken) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        self.cancels.write().insert(job_id, (generation, handle));
        generation
    }

    /// Remove the handle installed as `generation`. Returns false, leaving
    /// the map untouched, if the job's handle is missing or newer.
    pub fn remove_cancel_handle(&self, job_id: &JobId, generation: u64) -> bool {
        let mut cancels = self.cancels.write();
        match cancels.get(job_id) {
            Some((current, _)) if *current == generation => {
                cancels.remove(job_id);
                true
            }
            _ => false,
        }
    }

    /// Install a fresh cancel handle, removed again when the returned
    /// registration is dropped.
    pub fn register(&self, job_id: JobId) -> Registration<'_> {
        let token = CancellationToken::new();
        let generation = self.set_cancel_handle(job_id.clone(), token.clone());
        Registration {
            executor: self,
            job_id,
            generation,
            token,
        }
    }

    /// Signal a running job to stop.
    ///
    /// Returns once the signal is delivered, not once the process exits.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<(), CancelError> {
        let cancels = self.cancels.read();
        let (_, handle) = cancels
            .get(job_id)
            .ok_or_else(|| CancelError::NotRunning(job_id.clone()))?;
        handle.cancel();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self, job_id: &JobId) -> bool {
        self.cancels.read().contains_key(job_id)
    }

    /// Jobs with an installed cancel handle.
    pub fn running_count(&self) -> usize {
        self.cancels.read().len()
    }

    /// Run `job.command` in its volume and return the combined output.
    ///
    /// Every output line is appended to the job log. The registration is
    /// dropped when this returns, whatever the outcome.
    pub async fn run_job(
        &self,
        job: &Job,
        deadline: Duration,
        registration: Registration<'_>,
        logger: &JobLogger,
    ) -> Result<String, ExecError> {
        logger
            .log(
                LogLevel::Info,
                "starting command",
                log_fields! {
                    "trial" => job.job_trial,
                    "volume" => job.volume_path.display().to_string(),
                },
            )
            .await;

        let start = Instant::now();
        let result = self.execute(job, deadline, registration.token()).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        drop(registration);

        if let Ok(output) | Err(ExecError::Exit { output, .. }) = &result {
            for line in output.lines().filter(|line| !line.trim().is_empty()) {
                let fields = log_fields! { "stream" => "output" };
                logger.log(LogLevel::Info, line, fields).await;
            }
        }

        match &result {
            Ok(_) => {
                let fields = log_fields! { "elapsed_ms" => elapsed_ms };
                logger
                    .log(LogLevel::Info, "command succeeded", fields)
                    .await
            }
            Err(e) => {
                let fields = log_fields! {
                    "elapsed_ms" => elapsed_ms,
                    "failure" => e.kind().to_string(),
                    "exit_code" => e.exit_code(),
                };
                logger.log(LogLevel::Error, &e.to_string(), fields).await
            }
        }
        result
    }

    async fn execute(
        &self,
        job: &Job,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, ExecError> {
        tokio::fs::create_dir_all(&job.volume_path).await?;

        let path = match std::env::var_os("PATH") {
            Some(existing) => {
                let mut dirs = vec![job.volume_path.clone()];
                dirs.extend(std::env::split_paths(&existing));
                std::env::join_paths(dirs).map_err(std::io::Error::other)?
            }
            None => job.volume_path.clone().into_os_string(),
        };

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&job.command)
            .current_dir(&job.volume_path)
            .env("PATH", path)
            .env("USER", &self.run_as_user);

        let output = match run_cancellable(cmd, deadline, cancel).await {
            Ok(output) => output,
            Err(RunError::Cancelled) => return Err(ExecError::Cancelled),
            Err(RunError::DeadlineExceeded(d)) => return Err(ExecError::DeadlineExceeded(d)),
            Err(RunError::Io(e)) => return Err(ExecError::Spawn(e)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let combined = format!("{stdout}{stderr}");

        if output.status.success() {
            Ok(combined)
        } else {
            Err(ExecError::Exit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
                output: combined,
            })
        }
    }
}

/// One run's installed cancel handle.
///
/// Dropping it removes the handle unless a newer run of the same job has
/// replaced it.
pub struct Registration<'a> {
    executor: &'a Executor,
    job_id: JobId,
    generation: u64,
    token: CancellationToken,
}

impl Registration<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.executor
            .remove_cancel_handle(&self.job_id, self.generation);
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
