// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine.

use crate::clock::Clock;
use crate::tier::{StorageTier, TierError, VolumeLayout};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Retry ceiling applied when a request does not name one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

crate::define_id! {
    /// Unique identifier for a job, assigned by the job store on creation.
    #[derive(Default)]
    pub struct JobId;
}

/// Lifecycle status of a job.
///
/// `Pending -> Running -> {Success | Failed}`. A failed job with retry budget
/// left goes back to `Pending`; `Pending` and `Running` jobs can be
/// cancelled out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// No further transitions happen from a terminal status.
    ///
    /// `Failed` counts as terminal here; the retry coordinator is the only
    /// place that moves a failed job back to `Pending`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn is_cancellable(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why an execution attempt did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The cancel handle was fired deliberately.
    Cancelled,
    /// The per-job deadline expired.
    DeadlineExceeded,
    /// The command exited non-zero.
    Exit,
    /// The shell could not be started.
    Spawn,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Cancelled => "cancelled",
            FailureKind::DeadlineExceeded => "deadline_exceeded",
            FailureKind::Exit => "exit",
            FailureKind::Spawn => "spawn",
        };
        f.write_str(s)
    }
}

/// What a caller submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub command: String,
    #[serde(default)]
    pub storage_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl JobRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            storage_bytes: 0,
            max_retries: None,
        }
    }

    pub fn storage_bytes(mut self, bytes: u64) -> Self {
        self.storage_bytes = bytes;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// A unit of scheduled work.
///
/// This is also the durable queue representation, so it carries no live
/// handles: the per-job log handle travels beside it inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub command: String,
    pub status: JobStatus,
    /// Always a tier size.
    pub storage_bytes: u64,
    pub volume_path: PathBuf,
    pub max_retries: u32,
    /// 1-based attempt counter.
    pub job_trial: u32,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Job {
    /// Admit a request: quantize its storage and derive the volume.
    ///
    /// Oversized requests are rejected here, before any job exists. The id
    /// stays empty until the job store assigns one.
    pub fn from_request(
        request: JobRequest,
        layout: &VolumeLayout,
        clock: &impl Clock,
    ) -> Result<Self, TierError> {
        let tier = StorageTier::quantize(request.storage_bytes)?;
        Ok(Self {
            id: JobId::default(),
            command: request.command,
            status: JobStatus::Pending,
            storage_bytes: tier.bytes(),
            volume_path: layout.volume_for(tier),
            max_retries: request.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            job_trial: 1,
            created_at_ms: clock.epoch_ms(),
            started_at_ms: None,
            finished_at_ms: None,
            exit_code: None,
            error: None,
            failure: None,
        })
    }

    pub fn tier(&self) -> Result<StorageTier, TierError> {
        StorageTier::from_bytes(self.storage_bytes)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a failed attempt may be re-queued.
    ///
    /// With `max_retries = N` a job gets at most `N + 1` trials, and the trial
    /// counter never wraps.
    pub fn can_retry(&self) -> bool {
        self.job_trial <= self.max_retries && self.job_trial < u32::MAX
    }

    pub fn mark_running(&mut self, clock: &impl Clock) {
        self.status = JobStatus::Running;
        self.started_at_ms = Some(clock.epoch_ms());
    }

    pub fn mark_success(&mut self, clock: &impl Clock) {
        self.status = JobStatus::Success;
        self.exit_code = Some(0);
        self.error = None;
        self.failure = None;
        self.finished_at_ms = Some(clock.epoch_ms());
    }

    pub fn mark_failed(
        &mut self,
        kind: FailureKind,
        error: impl Into<String>,
        exit_code: Option<i32>,
        clock: &impl Clock,
    ) {
        self.status = JobStatus::Failed;
        self.failure = Some(kind);
        self.error = Some(error.into());
        self.exit_code = exit_code;
        self.finished_at_ms = Some(clock.epoch_ms());
    }

    pub fn mark_cancelled(&mut self, clock: &impl Clock) {
        self.status = JobStatus::Cancelled;
        self.failure.get_or_insert(FailureKind::Cancelled);
        self.finished_at_ms = Some(clock.epoch_ms());
    }

    /// Move a failed job back to `Pending` for its next trial.
    pub fn prepare_retry(&mut self) {
        self.job_trial = self.job_trial.saturating_add(1);
        self.status = JobStatus::Pending;
        self.started_at_ms = None;
        self.finished_at_ms = None;
        self.exit_code = None;
        self.error = None;
        self.failure = None;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
