// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs

use gr_core::VolumeLayout;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_DISPATCH_CAPACITY: usize = 10;
pub const DEFAULT_RESULTS_CAPACITY: usize = 100;
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SHELL: &str = "bash";
pub const DEFAULT_RUN_AS_USER: &str = "jobrunner";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Concurrent worker loops
    pub workers: usize,
    /// Bound of the bridge -> worker channel
    pub dispatch_capacity: usize,
    /// Bound of the worker -> retry coordinator channel
    pub results_capacity: usize,
    /// Deadline for a single execution attempt
    pub job_timeout: Duration,
    /// How long one bridge dequeue blocks before looping
    pub dequeue_timeout: Duration,
    /// Shell used as `<shell> -c <command>`
    pub shell: String,
    /// `USER` value exported to commands
    pub run_as_user: String,
    pub volumes: VolumeLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
            results_capacity: DEFAULT_RESULTS_CAPACITY,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
            shell: DEFAULT_SHELL.to_string(),
            run_as_user: DEFAULT_RUN_AS_USER.to_string(),
            volumes: VolumeLayout::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_dispatch_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_capacity = capacity.max(1);
        self
    }

    pub fn with_results_capacity(mut self, capacity: usize) -> Self {
        self.results_capacity = capacity.max(1);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_run_as_user(mut self, user: impl Into<String>) -> Self {
        self.run_as_user = user.into();
        self
    }

    pub fn with_volumes(mut self, volumes: VolumeLayout) -> Self {
        self.volumes = volumes;
        self
    }
}
