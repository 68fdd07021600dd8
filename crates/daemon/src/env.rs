// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: GR_STATE_DIR > XDG_STATE_HOME/gr > ~/.local/state/gr
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("GR_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("gr"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/gr"))
}

/// Worker count override
pub fn workers() -> Result<Option<usize>, LifecycleError> {
    parse_var("GR_WORKERS")
}

/// Per-job deadline override
pub fn job_timeout() -> Result<Option<Duration>, LifecycleError> {
    Ok(parse_var("GR_JOB_TIMEOUT_MS")?.map(Duration::from_millis))
}

/// Blocking dequeue timeout override
pub fn dequeue_timeout() -> Result<Option<Duration>, LifecycleError> {
    Ok(parse_var("GR_DEQUEUE_TIMEOUT_MS")?.map(Duration::from_millis))
}

/// Root of the per-tier volume directories
pub fn volume_root() -> Option<PathBuf> {
    std::env::var("GR_VOLUME_ROOT").ok().map(PathBuf::from)
}

/// Redis backing store, only honoured with the `redis` feature
pub fn redis_url() -> Option<String> {
    std::env::var("GR_REDIS_URL")
        .ok()
        .filter(|url| !url.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, LifecycleError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LifecycleError::InvalidEnv { name, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
