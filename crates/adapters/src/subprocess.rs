// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Why a subprocess did not run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cancelled")]
    Cancelled,
    #[error("deadline of {}ms exceeded", .0.as_millis())]
    DeadlineExceeded(Duration),
    #[error("failed to run: {0}")]
    Io(#[from] std::io::Error),
}

/// Run a subprocess until it exits, `deadline` elapses, or `cancel` fires.
///
/// The child is spawned with `kill_on_drop`, so both termination paths kill
/// it by dropping the pending `output()` future. Cancellation wins when it
/// races the deadline. A non-zero exit is not an error here; callers read it
/// from the returned `Output`.
pub async fn run_cancellable(
    mut cmd: Command,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Output, RunError> {
    cmd.kill_on_drop(true).stdin(Stdio::null());

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RunError::Cancelled),
        result = tokio::time::timeout(deadline, cmd.output()) => match result {
            Ok(output) => Ok(output?),
            Err(_elapsed) => Err(RunError::DeadlineExceeded(deadline)),
        },
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
