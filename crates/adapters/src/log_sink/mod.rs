// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job log transport

mod file;

pub use file::FileLogSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLogSink;

use async_trait::async_trait;
use gr_core::JobId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How often a live stream checks for new lines.
pub const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(200);

const STREAM_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid job id for log path: {0:?}")]
    InvalidJobId(String),
    #[error("append failed: {0}")]
    AppendFailed(String),
}

/// One message in a job's log. Offsets count messages from 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub offset: u64,
    pub message: String,
}

/// Append-only log destination, one stream per job.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    async fn append(&self, job_id: &JobId, message: &str) -> Result<(), LogSinkError>;

    /// Messages at `from_offset` and later that exist right now.
    async fn read(&self, job_id: &JobId, from_offset: u64) -> Result<Vec<LogLine>, LogSinkError>;

    /// Live tail from `from_offset`.
    ///
    /// The sequence is unbounded: it ends only when `cancel` fires or the
    /// receiver is dropped.
    fn stream(
        self: Arc<Self>,
        job_id: JobId,
        from_offset: u64,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<LogLine>;
}

/// Tail a sink by polling [`LogSink::read`].
pub(crate) fn poll_stream(
    sink: Arc<dyn LogSink>,
    job_id: JobId,
    from_offset: u64,
    interval: Duration,
    cancel: CancellationToken,
) -> mpsc::Receiver<LogLine> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(async move {
        let mut offset = from_offset;
        loop {
            match sink.read(&job_id, offset).await {
                Ok(lines) => {
                    for line in lines {
                        offset = line.offset + 1;
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            sent = tx.send(line) => {
                                if sent.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
                Err(e) => tracing::debug!(job_id = %job_id, error = %e, "log stream read failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tx.closed() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });
    rx
}
