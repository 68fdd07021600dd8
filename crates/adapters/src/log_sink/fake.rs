// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake log sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{poll_stream, LogLine, LogSink, LogSinkError};
use async_trait::async_trait;
use gr_core::JobId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct FakeLogState {
    lines: HashMap<JobId, Vec<String>>,
    failing: bool,
}

/// In-memory log sink that records messages and can be made to fail.
#[derive(Clone, Default)]
pub struct FakeLogSink {
    inner: Arc<Mutex<FakeLogState>>,
}

impl FakeLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Messages recorded for `job_id`.
    pub fn lines(&self, job_id: &JobId) -> Vec<String> {
        self.inner
            .lock()
            .lines
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LogSink for FakeLogSink {
    async fn append(&self, job_id: &JobId, message: &str) -> Result<(), LogSinkError> {
        let mut state = self.inner.lock();
        if state.failing {
            return Err(LogSinkError::AppendFailed("fake sink set to fail".to_string()));
        }
        state
            .lines
            .entry(job_id.clone())
            .or_default()
            .push(message.to_string());
        Ok(())
    }

    async fn read(&self, job_id: &JobId, from_offset: u64) -> Result<Vec<LogLine>, LogSinkError> {
        Ok(self
            .lines(job_id)
            .into_iter()
            .enumerate()
            .skip(from_offset as usize)
            .map(|(i, message)| LogLine {
                offset: i as u64,
                message,
            })
            .collect())
    }

    fn stream(
        self: Arc<Self>,
        job_id: JobId,
        from_offset: u64,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<LogLine> {
        poll_stream(self, job_id, from_offset, Duration::from_millis(10), cancel)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
