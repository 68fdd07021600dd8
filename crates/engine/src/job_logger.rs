// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job log handle.
//!
//! Writes one JSON entry per message to the job's log sink:
//!   `{"level":"info","message":"...","timestamp_ms":N,"fields":{...}}`
//!
//! The handle is a live capability and never part of a queued job; the
//! dispatch bridge builds a fresh one after every dequeue.

use gr_adapters::LogSink;
use gr_core::{Clock, JobId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Wire format of a job log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

/// Wall-clock source captured from the engine's clock.
type EpochMs = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Clone)]
pub struct JobLogger {
    job_id: JobId,
    sink: Arc<dyn LogSink>,
    epoch_ms: EpochMs,
}

impl JobLogger {
    /// Entries are stamped with `clock`'s wall time.
    pub fn new(job_id: JobId, sink: Arc<dyn LogSink>, clock: &impl Clock) -> Self {
        let clock = clock.clone();
        Self {
            job_id,
            sink,
            epoch_ms: Arc::new(move || clock.epoch_ms()),
        }
    }

    #[cfg(test)]
    pub(crate) fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Append an entry.
    ///
    /// Failures are traced but do not propagate; log delivery is best
    /// effort and must not fail the job.
    pub async fn log(&self, level: LogLevel, message: &str, fields: Map<String, Value>) {
        let entry = LogEntry {
            level,
            message: message.to_string(),
            timestamp_ms: (self.epoch_ms)(),
            fields,
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(
                    job_id = %self.job_id,
                    error = %e,
                    "failed to encode job log entry",
                );
                return;
            }
        };
        if let Err(e) = self.sink.append(&self.job_id, &line).await {
            tracing::debug!(job_id = %self.job_id, error = %e, "failed to append job log");
        }
    }

    pub async fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, Map::new()).await;
    }
}

/// Build a `fields` map from key/value pairs.
#[macro_export]
macro_rules! log_fields {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut map = serde_json::Map::new();
        $( map.insert($key.to_string(), serde_json::json!($value)); )*
        map
    }};
}

#[cfg(test)]
#[path = "job_logger_tests.rs"]
mod tests;
