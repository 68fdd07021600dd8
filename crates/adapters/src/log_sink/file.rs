// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed log sink: `<dir>/<job_id>.log`, one message per line.

use super::{poll_stream, LogLine, LogSink, LogSinkError, STREAM_POLL_INTERVAL};
use async_trait::async_trait;
use gr_core::JobId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct FileLogSink {
    dir: PathBuf,
    poll_interval: Duration,
}

impl FileLogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: STREAM_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file for a job. Ids that could escape the directory are rejected.
    pub fn path_for(&self, job_id: &JobId) -> Result<PathBuf, LogSinkError> {
        let id = job_id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(LogSinkError::InvalidJobId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.log")))
    }
}

#[async_trait]
impl LogSink for FileLogSink {
    async fn append(&self, job_id: &JobId, message: &str) -> Result<(), LogSinkError> {
        let path = self.path_for(job_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // one message per line
        let mut line = message.replace('\n', "\\n");
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, job_id: &JobId, from_offset: u64) -> Result<Vec<LogLine>, LogSinkError> {
        let path = self.path_for(job_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        // a trailing partial line is still being written
        let complete = match content.rfind('\n') {
            Some(end) => &content[..=end],
            None => "",
        };
        Ok(complete
            .lines()
            .enumerate()
            .skip(from_offset as usize)
            .map(|(i, message)| LogLine {
                offset: i as u64,
                message: message.to_string(),
            })
            .collect())
    }

    fn stream(
        self: Arc<Self>,
        job_id: JobId,
        from_offset: u64,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<LogLine> {
        let interval = self.poll_interval;
        poll_stream(self, job_id, from_offset, interval, cancel)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
