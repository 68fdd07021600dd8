// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable at-least-once job queue.
//!
//! Two lists in the backing store: `pending` and `processing`. Dequeue moves
//! an entry from pending to processing in one atomic step; acknowledge
//! removes it from processing. A crash in between leaves the entry in
//! processing, where [`DurableQueue::requeue_stale`] finds it on the next
//! start. Jobs can therefore run more than once.

use gr_core::Job;
use gr_storage::{ListStore, ListStoreError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const PENDING_LIST: &str = "gr:jobs:pending";
pub const PROCESSING_LIST: &str = "gr:jobs:processing";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to encode job: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] ListStoreError),
    #[error("no job arrived within {}ms", .0.as_millis())]
    Empty(Duration),
    #[error("dropped malformed queue entry: {error}")]
    Malformed { error: String, raw: String },
}

/// The exact serialized entry a dequeue moved into the processing list.
///
/// Acknowledging by receipt rather than by re-encoding the job keeps the
/// match exact even after the job was mutated during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt(String);

impl Receipt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dequeued job and the receipt needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub job: Job,
    pub receipt: Receipt,
}

#[derive(Clone)]
pub struct DurableQueue {
    lists: Arc<dyn ListStore>,
    pending: String,
    processing: String,
}

impl DurableQueue {
    pub fn new(lists: Arc<dyn ListStore>) -> Self {
        Self::with_lists(lists, PENDING_LIST, PROCESSING_LIST)
    }

    /// Use custom list names, e.g. to run several queues on one store.
    pub fn with_lists(lists: Arc<dyn ListStore>, pending: &str, processing: &str) -> Self {
        Self {
            lists,
            pending: pending.to_string(),
            processing: processing.to_string(),
        }
    }

    /// Serialize `job` and append it to the pending list.
    pub async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let entry = serde_json::to_string(job)?;
        self.lists.push(&self.pending, &entry).await?;
        Ok(())
    }

    /// Move the oldest pending entry to processing, waiting up to `timeout`.
    ///
    /// An entry that does not decode is removed from processing and reported
    /// as [`QueueError::Malformed`]; the caller should log it and carry on.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Delivery, QueueError> {
        let (pending, processing) = (&self.pending, &self.processing);
        let Some(raw) = self.lists.move_first(pending, processing, timeout).await? else {
            return Err(QueueError::Empty(timeout));
        };

        match serde_json::from_str::<Job>(&raw) {
            Ok(job) => Ok(Delivery {
                job,
                receipt: Receipt(raw),
            }),
            Err(e) => {
                self.lists.remove(processing, &raw, 1).await?;
                Err(QueueError::Malformed {
                    error: e.to_string(),
                    raw,
                })
            }
        }
    }

    /// Remove one exact match of `receipt` from processing.
    ///
    /// Returns whether an entry was removed. `false` means it was already
    /// gone, for example acknowledged by a duplicate run.
    pub async fn acknowledge(&self, receipt: &Receipt) -> Result<bool, QueueError> {
        let removed = self
            .lists
            .remove(&self.processing, receipt.as_str(), 1)
            .await?;
        Ok(removed > 0)
    }

    /// Move everything in processing back to pending.
    ///
    /// Not selective by age: every processing entry counts as abandoned, so
    /// call this only at startup, before anything is dequeued.
    pub async fn requeue_stale(&self) -> Result<usize, QueueError> {
        Ok(self.lists.move_all(&self.processing, &self.pending).await?)
    }

    /// Pending entries.
    pub async fn queue_length(&self) -> Result<usize, QueueError> {
        Ok(self.lists.len(&self.pending).await?)
    }

    /// Entries dequeued but not yet acknowledged.
    pub async fn processing_length(&self) -> Result<usize, QueueError> {
        Ok(self.lists.len(&self.processing).await?)
    }

    pub async fn ping(&self) -> Result<(), QueueError> {
        Ok(self.lists.ping().await?)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
