// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use crate::executor::CancelError;
use crate::queue::QueueError;
use gr_core::TierError;
use gr_storage::JobStoreError;
use thiserror::Error;

/// Errors surfaced to callers of the engine handle
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job rejected: {0}")]
    Admission(#[from] TierError),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),
    #[error(transparent)]
    Cancel(#[from] CancelError),
}
