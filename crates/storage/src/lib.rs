// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for Grind: the list store behind the durable queue and the
//! job record store

mod bak;
mod job_store;
mod journal;
mod list_store;
mod lists;
#[cfg(feature = "redis")]
mod redis_store;
mod snapshot;

pub use job_store::{JobStore, JobStoreError, SnapshotJobStore};
pub use journal::{Journal, JournalError};
pub use list_store::{JournalListStore, ListStore, ListStoreError, DEFAULT_COMPACT_THRESHOLD};
pub use lists::ListOp;
#[cfg(feature = "redis")]
pub use redis_store::RedisListStore;
pub use snapshot::{JobSnapshot, SnapshotError};

#[cfg(any(test, feature = "test-support"))]
pub use job_store::MemoryJobStore;
#[cfg(any(test, feature = "test-support"))]
pub use list_store::FakeListStore;
