// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named FIFO lists backing the durable job queue.

use crate::journal::{Journal, JournalError};
use crate::lists::{wait_for_entry, ListOp, Lists};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Journal entries written before the journal is compacted.
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ListStoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
}

/// Named lists with an atomic head-to-tail move.
///
/// Lists are FIFO: `push` appends to the tail, `move_first` takes the head.
#[async_trait]
pub trait ListStore: Send + Sync + 'static {
    async fn push(&self, list: &str, value: &str) -> Result<(), ListStoreError>;

    /// Atomically move the head of `from` to the tail of `to`, waiting up to
    /// `timeout` for an entry to arrive. Returns the moved value.
    async fn move_first(
        &self,
        from: &str,
        to: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ListStoreError>;

    /// Remove up to `count` exact matches of `value`, head first (0 = all).
    async fn remove(&self, list: &str, value: &str, count: usize) -> Result<usize, ListStoreError>;

    /// Move every entry of `from` to the tail of `to`, preserving order.
    async fn move_all(&self, from: &str, to: &str) -> Result<usize, ListStoreError>;

    async fn len(&self, list: &str) -> Result<usize, ListStoreError>;

    /// Entries of `list`, head first.
    async fn range(&self, list: &str) -> Result<Vec<String>, ListStoreError>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), ListStoreError>;
}

struct JournalState {
    lists: Lists,
    journal: Journal,
    /// Entries the journal held right after the last compaction
    compacted_len: u64,
}

/// Lists held in memory and made durable by an append-only journal.
pub struct JournalListStore {
    state: Mutex<JournalState>,
    notify: Notify,
    compact_threshold: u64,
}

impl JournalListStore {
    /// Open the journal at `path` and replay it.
    pub fn open(path: &Path) -> Result<Self, ListStoreError> {
        let (journal, ops) = Journal::open(path)?;
        let mut lists = Lists::default();
        for op in &ops {
            lists.apply(op);
        }
        debug!(path = %path.display(), replayed = ops.len(), "opened list journal");

        Ok(Self {
            state: Mutex::new(JournalState {
                lists,
                journal,
                compacted_len: 0,
            }),
            notify: Notify::new(),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        })
    }

    pub fn with_compact_threshold(mut self, threshold: u64) -> Self {
        self.compact_threshold = threshold.max(1);
        self
    }

    /// Journal then apply `op`. No-ops are neither journaled nor applied.
    fn commit(&self, op: ListOp) -> Result<crate::lists::Applied, ListStoreError> {
        let mut state = self.state.lock();
        if !state.lists.would_change(&op) {
            return Ok(Default::default());
        }
        state.journal.append(&op)?;
        let applied = state.lists.apply(&op);

        if state.journal.appended() >= state.compacted_len + self.compact_threshold {
            let ops = state.lists.rebuild_ops();
            match state.journal.compact(&ops) {
                Ok(()) => {
                    debug!(
                        entries = ops.len(),
                        seq = state.journal.seq(),
                        "compacted list journal"
                    );
                    state.compacted_len = ops.len() as u64;
                }
                Err(e) => warn!(error = %e, "journal compaction failed"),
            }
        }
        Ok(applied)
    }
}

#[async_trait]
impl ListStore for JournalListStore {
    async fn push(&self, list: &str, value: &str) -> Result<(), ListStoreError> {
        self.commit(ListOp::push(list, value))?;
        self.notify.notify_waiters();
        Ok(())
    }

    async fn move_first(
        &self,
        from: &str,
        to: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ListStoreError> {
        wait_for_entry(&self.notify, timeout, || {
            Ok(self.commit(ListOp::move_first(from, to))?.moved)
        })
        .await
    }

    async fn remove(&self, list: &str, value: &str, count: usize) -> Result<usize, ListStoreError> {
        Ok(self.commit(ListOp::remove(list, value, count))?.affected)
    }

    async fn move_all(&self, from: &str, to: &str) -> Result<usize, ListStoreError> {
        let applied = self.commit(ListOp::move_all(from, to))?;
        if applied.affected > 0 {
            self.notify.notify_waiters();
        }
        Ok(applied.affected)
    }

    async fn len(&self, list: &str) -> Result<usize, ListStoreError> {
        Ok(self.state.lock().lists.len(list))
    }

    async fn range(&self, list: &str) -> Result<Vec<String>, ListStoreError> {
        Ok(self.state.lock().lists.range(list))
    }

    async fn ping(&self) -> Result<(), ListStoreError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeListStore;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        lists: Mutex<Lists>,
        notify: Notify,
        unavailable: AtomicBool,
    }

    /// In-memory list store whose availability can be switched off.
    #[derive(Clone, Default)]
    pub struct FakeListStore {
        inner: Arc<FakeState>,
    }

    impl FakeListStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call fail with `Unavailable`.
        pub fn set_unavailable(&self, unavailable: bool) {
            self.inner.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Entries of `list`, head first, without going through the trait.
        pub fn entries(&self, list: &str) -> Vec<String> {
            self.inner.lists.lock().range(list)
        }

        fn check(&self) -> Result<(), ListStoreError> {
            if self.inner.unavailable.load(Ordering::SeqCst) {
                return Err(ListStoreError::Unavailable("fake store switched off".to_string()));
            }
            Ok(())
        }

        fn apply(&self, op: ListOp) -> Result<crate::lists::Applied, ListStoreError> {
            self.check()?;
            Ok(self.inner.lists.lock().apply(&op))
        }
    }

    #[async_trait]
    impl ListStore for FakeListStore {
        async fn push(&self, list: &str, value: &str) -> Result<(), ListStoreError> {
            self.apply(ListOp::push(list, value))?;
            self.inner.notify.notify_waiters();
            Ok(())
        }

        async fn move_first(
            &self,
            from: &str,
            to: &str,
            timeout: Duration,
        ) -> Result<Option<String>, ListStoreError> {
            wait_for_entry(&self.inner.notify, timeout, || {
                Ok(self.apply(ListOp::move_first(from, to))?.moved)
            })
            .await
        }

        async fn remove(
            &self,
            list: &str,
            value: &str,
            count: usize,
        ) -> Result<usize, ListStoreError> {
            Ok(self.apply(ListOp::remove(list, value, count))?.affected)
        }

        async fn move_all(&self, from: &str, to: &str) -> Result<usize, ListStoreError> {
            let applied = self.apply(ListOp::move_all(from, to))?;
            self.inner.notify.notify_waiters();
            Ok(applied.affected)
        }

        async fn len(&self, list: &str) -> Result<usize, ListStoreError> {
            self.check()?;
            Ok(self.inner.lists.lock().len(list))
        }

        async fn range(&self, list: &str) -> Result<Vec<String>, ListStoreError> {
            self.check()?;
            Ok(self.inner.lists.lock().range(list))
        }

        async fn ping(&self) -> Result<(), ListStoreError> {
            self.check()
        }
    }
}

#[cfg(test)]
#[path = "list_store_tests.rs"]
mod tests;
