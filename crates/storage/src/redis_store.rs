// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed list store.
//!
//! Lists are pushed on the left and popped on the right, so the right end
//! is the oldest entry. Commands run on the blocking pool with a
//! connection per call.

use crate::list_store::{ListStore, ListStoreError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Shortest blocking wait sent to BRPOPLPUSH; 0 would block forever.
const MIN_BLOCK_SECS: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct RedisListStore {
    client: Arc<redis::Client>,
}

impl RedisListStore {
    /// Create a store for `redis_url` (e.g. `redis://localhost:6379`).
    ///
    /// Only parses the URL; use [`ListStore::ping`] to check reachability.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, ListStoreError> {
        let url = redis_url.as_ref();
        let client = redis::Client::open(url).map_err(unavailable)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, ListStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            let mut conn = client.get_connection().map_err(unavailable)?;
            f(&mut conn).map_err(unavailable)
        })
        .await
        .map_err(|e| ListStoreError::Unavailable(format!("redis task failed: {e}")))?
    }
}

fn unavailable(e: redis::RedisError) -> ListStoreError {
    ListStoreError::Unavailable(e.to_string())
}

#[async_trait]
impl ListStore for RedisListStore {
    #[instrument(skip(self, value), err)]
    async fn push(&self, list: &str, value: &str) -> Result<(), ListStoreError> {
        let (list, value) = (list.to_string(), value.to_string());
        self.run(move |conn| {
            redis::cmd("LPUSH")
                .arg(&list)
                .arg(&value)
                .query::<i64>(conn)
                .map(|_| ())
        })
        .await
    }

    async fn move_first(
        &self,
        from: &str,
        to: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ListStoreError> {
        let (from, to) = (from.to_string(), to.to_string());
        let secs = timeout.as_secs_f64().max(MIN_BLOCK_SECS);
        self.run(move |conn| {
            redis::cmd("BRPOPLPUSH")
                .arg(&from)
                .arg(&to)
                .arg(secs)
                .query(conn)
        })
        .await
    }

    async fn remove(&self, list: &str, value: &str, count: usize) -> Result<usize, ListStoreError> {
        let (list, value) = (list.to_string(), value.to_string());
        self.run(move |conn| {
            redis::cmd("LREM")
                .arg(&list)
                .arg(count)
                .arg(&value)
                .query(conn)
        })
        .await
    }

    #[instrument(skip(self), err)]
    async fn move_all(&self, from: &str, to: &str) -> Result<usize, ListStoreError> {
        let (from, to) = (from.to_string(), to.to_string());
        self.run(move |conn| {
            let mut moved = 0;
            loop {
                let value: Option<String> =
                    redis::cmd("RPOPLPUSH").arg(&from).arg(&to).query(conn)?;
                if value.is_none() {
                    return Ok(moved);
                }
                moved += 1;
            }
        })
        .await
    }

    async fn len(&self, list: &str) -> Result<usize, ListStoreError> {
        let list = list.to_string();
        self.run(move |conn| redis::cmd("LLEN").arg(&list).query(conn))
            .await
    }

    async fn range(&self, list: &str) -> Result<Vec<String>, ListStoreError> {
        let list = list.to_string();
        let query = move |conn: &mut redis::Connection| {
            redis::cmd("LRANGE").arg(&list).arg(0).arg(-1).query(conn)
        };
        let mut entries: Vec<String> = self.run(query).await?;
        entries.reverse();
        Ok(entries)
    }

    async fn ping(&self) -> Result<(), ListStoreError> {
        self.run(|conn| redis::cmd("PING").query::<String>(conn).map(|_| ()))
            .await
    }
}

#[cfg(test)]
#[path = "redis_store_tests.rs"]
mod tests;
