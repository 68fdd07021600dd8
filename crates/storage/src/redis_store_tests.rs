// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rejects_malformed_url() {
    assert!(matches!(
        RedisListStore::new("not a url"),
        Err(ListStoreError::Unavailable(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    // port 1 is never a redis server
    let store = RedisListStore::new("redis://127.0.0.1:1").unwrap();
    assert!(matches!(store.ping().await, Err(ListStoreError::Unavailable(_))));
}
