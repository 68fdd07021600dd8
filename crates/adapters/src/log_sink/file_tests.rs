// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn line(offset: u64, message: &str) -> LogLine {
    LogLine {
        offset,
        message: message.to_string(),
    }
}

#[tokio::test]
async fn append_then_read_from_offset() {
    let dir = tempdir().unwrap();
    let sink = FileLogSink::new(dir.path().join("logs"));
    let id = JobId::new("job-1");

    for message in ["one", "two", "three"] {
        sink.append(&id, message).await.unwrap();
    }

    let lines = sink.read(&id, 1).await.unwrap();
    assert_eq!(lines, vec![line(1, "two"), line(2, "three")]);
}

#[tokio::test]
async fn read_unknown_job_is_empty() {
    let dir = tempdir().unwrap();
    let sink = FileLogSink::new(dir.path());
    assert!(sink.read(&JobId::new("never"), 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn multiline_message_stays_one_entry() {
    let dir = tempdir().unwrap();
    let sink = FileLogSink::new(dir.path());
    let id = JobId::new("job-1");
    sink.append(&id, "a\nb").await.unwrap();

    let lines = sink.read(&id, 0).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].message, "a\\nb");
}

#[yare::parameterized(
    empty     = { "" },
    traversal = { "../escape" },
    slash     = { "a/b" },
    hidden    = { ".hidden" },
)]
fn path_rejects_unsafe_ids(id: &str) {
    let sink = FileLogSink::new("/logs");
    assert!(matches!(
        sink.path_for(&JobId::new(id)),
        Err(LogSinkError::InvalidJobId(_))
    ));
}

#[tokio::test]
async fn stream_tails_new_lines_until_cancelled() {
    let dir = tempdir().unwrap();
    let sink = Arc::new(FileLogSink::new(dir.path()).with_poll_interval(Duration::from_millis(10)));
    let id = JobId::new("job-1");
    sink.append(&id, "first").await.unwrap();

    let cancel = CancellationToken::new();
    let mut rx = Arc::clone(&sink).stream(id.clone(), 0, cancel.clone());

    assert_eq!(rx.recv().await.unwrap().message, "first");
    sink.append(&id, "second").await.unwrap();
    let next = rx.recv().await.unwrap();
    assert_eq!(next, line(1, "second"));

    cancel.cancel();
    assert!(rx.recv().await.is_none());
}
