// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Instant;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[tokio::test]
async fn captures_output() {
    let cancel = CancellationToken::new();
    let output = run_cancellable(sh("echo hello"), Duration::from_secs(5), &cancel)
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn nonzero_exit_is_not_an_error() {
    let cancel = CancellationToken::new();
    let output = run_cancellable(sh("echo oops >&2; exit 4"), Duration::from_secs(5), &cancel)
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
}

#[tokio::test]
async fn missing_binary_is_io_error() {
    let cancel = CancellationToken::new();
    let result = run_cancellable(
        Command::new("/nonexistent/binary"),
        Duration::from_secs(5),
        &cancel,
    )
    .await;
    assert!(matches!(result, Err(RunError::Io(_))));
}

#[tokio::test]
async fn deadline_kills_long_command() {
    let cancel = CancellationToken::new();
    let start = Instant::now();
    let result = run_cancellable(sh("sleep 10"), Duration::from_millis(100), &cancel).await;

    assert!(
        matches!(result, Err(RunError::DeadlineExceeded(_))),
        "got: {result:?}"
    );
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancel_is_distinct_from_deadline() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = run_cancellable(sh("sleep 10"), Duration::from_secs(30), &cancel).await;
    assert!(
        matches!(result, Err(RunError::Cancelled)),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn already_cancelled_never_runs() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = run_cancellable(
        sh(&format!("touch {}", marker.display())),
        Duration::from_secs(5),
        &cancel,
    )
    .await;
    assert!(matches!(result, Err(RunError::Cancelled)));
    assert!(!marker.exists());
}
