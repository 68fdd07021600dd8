// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

#[test]
fn startup_marker_appends_pid_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().join("state"));

    write_startup_marker(&config).unwrap();
    write_startup_marker(&config).unwrap();

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    let expected = format!("--- grd: starting (pid: {}) ---", std::process::id());
    assert_eq!(log.lines().filter(|line| *line == expected).count(), 2);
}

#[test]
fn startup_error_is_appended_to_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("daemon.log");
    std::fs::write(&log_path, "earlier\n").unwrap();

    write_startup_error(&log_path, &LifecycleError::NoStateDir);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.starts_with("earlier\n"));
    assert!(log.contains("ERROR Failed to start daemon: Could not determine state directory"));
}

#[test]
fn startup_error_into_missing_directory_is_silent() {
    write_startup_error(
        &PathBuf::from("/nonexistent/dir/daemon.log"),
        &LifecycleError::NoStateDir,
    );
}
