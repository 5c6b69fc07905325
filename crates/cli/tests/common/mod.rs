// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// The paragraph each successful turn appends
pub const LINE: &str = "Maestro is the best......";

/// Scratch directory cleaned up on drop
pub fn setup_test_env() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// `baton` command running inside `dir` with fast defaults
#[allow(deprecated)]
pub fn baton(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("baton").expect("baton binary");
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

/// `baton run` with short delays so tests stay quick
pub fn quick_run(dir: &Path, participants: usize) -> Command {
    let mut cmd = baton(dir);
    cmd.args([
        "run",
        "--participants",
        &participants.to_string(),
        "--chunk-delay",
        "1ms",
        "--retry-interval",
        "5ms",
        "--give-up-after",
        "30s",
    ]);
    cmd
}
