// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for `baton verify` and `baton jobs`

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::{baton, quick_run, setup_test_env, LINE};
use predicates::prelude::*;
use std::fs;

#[test]
fn verify_rejects_interleaved_output() {
    let temp = setup_test_env();
    fs::write(
        temp.path().join("output.txt"),
        format!("{LINE}\n\nMaestMaestro ro is the best......\n\n"),
    )
    .unwrap();

    baton(temp.path())
        .args(["verify", "output.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("paragraph 1 is corrupted"));
}

#[test]
fn verify_accepts_empty_file() {
    let temp = setup_test_env();
    fs::write(temp.path().join("output.txt"), "").unwrap();

    baton(temp.path())
        .args(["verify", "output.txt", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"paragraphs\": 0"));
}

#[test]
fn verify_missing_file_fails() {
    let temp = setup_test_env();

    baton(temp.path())
        .args(["verify", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn jobs_accumulate_across_runs() {
    let temp = setup_test_env();

    for _ in 0..2 {
        quick_run(temp.path(), 2)
            .args(["--wal", "jobs.wal"])
            .assert()
            .success();
    }

    let output = baton(temp.path())
        .args(["jobs", "--wal", "jobs.wal", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r["status"] == "succeeded"));

    let contents = fs::read_to_string(temp.path().join("output.txt")).unwrap();
    assert_eq!(contents, format!("{LINE}\n\n").repeat(4));
}

#[test]
fn jobs_without_wal_fails() {
    let temp = setup_test_env();

    baton(temp.path())
        .args(["jobs", "--wal", "missing.wal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no write-ahead log"));
}

#[test]
fn jobs_on_empty_wal_says_so() {
    let temp = setup_test_env();
    fs::write(temp.path().join("empty.wal"), "").unwrap();

    baton(temp.path())
        .args(["jobs", "--wal", "empty.wal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No jobs"));
}
