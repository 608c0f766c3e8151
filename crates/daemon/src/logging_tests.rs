// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn mj_log_takes_precedence() {
    std::env::set_var("MJ_LOG", "mj_engine=debug");
    let rendered = filter().to_string();
    std::env::remove_var("MJ_LOG");
    assert_eq!(rendered, "mj_engine=debug");
}

#[test]
#[serial]
fn defaults_to_info() {
    std::env::remove_var("MJ_LOG");
    std::env::remove_var("RUST_LOG");
    assert_eq!(filter().to_string(), "info");
}

#[test]
#[serial]
fn creates_log_dir() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    let _guard = init(Some(&logs)).unwrap();
    assert!(logs.is_dir());
}
