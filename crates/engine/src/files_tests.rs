// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn size_counts_nested_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("a/one"), [0u8; 10]).unwrap();
    fs::write(dir.path().join("a/b/two"), [0u8; 32]).unwrap();
    assert_eq!(dir_size(dir.path()).unwrap(), 42);
    assert_eq!(dir_size(&dir.path().join("a/one")).unwrap(), 10);
}

#[cfg(unix)]
#[test]
fn size_does_not_follow_links() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("big")).unwrap();
    fs::write(dir.path().join("big/data"), [0u8; 100]).unwrap();
    fs::create_dir_all(dir.path().join("ws")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("big"), dir.path().join("ws/link")).unwrap();
    assert_eq!(dir_size(&dir.path().join("ws")).unwrap(), 0);
}

#[test]
fn copy_and_remove_tree() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("cell")).unwrap();
    fs::write(src.join("cell/dem"), "raster").unwrap();
    fs::write(src.join("WIND"), "region").unwrap();

    let dst = dir.path().join("dst");
    copy_dir_all(&src, &dst).unwrap();
    assert_eq!(fs::read_to_string(dst.join("cell/dem")).unwrap(), "raster");
    assert_eq!(fs::read_to_string(dst.join("WIND")).unwrap(), "region");

    remove_path(&dst).unwrap();
    assert!(!dst.exists());
    remove_path(&dst).unwrap();
}
