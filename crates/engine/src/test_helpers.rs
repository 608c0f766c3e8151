// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture databases for engine tests.

use crate::layout::DatabaseLayout;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub(crate) const PROJECT: &str = "nc";
pub(crate) const GROUP: &str = "grp";
pub(crate) const DEFAULT_REGION: &str = "north: 10\nsouth: 0\neast: 10\nwest: 0\n";

/// A global `nc` project with `PERMANENT` and `landsat`, and an empty user area.
pub(crate) fn seeded_layout(root: &Path) -> DatabaseLayout {
    let layout = DatabaseLayout::under(root);
    let permanent = layout.global_mapset(PROJECT, "PERMANENT");
    write_files(
        &permanent,
        &[
            ("DEFAULT_WIND", DEFAULT_REGION),
            ("WIND", DEFAULT_REGION),
            ("PROJ_INFO", "name: Lambert\n"),
            ("cell/elevation", "elevation cells"),
        ],
    );
    write_files(&layout.global_mapset(PROJECT, "landsat"), &[("cell/lsat7", "landsat cells")]);
    fs::create_dir_all(layout.user_database.join(GROUP).join(PROJECT)).unwrap();
    layout
}

pub(crate) fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Relative path -> content of every regular file below `dir`.
pub(crate) fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    collect(dir, dir, &mut out);
    out
}

fn collect(base: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(base, &path, out);
        } else {
            let rel = path.strip_prefix(base).unwrap().display().to_string();
            out.insert(rel, fs::read(&path).unwrap());
        }
    }
}
