// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapset-name rewriting in group and virtual raster files.

use crate::error::MergeError;
use std::fs;
use std::path::Path;

/// Rewrite `group/<name>/REF` (and subgroup REFs). Lines are `map mapset`.
pub(super) fn rewrite_groups(mapset: &Path, from: &str, to: &str) -> Result<(), MergeError> {
    let groups = mapset.join("group");
    if !groups.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(&groups).map_err(MergeError::io("read", &groups))? {
        let group = entry.map_err(MergeError::io("read", &groups))?.path();
        if !group.is_dir() {
            continue;
        }
        let reference = group.join("REF");
        if !reference.is_file() {
            let name = group.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            return Err(MergeError::MissingGroupRef(name));
        }
        rewrite_file(&reference, |line| rewrite_ref_line(line, from, to))?;

        let subgroups = group.join("subgroup");
        if subgroups.is_dir() {
            for sub in fs::read_dir(&subgroups).map_err(MergeError::io("read", &subgroups))? {
                let sub_ref = sub.map_err(MergeError::io("read", &subgroups))?.path().join("REF");
                if sub_ref.is_file() {
                    rewrite_file(&sub_ref, |line| rewrite_ref_line(line, from, to))?;
                }
            }
        }
    }
    Ok(())
}

/// Rewrite `cell_misc/<raster>/vrt`. Lines are `map@mapset`.
pub(super) fn rewrite_vrts(mapset: &Path, from: &str, to: &str) -> Result<(), MergeError> {
    let misc = mapset.join("cell_misc");
    if !misc.is_dir() {
        return Ok(());
    }
    let suffix = format!("@{}", from);
    for entry in fs::read_dir(&misc).map_err(MergeError::io("read", &misc))? {
        let vrt = entry.map_err(MergeError::io("read", &misc))?.path().join("vrt");
        if vrt.is_file() {
            rewrite_file(&vrt, |line| match line.strip_suffix(suffix.as_str()) {
                Some(map) => format!("{}@{}", map, to),
                None => line.to_string(),
            })?;
        }
    }
    Ok(())
}

fn rewrite_ref_line(line: &str, from: &str, to: &str) -> String {
    if !line.split_whitespace().any(|token| token == from) {
        return line.to_string();
    }
    line.split_whitespace().map(|token| if token == from { to } else { token }).collect::<Vec<_>>().join(" ")
}

fn rewrite_file(path: &Path, rewrite: impl Fn(&str) -> String) -> Result<(), MergeError> {
    let content = fs::read_to_string(path).map_err(MergeError::io("read", path))?;
    let mut out: String = content.lines().map(|line| rewrite(line) + "\n").collect();
    if !content.ends_with('\n') {
        out.pop();
    }
    fs::write(path, out).map_err(MergeError::io("write", path))
}

#[cfg(test)]
#[path = "refs_tests.rs"]
mod tests;
