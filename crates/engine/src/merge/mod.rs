// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merging a workspace mapset back into its shared target.
//!
//! The merge runs in two phases. First every embedded reference to the
//! workspace mapset name is rewritten inside the workspace copy (group REF
//! files, virtual raster lists, the tgis catalog). Only when all rewrites
//! succeeded is anything written to the target. The target catalog is merged
//! on a staging copy that replaces the original in one rename.

mod catalog;
mod refs;

pub use catalog::METADATA_TABLE;

use crate::error::MergeError;
use crate::files::{copy_dir_all, remove_path};
use std::fs;
use std::path::Path;

pub const CATALOG_DIR: &str = "tgis";
pub const CATALOG_FILE: &str = "sqlite.db";
/// Vector attribute database directory
const ATTRIBUTE_DIR: &str = "sqlite";

/// Mapset-root entries that describe the workspace, not its data.
const SKIPPED: &[&str] = &["SEARCH_PATH", ".tmp", ".gislock"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// The target did not exist and was created
    pub created: bool,
    /// Datasets (element entries) copied into the target
    pub datasets: usize,
}

/// Merge `source` (mapset `source_name`) into `target` (mapset `target_name`).
pub fn merge_mapset(
    source: &Path,
    source_name: &str,
    target: &Path,
    target_name: &str,
) -> Result<MergeReport, MergeError> {
    refs::rewrite_groups(source, source_name, target_name)?;
    refs::rewrite_vrts(source, source_name, target_name)?;
    let source_catalog = source.join(CATALOG_DIR).join(CATALOG_FILE);
    if source_catalog.is_file() {
        catalog::rewrite_mapset(&source_catalog, source_name, target_name)?;
    }

    let report = if target.exists() {
        merge_existing(source, target)?
    } else {
        create_target(source, target)?
    };
    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        created = report.created,
        datasets = report.datasets,
        "mapset merged"
    );
    Ok(report)
}

fn create_target(source: &Path, target: &Path) -> Result<MergeReport, MergeError> {
    let parent = target.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(MergeError::io("create", parent))?;

    let staging = parent.join(format!(
        ".{}.merge",
        target.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    ));
    remove_path(&staging).map_err(MergeError::io("remove", &staging))?;
    let copied = copy_data(source, &staging);
    let datasets = match copied {
        Ok(n) => n,
        Err(e) => {
            let _ = remove_path(&staging);
            return Err(e);
        }
    };
    fs::rename(&staging, target).map_err(MergeError::io("rename", &staging))?;
    Ok(MergeReport { created: true, datasets })
}

fn copy_data(source: &Path, dest: &Path) -> Result<usize, MergeError> {
    fs::create_dir_all(dest).map_err(MergeError::io("create", dest))?;
    let mut datasets = 0;
    for entry in fs::read_dir(source).map_err(MergeError::io("read", source))? {
        let entry = entry.map_err(MergeError::io("read", source))?;
        let name = entry.file_name();
        if SKIPPED.iter().any(|s| name == *s) {
            continue;
        }
        let from = entry.path();
        let to = dest.join(&name);
        if from.is_dir() {
            copy_dir_all(&from, &to).map_err(MergeError::io("copy", &from))?;
            datasets += count_entries(&from);
        } else {
            fs::copy(&from, &to).map_err(MergeError::io("copy", &from))?;
        }
    }
    Ok(datasets)
}

fn merge_existing(source: &Path, target: &Path) -> Result<MergeReport, MergeError> {
    let mut datasets = 0;
    for entry in fs::read_dir(source).map_err(MergeError::io("read", source))? {
        let entry = entry.map_err(MergeError::io("read", source))?;
        let name = entry.file_name();
        if SKIPPED.iter().any(|s| name == *s) {
            continue;
        }
        let from = entry.path();
        let to = target.join(&name);

        if !from.is_dir() {
            // Region and settings of the target win
            if !to.exists() {
                fs::copy(&from, &to).map_err(MergeError::io("copy", &from))?;
            }
            continue;
        }

        if name == CATALOG_DIR || name == ATTRIBUTE_DIR {
            let (src_db, dst_db) = (from.join(CATALOG_FILE), to.join(CATALOG_FILE));
            if src_db.is_file() && dst_db.is_file() {
                if name == CATALOG_DIR {
                    catalog::merge_catalog(&src_db, &dst_db)?;
                } else {
                    catalog::replace_tables(&src_db, &dst_db)?;
                }
            } else if src_db.is_file() {
                fs::create_dir_all(&to).map_err(MergeError::io("create", &to))?;
                fs::copy(&src_db, &dst_db).map_err(MergeError::io("copy", &src_db))?;
            }
            continue;
        }

        datasets += merge_element(&from, &to)?;
    }
    Ok(MergeReport { created: false, datasets })
}

/// Copy every dataset of one element directory (`cell`, `vector`, `group`,
/// ...), replacing same-named datasets in the target.
fn merge_element(from: &Path, to: &Path) -> Result<usize, MergeError> {
    fs::create_dir_all(to).map_err(MergeError::io("create", to))?;
    let mut count = 0;
    for entry in fs::read_dir(from).map_err(MergeError::io("read", from))? {
        let entry = entry.map_err(MergeError::io("read", from))?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        if src.is_dir() {
            remove_path(&dst).map_err(MergeError::io("remove", &dst))?;
            copy_dir_all(&src, &dst).map_err(MergeError::io("copy", &src))?;
        } else {
            fs::copy(&src, &dst).map_err(MergeError::io("copy", &src))?;
        }
        count += 1;
    }
    Ok(count)
}

fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
