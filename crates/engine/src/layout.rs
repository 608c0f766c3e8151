// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of project databases, workspaces and exported resources.
//!
//! ```text
//! grass_database/<project>/<mapset>          global, read-only
//! user_database/<group>/<project>/<mapset>   per-group, writable, lockable
//! tmp_workdir/<resource_id>_<iteration>/     one workspace per job
//! download_cache/<user>/<resource_id>/       fetched import sources
//! resource_storage/<user>/<resource_id>/     exported resources
//! ```

use mj_core::{MapsetLockId, ResourceId};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Which database a mapset was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapsetArea {
    User,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsetLocation {
    pub path: PathBuf,
    pub area: MapsetArea,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLayout {
    pub grass_database: PathBuf,
    pub user_database: PathBuf,
    pub tmp_workdir: PathBuf,
    pub download_cache: PathBuf,
    pub resource_storage: PathBuf,
}

impl DatabaseLayout {
    /// Everything below one root directory.
    pub fn under(root: &Path) -> Self {
        Self {
            grass_database: root.join("grassdb"),
            user_database: root.join("userdb"),
            tmp_workdir: root.join("workspace/tmp"),
            download_cache: root.join("workspace/download_cache"),
            resource_storage: root.join("resources"),
        }
    }

    pub fn global_mapset(&self, project: &str, mapset: &str) -> PathBuf {
        self.grass_database.join(project).join(mapset)
    }

    pub fn user_mapset(&self, group: &str, project: &str, mapset: &str) -> PathBuf {
        self.user_database.join(group).join(project).join(mapset)
    }

    pub fn lock_id(&self, group: &str, project: &str, mapset: &str) -> MapsetLockId {
        MapsetLockId::new(group, project, mapset)
    }

    /// Find a mapset, preferring the group's own database.
    pub fn resolve(&self, group: &str, project: &str, mapset: &str) -> Option<MapsetLocation> {
        let user = self.user_mapset(group, project, mapset);
        if user.is_dir() {
            return Some(MapsetLocation { path: user, area: MapsetArea::User });
        }
        let global = self.global_mapset(project, mapset);
        global.is_dir().then_some(MapsetLocation { path: global, area: MapsetArea::Global })
    }

    /// Mapsets of `project` in the group's database.
    pub fn user_mapsets(&self, group: &str, project: &str) -> std::io::Result<BTreeSet<String>> {
        let dir = self.user_database.join(group).join(project);
        let mut mapsets = BTreeSet::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(mapsets),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                mapsets.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(mapsets)
    }

    pub fn workspace_root(&self, resource_id: &ResourceId, iteration: u32) -> PathBuf {
        self.tmp_workdir.join(format!("{}_{}", resource_id, iteration))
    }

    pub fn download_dir(&self, user: &str, resource_id: &ResourceId) -> PathBuf {
        self.download_cache.join(user).join(resource_id.as_str())
    }

    pub fn storage_dir(&self, user: &str, resource_id: &ResourceId) -> PathBuf {
        self.resource_storage.join(user).join(resource_id.as_str())
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
