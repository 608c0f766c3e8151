// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Isolated per-job workspaces.
//!
//! A workspace is a private project database holding one fresh mapset plus
//! symlinks to every required source mapset:
//!
//! ```text
//! <root>/.grassrc
//! <root>/.files/                   outputs exported as plain files
//! <root>/<project>/PERMANENT  ->   linked read-only
//! <root>/<project>/mapset_<uuid>/  the only writable mapset
//! ```

use crate::error::WorkspaceError;
use crate::files;
use crate::layout::DatabaseLayout;
use mj_core::PERMANENT;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const GISRC_FILE: &str = ".grassrc";
pub const FILE_DIR: &str = ".files";

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    project: String,
    mapset: String,
}

impl Workspace {
    /// Materialize a workspace at `root`.
    ///
    /// The region comes from `region_from` (a mapset directory) when it has
    /// one, otherwise from the project's default region.
    pub fn create(
        layout: &DatabaseLayout,
        group: &str,
        project: &str,
        root: PathBuf,
        required: &BTreeSet<String>,
        region_from: Option<&Path>,
    ) -> Result<Self, WorkspaceError> {
        let mapset = format!("mapset_{}", uuid::Uuid::new_v4().simple());
        let workspace = Self { root, project: project.to_string(), mapset };
        if let Err(e) = workspace.populate(layout, group, required, region_from) {
            if let Err(cleanup) = files::remove_path(&workspace.root) {
                tracing::warn!(root = %workspace.root.display(), error = %cleanup, "failed to remove partial workspace");
            }
            return Err(e);
        }
        tracing::info!(
            root = %workspace.root.display(),
            mapset = %workspace.mapset,
            linked = ?required,
            "workspace created"
        );
        Ok(workspace)
    }

    fn populate(
        &self,
        layout: &DatabaseLayout,
        group: &str,
        required: &BTreeSet<String>,
        region_from: Option<&Path>,
    ) -> Result<(), WorkspaceError> {
        let project_dir = self.project_dir();
        fs::create_dir_all(&project_dir).map_err(WorkspaceError::io("create", &project_dir))?;
        fs::create_dir_all(self.file_dir()).map_err(WorkspaceError::io("create", self.file_dir()))?;

        for name in required {
            let location = layout.resolve(group, &self.project, name).ok_or_else(|| {
                WorkspaceError::MissingMapset { project: self.project.clone(), mapset: name.clone() }
            })?;
            let link = project_dir.join(name);
            link_dir(&location.path, &link).map_err(WorkspaceError::io("link", &link))?;
        }

        let mapset_dir = self.mapset_dir();
        fs::create_dir_all(&mapset_dir).map_err(WorkspaceError::io("create", &mapset_dir))?;

        let region = region_from
            .map(|dir| dir.join("WIND"))
            .filter(|wind| wind.is_file())
            .or_else(|| {
                let default = project_dir.join(PERMANENT).join("DEFAULT_WIND");
                default.is_file().then_some(default)
            })
            .ok_or_else(|| WorkspaceError::MissingRegion(self.project.clone()))?;
        let wind = mapset_dir.join("WIND");
        fs::copy(&region, &wind).map_err(WorkspaceError::io("copy region to", &wind))?;

        let search_path: Vec<&str> =
            std::iter::once(self.mapset.as_str()).chain(required.iter().map(String::as_str)).collect();
        let search_file = mapset_dir.join("SEARCH_PATH");
        fs::write(&search_file, format!("{}\n", search_path.join("\n")))
            .map_err(WorkspaceError::io("write", &search_file))?;

        let gisrc = self.gisrc();
        fs::write(
            &gisrc,
            format!(
                "GISDBASE: {}\nLOCATION_NAME: {}\nMAPSET: {}\nGUI: text\n",
                self.root.display(),
                self.project,
                self.mapset
            ),
        )
        .map_err(WorkspaceError::io("write", &gisrc))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Name of the writable mapset
    pub fn mapset(&self) -> &str {
        &self.mapset
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.join(&self.project)
    }

    pub fn mapset_dir(&self) -> PathBuf {
        self.project_dir().join(&self.mapset)
    }

    pub fn gisrc(&self) -> PathBuf {
        self.root.join(GISRC_FILE)
    }

    pub fn file_dir(&self) -> PathBuf {
        self.root.join(FILE_DIR)
    }

    /// Environment every tool in this workspace runs with.
    pub fn env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("GISRC".to_string(), self.gisrc().display().to_string()),
            ("GRASS_SKIP_MAPSET_OWNER_CHECK".to_string(), "1".to_string()),
        ])
    }

    /// On-disk size of the writable mapset. Errors count as zero.
    pub fn size(&self) -> u64 {
        files::dir_size(&self.mapset_dir()).unwrap_or(0)
    }

    /// Remove the workspace. Linked source mapsets are not touched.
    pub fn discard(self) -> Result<(), WorkspaceError> {
        files::remove_path(&self.root).map_err(WorkspaceError::io("remove", &self.root))?;
        tracing::info!(root = %self.root.display(), "workspace discarded");
        Ok(())
    }
}

#[cfg(unix)]
fn link_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn link_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
