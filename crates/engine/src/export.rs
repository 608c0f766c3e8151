// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Export strategies, selected by resource kind.
//!
//! Export invocations run in the workspace like chain steps but are not part
//! of the process log.

use crate::error::JobError;
use crate::workspace::Workspace;
use mj_adapters::{ToolInvocation, ToolRunner};
use mj_chain::{ExportTarget, ResourceExport};
use mj_core::{ExportedResource, ResourceKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool call that writes one export, or `None` for plain file copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExportPlan {
    pub tool: Option<(String, Vec<String>)>,
    /// Destination in storage; `None` for database targets
    pub path: Option<PathBuf>,
}

fn file_extension(kind: ResourceKind, format: &str) -> &'static str {
    match (kind, format) {
        (ResourceKind::Raster, "AAIGrid") | (ResourceKind::Strds, "AAIGrid") => "asc",
        (ResourceKind::Raster, _) => "tif",
        (ResourceKind::Strds, "pack") => "pack",
        (ResourceKind::Strds, _) => "tar.gz",
        (ResourceKind::Vector, "GeoJSON") => "geojson",
        (ResourceKind::Vector, "GML") => "gml",
        (ResourceKind::Vector, "ESRI_Shapefile") => "shp",
        (ResourceKind::Vector, "CSV") => "csv",
        (ResourceKind::Vector, "SQLite") => "sqlite",
        (ResourceKind::Vector, _) => "gpkg",
        (ResourceKind::File, _) => "",
    }
}

pub(crate) fn plan(export: &ResourceExport, dest_dir: &Path) -> ExportPlan {
    if let ExportTarget::Database { dbstring, layer } = &export.target {
        let mut args = vec![
            format!("input={}", export.name),
            format!("output={}", dbstring),
            format!("format={}", export.format),
        ];
        if let Some(layer) = layer {
            args.push(format!("output_layer={}", layer));
        }
        return ExportPlan { tool: Some(("v.out.ogr".to_string(), args)), path: None };
    }

    if export.kind == ResourceKind::File {
        return ExportPlan { tool: None, path: Some(dest_dir.join(&export.name)) };
    }

    let path = dest_dir.join(format!("{}.{}", export.name, file_extension(export.kind, &export.format)));
    let output = path.display().to_string();
    let tool = match export.kind {
        ResourceKind::Raster => {
            let mut args = vec![
                format!("input={}", export.name),
                format!("output={}", output),
                format!("format={}", export.format),
                "-c".to_string(),
                "-m".to_string(),
            ];
            if export.format == "GTiff" {
                args.push("createopt=COMPRESS=LZW,TILED=YES".to_string());
            }
            ("r.out.gdal".to_string(), args)
        }
        ResourceKind::Vector => (
            "v.out.ogr".to_string(),
            vec![
                format!("input={}", export.name),
                format!("output={}", output),
                format!("format={}", export.format),
            ],
        ),
        _ => (
            "t.rast.export".to_string(),
            vec![
                format!("input={}", export.name),
                format!("output={}", output),
                format!("format={}", export.format),
                "compression=gzip".to_string(),
            ],
        ),
    };
    ExportPlan { tool: Some(tool), path: Some(path) }
}

/// Write one export below `dest_dir`.
pub(crate) async fn export_resource<R: ToolRunner>(
    runner: &R,
    workspace: &Workspace,
    export: &ResourceExport,
    dest_dir: &Path,
    timeout: Duration,
) -> Result<ExportedResource, JobError> {
    let failed = |message: String| JobError::Export { name: export.name.clone(), message };
    let plan = plan(export, dest_dir);

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| failed(format!("cannot create {}: {}", dest_dir.display(), e)))?;

    match &plan.tool {
        None => {
            let source = workspace.file_dir().join(&export.name);
            let dest = plan.path.clone().unwrap_or_else(|| dest_dir.join(&export.name));
            tokio::fs::copy(&source, &dest)
                .await
                .map_err(|e| failed(format!("cannot copy {}: {}", source.display(), e)))?;
        }
        Some((executable, args)) => {
            let invocation = ToolInvocation {
                executable: executable.clone(),
                args: args.clone(),
                cwd: workspace.mapset_dir(),
                env: workspace.env(),
                timeout,
            };
            let output = runner.run(&invocation).await.map_err(|e| failed(e.to_string()))?;
            if output.return_code != 0 {
                return Err(failed(format!(
                    "{} exited with code {}: {}",
                    executable,
                    output.return_code,
                    output.stderr.trim()
                )));
            }
        }
    }

    tracing::info!(name = %export.name, kind = %export.kind, format = %export.format, "resource exported");
    Ok(ExportedResource {
        name: export.name.clone(),
        kind: export.kind,
        format: export.format.clone(),
        path: plan.path.map(|p| p.display().to_string()),
    })
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
