// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{seeded_layout, GROUP, PROJECT};
use mj_adapters::{FakeTool, FakeToolRunner};
use std::fs;

fn export(name: &str, kind: ResourceKind, format: &str) -> ResourceExport {
    ResourceExport {
        step_id: "1".into(),
        name: name.into(),
        kind,
        format: format.into(),
        target: ExportTarget::Storage,
    }
}

#[yare::parameterized(
    geotiff   = { ResourceKind::Raster, "GTiff", "r.out.gdal", "out.tif" },
    ascii     = { ResourceKind::Raster, "AAIGrid", "r.out.gdal", "out.asc" },
    geopkg    = { ResourceKind::Vector, "GPKG", "v.out.ogr", "out.gpkg" },
    geojson   = { ResourceKind::Vector, "GeoJSON", "v.out.ogr", "out.geojson" },
    strds     = { ResourceKind::Strds, "GTiff", "t.rast.export", "out.tar.gz" },
    strds_pack = { ResourceKind::Strds, "pack", "t.rast.export", "out.pack" },
)]
fn strategy_by_kind(kind: ResourceKind, format: &str, tool: &str, file: &str) {
    let plan = plan(&export("out", kind, format), Path::new("/store/u/r"));
    let (executable, args) = plan.tool.unwrap();
    assert_eq!(executable, tool);
    assert!(args.contains(&"input=out".to_string()));
    assert!(args.contains(&format!("output=/store/u/r/{}", file)));
    assert_eq!(plan.path, Some(PathBuf::from("/store/u/r").join(file)));
}

#[test]
fn database_target_has_no_path() {
    let mut e = export("roads", ResourceKind::Vector, "PostgreSQL");
    e.target = ExportTarget::Database { dbstring: "PG:dbname=gis".into(), layer: Some("roads_out".into()) };
    let plan = plan(&e, Path::new("/store"));
    assert_eq!(plan.path, None);
    let (executable, args) = plan.tool.unwrap();
    assert_eq!(executable, "v.out.ogr");
    assert_eq!(
        args,
        vec!["input=roads", "output=PG:dbname=gis", "format=PostgreSQL", "output_layer=roads_out"]
    );
}

#[tokio::test]
async fn file_export_copies_from_file_dir() {
    let dir = tempfile::tempdir().unwrap();
    let layout = seeded_layout(dir.path());
    let ws = Workspace::create(&layout, GROUP, PROJECT, dir.path().join("ws"), &["PERMANENT".to_string()].into(), None)
        .unwrap();
    fs::write(ws.file_dir().join("stats.csv"), "a,b\n").unwrap();
    let dest = dir.path().join("store");

    let runner = FakeToolRunner::new();
    let out = export_resource(&runner, &ws, &export("stats.csv", ResourceKind::File, "file"), &dest, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(dest.join("stats.csv")).unwrap(), "a,b\n");
    assert_eq!(out.path, Some(dest.join("stats.csv").display().to_string()));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn failing_export_tool_is_an_export_error() {
    let dir = tempfile::tempdir().unwrap();
    let layout = seeded_layout(dir.path());
    let ws = Workspace::create(&layout, GROUP, PROJECT, dir.path().join("ws"), &["PERMANENT".to_string()].into(), None)
        .unwrap();
    let runner = FakeToolRunner::new();
    runner.on("r.out.gdal", FakeTool::exit(1).stderr("no such raster"));

    let err = export_resource(&runner, &ws, &export("out", ResourceKind::Raster, "GTiff"), &dir.path().join("s"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Export { ref message, .. } if message.contains("no such raster")));
}
