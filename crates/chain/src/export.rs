// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Export descriptors and the resource-export list.

use crate::error::ValidationError;
use mj_core::ResourceKind;
use serde::{Deserialize, Serialize};

/// Format name that routes a vector export into a database instead of storage.
pub const DATABASE_FORMAT: &str = "PostgreSQL";

const RASTER_FORMATS: &[&str] = &["GTiff", "COG", "AAIGrid"];
const VECTOR_FORMATS: &[&str] = &["GPKG", "GeoJSON", "GML", "ESRI_Shapefile", "CSV", "SQLite", DATABASE_FORMAT];
const STRDS_FORMATS: &[&str] = &["GTiff", "AAIGrid", "netCDF", "pack"];

/// `{"export": {"type": ..., "format": ...}}` attached to an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDescr {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub format: Option<String>,
    /// Connection string for database exports
    #[serde(default)]
    pub dbstring: Option<String>,
    #[serde(default)]
    pub output_layer: Option<String>,
}

/// Where an exported resource ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// Written below the user's resource storage
    Storage,
    Database { dbstring: String, layer: Option<String> },
}

/// One entry of the resource-export list consumed after the chain completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceExport {
    /// Step that produced the output
    pub step_id: String,
    /// Output name (dataset name, or file name for `file` exports)
    pub name: String,
    pub kind: ResourceKind,
    pub format: String,
    pub target: ExportTarget,
}

impl ExportDescr {
    pub(crate) fn resolve(&self, step_id: &str, name: &str) -> Result<ResourceExport, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidExport { step: step_id.to_string(), reason };

        let (allowed, default): (&[&str], &str) = match self.kind {
            ResourceKind::Raster => (RASTER_FORMATS, "GTiff"),
            ResourceKind::Vector => (VECTOR_FORMATS, "GPKG"),
            ResourceKind::Strds => (STRDS_FORMATS, "GTiff"),
            ResourceKind::File => (&[], "file"),
        };
        let format = self.format.clone().unwrap_or_else(|| default.to_string());
        if !allowed.is_empty() && !allowed.contains(&format.as_str()) {
            return Err(invalid(format!("format '{}' is not supported for {} exports", format, self.kind)));
        }

        let target = if format == DATABASE_FORMAT {
            let dbstring = self
                .dbstring
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| invalid("database exports need a 'dbstring'".into()))?;
            ExportTarget::Database { dbstring, layer: self.output_layer.clone() }
        } else {
            ExportTarget::Storage
        };

        if self.kind == ResourceKind::File
            && (name.contains('/') || name.starts_with('.') || name.is_empty())
        {
            return Err(invalid(format!("invalid file name '{}'", name)));
        }

        Ok(ResourceExport {
            step_id: step_id.to_string(),
            name: name.to_string(),
            kind: self.kind,
            format,
            target,
        })
    }
}
