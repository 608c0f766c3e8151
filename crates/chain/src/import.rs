// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Import descriptors and their expansion into fetch/validate/import steps.

use crate::error::ValidationError;
use crate::step::{Param, ProcessStep};
use mj_core::validate_name;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `{"import_descr": {"source": ..., "type": ...}}` attached to an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDescr {
    #[serde(rename = "type")]
    pub kind: ImportKind,
    pub source: String,
    /// Member to extract when the source is an archive, or the layer name
    /// of a database source
    #[serde(default)]
    pub basename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Raster,
    Vector,
    /// Fetched file whose local path replaces the input value
    File,
    /// Vector layer read straight from a database DSN
    Postgis,
}

impl ImportKind {
    /// Whether the input value is produced by the import itself.
    pub fn provides_path(self) -> bool {
        matches!(self, ImportKind::File)
    }
}

/// Steps that must run before the importing step, plus the value that
/// replaces the import descriptor in the original input.
#[derive(Debug)]
pub(crate) struct Expansion {
    pub steps: Vec<ProcessStep>,
    pub value: String,
}

/// Expand one import descriptor.
///
/// `seq` keeps local file names unique within a chain.
pub(crate) fn expand(
    step_id: &str,
    param: &str,
    value: &str,
    descr: &ImportDescr,
    download_dir: &Path,
    seq: usize,
) -> Result<Expansion, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidImport { step: step_id.to_string(), reason };
    let prefix = format!("{}_import_{}", step_id, param);

    if matches!(descr.kind, ImportKind::Raster | ImportKind::Vector | ImportKind::Postgis) {
        validate_name(value).map_err(|e| invalid(format!("target name: {}", e)))?;
    }

    if descr.kind == ImportKind::Postgis {
        if descr.source.is_empty() {
            return Err(invalid("empty database source".into()));
        }
        let mut inputs = vec![Param::new("input", &descr.source)];
        if let Some(layer) = &descr.basename {
            inputs.push(Param::new("layer", layer));
        }
        let import = ProcessStep::trusted_module(
            format!("{}_ogr", prefix),
            "v.in.ogr",
            inputs,
            vec![Param::new("output", value)],
        );
        return Ok(Expansion { steps: vec![import], value: value.to_string() });
    }

    let file_name = remote_file_name(&descr.source).ok_or_else(|| {
        invalid(format!("cannot derive a file name from '{}'", descr.source))
    })?;
    let local = download_dir.join(format!("{}_{}", seq, file_name));
    let local_str = local.display().to_string();

    let mut steps = vec![fetch_step(format!("{}_fetch", prefix), &descr.source, &local_str)
        .ok_or_else(|| invalid(format!("unsupported source '{}'", descr.source)))?];

    let data_path = match &descr.basename {
        None => local_str.clone(),
        Some(member) => {
            if member.is_empty() || member.starts_with('/') || member.split('/').any(|c| c == "..") {
                return Err(invalid(format!("invalid archive member '{}'", member)));
            }
            let dir = format!("{}.d", local_str);
            steps.push(ProcessStep::trusted_exec(
                format!("{}_unpack", prefix),
                "unzip",
                vec!["-o".into(), "-q".into(), local_str.clone(), member.clone(), "-d".into(), dir.clone()],
            ));
            format!("{}/{}", dir, member)
        }
    };

    match descr.kind {
        ImportKind::Raster => {
            steps.push(ProcessStep::trusted_exec(
                format!("{}_check", prefix),
                "gdalinfo",
                vec![data_path.clone()],
            ));
            steps.push(ProcessStep::trusted_module(
                format!("{}_import", prefix),
                "r.import",
                vec![Param::new("input", &data_path)],
                vec![Param::new("output", value)],
            ));
            Ok(Expansion { steps, value: value.to_string() })
        }
        ImportKind::Vector => {
            steps.push(ProcessStep::trusted_exec(
                format!("{}_check", prefix),
                "ogrinfo",
                vec!["-ro".into(), "-so".into(), "-al".into(), data_path.clone()],
            ));
            steps.push(ProcessStep::trusted_module(
                format!("{}_import", prefix),
                "v.import",
                vec![Param::new("input", &data_path)],
                vec![Param::new("output", value)],
            ));
            Ok(Expansion { steps, value: value.to_string() })
        }
        ImportKind::File => Ok(Expansion { steps, value: data_path }),
        ImportKind::Postgis => Err(invalid("unreachable database import".into())),
    }
}

/// Download command for a remote source, chosen by scheme.
fn fetch_step(id: String, source: &str, local: &str) -> Option<ProcessStep> {
    let (exe, params): (&str, Vec<String>) = if source.starts_with("https://")
        || source.starts_with("http://")
    {
        (
            "curl",
            vec![
                "--fail".into(),
                "--silent".into(),
                "--show-error".into(),
                "--location".into(),
                "--create-dirs".into(),
                "--output".into(),
                local.into(),
                source.into(),
            ],
        )
    } else if source.starts_with("s3://") {
        ("aws", vec!["s3".into(), "cp".into(), "--only-show-errors".into(), source.into(), local.into()])
    } else if source.starts_with("gs://") {
        ("gsutil", vec!["-q".into(), "cp".into(), source.into(), local.into()])
    } else {
        return None;
    };
    Some(ProcessStep::trusted_exec(id, exe, params))
}

/// Last path segment of a URL, without query or fragment.
fn remote_file_name(source: &str) -> Option<String> {
    let without_query = source.split(['?', '#']).next().unwrap_or(source);
    let (_, rest) = without_query.split_once("://")?;
    let name = rest.rsplit('/').next()?;
    if name.is_empty() || rest.split('/').count() < 2 {
        return None;
    }
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    Some(cleaned)
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
