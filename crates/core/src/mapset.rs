// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project/mapset addressing.
//!
//! Datasets are referenced as `name@mapset`. Writable mapsets live in a
//! per-group database and are locked by `group/project/mapset`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The mapset every project carries; always linked into a workspace.
pub const PERMANENT: &str = "PERMANENT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("empty name")]
    Empty,
    #[error("invalid character {ch:?} in name {name:?}")]
    InvalidChar { name: String, ch: char },
    #[error("expected group/project/mapset, got {0:?}")]
    MalformedLockId(String),
}

/// Check a project or mapset name.
///
/// Names become directory names, so separators, `@` and leading dots are
/// rejected.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(NameError::InvalidChar { name: name.to_string(), ch });
    }
    if name.starts_with('.') {
        return Err(NameError::InvalidChar { name: name.to_string(), ch: '.' });
    }
    Ok(())
}

/// A dataset name with an optional mapset qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef<'a> {
    pub name: &'a str,
    pub mapset: Option<&'a str>,
}

impl<'a> DatasetRef<'a> {
    /// Split `name@mapset`; values without `@` are unqualified.
    pub fn parse(value: &'a str) -> Self {
        match value.rsplit_once('@') {
            Some((name, mapset)) if !name.is_empty() && !mapset.is_empty() => {
                Self { name, mapset: Some(mapset) }
            }
            _ => Self { name: value, mapset: None },
        }
    }
}

/// Identity of a lockable, writable mapset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapsetLockId {
    pub group: String,
    pub project: String,
    pub mapset: String,
}

impl MapsetLockId {
    pub fn new(
        group: impl Into<String>,
        project: impl Into<String>,
        mapset: impl Into<String>,
    ) -> Self {
        Self { group: group.into(), project: project.into(), mapset: mapset.into() }
    }
}

impl fmt::Display for MapsetLockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.project, self.mapset)
    }
}

impl FromStr for MapsetLockId {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let [group, project, mapset] = parts.as_slice() else {
            return Err(NameError::MalformedLockId(s.to_string()));
        };
        for part in [group, project, mapset] {
            validate_name(part)?;
        }
        Ok(Self::new(*group, *project, *mapset))
    }
}

#[cfg(test)]
#[path = "mapset_tests.rs"]
mod tests;
