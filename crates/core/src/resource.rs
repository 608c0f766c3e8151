// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset kinds shared by import and export descriptors.

use serde::{Deserialize, Serialize};

/// Kind of dataset a process step reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Raster,
    Vector,
    /// Space-time raster dataset registered in the temporal catalog
    Strds,
    File,
}

crate::simple_display! {
    ResourceKind {
        Raster => "raster",
        Vector => "vector",
        Strds => "strds",
        File => "file",
    }
}
