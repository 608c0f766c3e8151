// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mj-chain: process chain model, import expansion, and validation

mod chain;
mod error;
mod export;
mod import;
mod step;
mod validate;

pub use chain::{InputDef, OutputDef, ProcessChain, StepCall, StepDef};
pub use error::ValidationError;
pub use export::{ExportDescr, ExportTarget, ResourceExport, DATABASE_FORMAT};
pub use import::{ImportDescr, ImportKind};
pub use step::{ExecCall, ModuleCall, Param, ProcessStep};
pub use validate::{ValidatedChain, ValidationContext, Validator};
