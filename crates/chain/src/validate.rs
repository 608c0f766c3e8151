// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process chain validation.
//!
//! Validation never executes anything. It checks structure and permissions,
//! expands import descriptors into internal steps, and registers exports.

use crate::chain::{ProcessChain, StepCall};
use crate::error::ValidationError;
use crate::export::ResourceExport;
use crate::import;
use crate::step::{ExecCall, ModuleCall, Param, ProcessStep};
use mj_core::{DatasetRef, ResourceKind, UserQuota, PERMANENT};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

/// `name@mapset` references inside input values and expressions.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static MAPSET_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_.\-]+@[A-Za-z0-9_\-][A-Za-z0-9_.\-]*")
        .expect("constant regex pattern is valid")
});

/// Per-job facts the validator needs besides the chain itself.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub project: String,
    /// Mapsets of `project` that exist in the user's group database
    pub user_mapsets: BTreeSet<String>,
    pub target_mapset: Option<String>,
    /// Where import fetch steps place downloaded files
    pub download_dir: PathBuf,
    /// Where steps write outputs that are exported as plain files
    pub file_dir: PathBuf,
}

/// A chain that passed validation, with imports expanded.
#[derive(Debug, Clone)]
pub struct ValidatedChain {
    pub version: String,
    pub steps: Vec<ProcessStep>,
    pub exports: Vec<ResourceExport>,
    /// Source mapsets to link into the workspace; always holds `PERMANENT`
    pub required_mapsets: BTreeSet<String>,
}

/// Validates chains against one principal's quota.
#[derive(Debug, Clone)]
pub struct Validator {
    quota: UserQuota,
}

impl Validator {
    pub fn new(quota: UserQuota) -> Self {
        Self { quota }
    }

    pub fn quota(&self) -> &UserQuota {
        &self.quota
    }

    pub fn validate(
        &self,
        chain: &ProcessChain,
        ctx: &ValidationContext,
    ) -> Result<ValidatedChain, ValidationError> {
        if chain.steps.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        let mut seen = HashSet::new();
        for step in &chain.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(ValidationError::DuplicateId(step.id.clone()));
            }
        }

        let mut steps = Vec::new();
        let mut exports = Vec::new();
        let mut required_mapsets = BTreeSet::from([PERMANENT.to_string()]);
        let mut import_seq = 0;

        for step in &chain.steps {
            let program = step.call.program();
            if !self.quota.may_run(program) {
                return Err(ValidationError::ModuleNotAllowed {
                    step: step.id.clone(),
                    module: program.to_string(),
                });
            }

            match &step.call {
                StepCall::Exec { exe, params } => {
                    steps.push(ProcessStep::Exec(ExecCall {
                        id: step.id.clone(),
                        executable: exe.clone(),
                        params: params.clone(),
                        skip_permission_check: false,
                    }));
                }
                StepCall::Module { module, inputs, outputs, flags, overwrite, verbose } => {
                    let mut resolved_inputs = Vec::with_capacity(inputs.len());
                    for input in inputs {
                        let value = match &input.import {
                            Some(descr) => {
                                import_seq += 1;
                                let expansion = import::expand(
                                    &step.id,
                                    &input.param,
                                    &input.value,
                                    descr,
                                    &ctx.download_dir,
                                    import_seq,
                                )?;
                                steps.extend(expansion.steps);
                                expansion.value
                            }
                            None => {
                                for mapset in referenced_mapsets(&input.value) {
                                    self.check_mapset(&step.id, mapset, ctx)?;
                                    required_mapsets.insert(mapset.to_string());
                                }
                                input.value.clone()
                            }
                        };
                        resolved_inputs.push(Param::new(&input.param, value));
                    }

                    let mut resolved_outputs = Vec::with_capacity(outputs.len());
                    for output in outputs {
                        let mut value = output.value.clone();
                        if let Some(descr) = &output.export {
                            exports.push(descr.resolve(&step.id, &output.value)?);
                            if descr.kind == ResourceKind::File {
                                value = ctx.file_dir.join(&output.value).display().to_string();
                            }
                        }
                        resolved_outputs.push(Param::new(&output.param, value));
                    }

                    steps.push(ProcessStep::Module(ModuleCall {
                        id: step.id.clone(),
                        module: module.clone(),
                        inputs: resolved_inputs,
                        outputs: resolved_outputs,
                        flags: flags.clone(),
                        overwrite: *overwrite,
                        verbose: *verbose,
                        skip_permission_check: false,
                    }));
                }
            }
        }

        if steps.len() as u64 > self.quota.process_num_limit {
            return Err(ValidationError::TooManySteps {
                count: steps.len(),
                limit: self.quota.process_num_limit,
            });
        }

        tracing::debug!(
            steps = steps.len(),
            exports = exports.len(),
            mapsets = ?required_mapsets,
            "process chain validated"
        );

        Ok(ValidatedChain { version: chain.version.clone(), steps, exports, required_mapsets })
    }

    fn check_mapset(
        &self,
        step: &str,
        mapset: &str,
        ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        let own = ctx.user_mapsets.contains(mapset) || ctx.target_mapset.as_deref() == Some(mapset);
        if own || self.quota.may_read(&ctx.project, mapset) {
            Ok(())
        } else {
            Err(ValidationError::DatasetNotAllowed {
                step: step.to_string(),
                project: ctx.project.clone(),
                mapset: mapset.to_string(),
            })
        }
    }
}

/// Mapset names referenced as `name@mapset` in a value.
fn referenced_mapsets(value: &str) -> impl Iterator<Item = &str> {
    MAPSET_REF.find_iter(value).filter_map(|m| DatasetRef::parse(m.as_str()).mapset)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
