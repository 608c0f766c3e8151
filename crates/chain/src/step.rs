// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved process steps, ready to be handed to a tool runner.

/// A `param=value` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// One invocation of an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStep {
    Module(ModuleCall),
    Exec(ExecCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCall {
    pub id: String,
    pub module: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub flags: String,
    pub overwrite: bool,
    pub verbose: bool,
    /// Set only on internally generated steps
    pub skip_permission_check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub id: String,
    pub executable: String,
    pub params: Vec<String>,
    pub skip_permission_check: bool,
}

impl ProcessStep {
    /// Internally generated module call that bypasses the allow-list.
    pub fn trusted_module(
        id: impl Into<String>,
        module: impl Into<String>,
        inputs: Vec<Param>,
        outputs: Vec<Param>,
    ) -> Self {
        ProcessStep::Module(ModuleCall {
            id: id.into(),
            module: module.into(),
            inputs,
            outputs,
            flags: String::new(),
            overwrite: true,
            verbose: false,
            skip_permission_check: true,
        })
    }

    /// Internally generated executable call that bypasses the allow-list.
    pub fn trusted_exec(id: impl Into<String>, executable: impl Into<String>, params: Vec<String>) -> Self {
        ProcessStep::Exec(ExecCall {
            id: id.into(),
            executable: executable.into(),
            params,
            skip_permission_check: true,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            ProcessStep::Module(m) => &m.id,
            ProcessStep::Exec(e) => &e.id,
        }
    }

    /// Executable name passed to the runner.
    pub fn program(&self) -> &str {
        match self {
            ProcessStep::Module(m) => &m.module,
            ProcessStep::Exec(e) => &e.executable,
        }
    }

    pub fn skip_permission_check(&self) -> bool {
        match self {
            ProcessStep::Module(m) => m.skip_permission_check,
            ProcessStep::Exec(e) => e.skip_permission_check,
        }
    }

    /// Command-line arguments, excluding the program name.
    pub fn args(&self) -> Vec<String> {
        match self {
            ProcessStep::Exec(e) => e.params.clone(),
            ProcessStep::Module(m) => {
                let mut args: Vec<String> = m
                    .inputs
                    .iter()
                    .chain(&m.outputs)
                    .map(|p| format!("{}={}", p.name, p.value))
                    .collect();
                if !m.flags.is_empty() {
                    args.push(format!("-{}", m.flags));
                }
                if m.overwrite {
                    args.push("--overwrite".to_string());
                }
                if m.verbose {
                    args.push("--verbose".to_string());
                }
                args
            }
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
