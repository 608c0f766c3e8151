// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool runner seam between the job engine and external processes.

use crate::subprocess::{run_with_timeout, SubprocessError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from running a tool
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// One tool invocation inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub executable: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
}

/// Result of a tool that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Exit code; -1 when the process was ended by a signal
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub run_time: Duration,
}

/// Adapter for running external tools
#[async_trait]
pub trait ToolRunner: Clone + Send + Sync + 'static {
    /// Run a tool to completion. A non-zero exit is an `Ok` output; only
    /// spawn failures and timeouts are errors.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError>;
}

/// Runs tools as child processes.
///
/// `tool_base` (the geoprocessing installation root) contributes its `bin`
/// and `scripts` directories to `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ProcessToolRunner {
    tool_base: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ProcessToolRunner {
    pub fn new(tool_base: Option<PathBuf>, env: BTreeMap<String, String>) -> Self {
        Self { tool_base, env }
    }

    fn search_path(&self) -> Option<String> {
        let base = self.tool_base.as_ref()?;
        let mut dirs = vec![base.join("bin"), base.join("scripts")];
        if let Some(path) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        std::env::join_paths(dirs).ok().map(|p| p.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError> {
        let mut cmd = tokio::process::Command::new(&invocation.executable);
        cmd.args(&invocation.args).current_dir(&invocation.cwd).envs(&self.env);
        if let Some(base) = &self.tool_base {
            cmd.env("GISBASE", base);
        }
        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }
        cmd.envs(&invocation.env);

        tracing::info!(
            executable = %invocation.executable,
            args = ?invocation.args,
            cwd = %invocation.cwd.display(),
            "running tool"
        );
        let started = Instant::now();
        let output = run_with_timeout(cmd, invocation.timeout, &invocation.executable).await?;
        let run_time = started.elapsed();

        let return_code = output.status.code().unwrap_or(-1);
        if return_code != 0 {
            tracing::warn!(
                executable = %invocation.executable,
                return_code,
                elapsed_ms = run_time.as_millis() as u64,
                "tool exited non-zero"
            );
        }
        Ok(ToolOutput {
            return_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            run_time,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{RunnerError, ToolInvocation, ToolOutput, ToolRunner};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    type SideEffect = Arc<dyn Fn(&ToolInvocation) + Send + Sync>;

    /// Scripted behavior for one executable
    #[derive(Clone, Default)]
    pub struct FakeTool {
        pub return_code: i32,
        pub stdout: String,
        pub stderr: String,
        effect: Option<SideEffect>,
    }

    impl FakeTool {
        pub fn exit(return_code: i32) -> Self {
            Self { return_code, ..Self::default() }
        }

        pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
            self.stdout = stdout.into();
            self
        }

        pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
            self.stderr = stderr.into();
            self
        }

        /// Run `effect` on every call, e.g. to create files in the workspace.
        pub fn effect(mut self, effect: impl Fn(&ToolInvocation) + Send + Sync + 'static) -> Self {
            self.effect = Some(Arc::new(effect));
            self
        }
    }

    /// Recorded invocation
    #[derive(Debug, Clone)]
    pub struct FakeCall {
        pub executable: String,
        pub args: Vec<String>,
        pub invocation: ToolInvocation,
    }

    #[derive(Default)]
    struct FakeToolState {
        tools: HashMap<String, FakeTool>,
        calls: Vec<FakeCall>,
    }

    /// Fake tool runner for testing. Unknown executables exit 0.
    #[derive(Clone, Default)]
    pub struct FakeToolRunner {
        inner: Arc<Mutex<FakeToolState>>,
    }

    impl FakeToolRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(&self, executable: &str, tool: FakeTool) -> &Self {
            self.inner.lock().tools.insert(executable.to_string(), tool);
            self
        }

        pub fn calls(&self) -> Vec<FakeCall> {
            self.inner.lock().calls.clone()
        }

        pub fn executables(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.executable.clone()).collect()
        }
    }

    #[async_trait]
    impl ToolRunner for FakeToolRunner {
        async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError> {
            let tool = {
                let mut state = self.inner.lock();
                state.calls.push(FakeCall {
                    executable: invocation.executable.clone(),
                    args: invocation.args.clone(),
                    invocation: invocation.clone(),
                });
                state.tools.get(&invocation.executable).cloned().unwrap_or_default()
            };
            if let Some(effect) = &tool.effect {
                effect(invocation);
            }
            Ok(ToolOutput {
                return_code: tool.return_code,
                stdout: tool.stdout,
                stderr: tool.stderr,
                run_time: Duration::from_millis(1),
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCall, FakeTool, FakeToolRunner};

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
