// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{seeded_layout, snapshot, write_files, GROUP, PROJECT};
use crate::ticket::JobKind;
use mj_adapters::{FakeTool, FakeToolRunner, RunnerError, ToolInvocation, ToolOutput};
use mj_core::test_support::quota_allowing;
use mj_core::{FakeClock, UserQuota};
use mj_store::MemoryStore;
use serde_json::json;
use std::fs;
use std::path::Path;

const USER: &str = "alice";
const TARGET: &str = "M";
const DAY: Duration = Duration::from_secs(86_400);

type Store = MemoryStore<FakeClock>;

fn quota() -> UserQuota {
    let mut q = quota_allowing(&["g.region", "r.mapcalc", "r.info", "r.fail"]);
    q.accessible_datasets.insert(PROJECT.into(), ["PERMANENT", "landsat"].map(String::from).into());
    q
}

fn executor<R: ToolRunner>(root: &Path, runner: R) -> JobExecutor<Store, R, FakeClock> {
    let clock = FakeClock::new();
    let config = ExecutorConfig::new(seeded_layout(root));
    JobExecutor::new(config, MemoryStore::with_clock(clock.clone()), DAY, runner, clock)
}

fn ticket(chain: serde_json::Value) -> JobTicket {
    JobTicket::new(USER, GROUP, PROJECT, chain).quota(quota())
}

fn modules(names: &[&str]) -> serde_json::Value {
    let list: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"id": i + 1, "module": name, "inputs": {"map": "elevation@PERMANENT"}}))
        .collect();
    json!({"version": "1", "list": list})
}

/// `r.mapcalc` writes a raster named `out` into the working mapset.
fn mapcalc_runner() -> FakeToolRunner {
    let runner = FakeToolRunner::new();
    runner.on(
        "r.mapcalc",
        FakeTool::exit(0).effect(|inv| write_files(&inv.cwd, &[("cell/out", "doubled"), ("cellhd/out", "hdr")])),
    );
    runner
}

fn end_to_end_chain() -> serde_json::Value {
    json!({"version": "1", "list": [
        {"id": 1, "module": "g.region", "inputs": {"raster": "elevation@PERMANENT"}},
        {"id": 2, "module": "r.mapcalc", "inputs": {"expression": "out = elevation@PERMANENT * 2"},
         "outputs": {"out": {"export": {"type": "raster", "format": "GTiff"}}}}
    ]})
}

fn workspaces_left(executor: &JobExecutor<Store, impl ToolRunner, FakeClock>) -> usize {
    fs::read_dir(&executor.config().layout.tmp_workdir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn persistent_job_finishes_and_merges() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mapcalc_runner();
    let executor = executor(dir.path(), runner.clone());
    let ticket = ticket(end_to_end_chain()).target_mapset(TARGET);

    let accepted = executor.accept(&ticket).await.unwrap();
    assert_eq!(accepted.status, JobState::Accepted);
    assert_eq!(accepted.progress.num_of_steps, 2);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Finished, "{:?}", status.exception);
    assert_eq!(status.process_log.len(), 2);
    assert_eq!(status.progress.step, 2);
    assert_eq!(status.exports.len(), 1);
    assert_eq!(status.exports[0].name, "out");
    assert_eq!(runner.executables(), vec!["g.region", "r.mapcalc", "r.out.gdal"]);

    let target = executor.config().layout.user_mapset(GROUP, PROJECT, TARGET);
    assert_eq!(fs::read_to_string(target.join("cell/out")).unwrap(), "doubled");
    assert_eq!(workspaces_left(&executor), 0);

    let stored = executor.statuses().get(&ticket.status_key()).await.unwrap().unwrap();
    assert_eq!(stored, status);
}

#[tokio::test]
async fn locks_are_released_after_finish() {
    let dir = tempfile::tempdir().unwrap();
    let executor = executor(dir.path(), mapcalc_runner());
    let ticket = ticket(end_to_end_chain()).target_mapset(TARGET);

    executor.execute(&ticket).await;

    assert!(!executor.locks().get("grp/nc/M").await.unwrap());
}

#[tokio::test]
async fn failing_step_records_log_and_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeToolRunner::new();
    runner.on("r.fail", FakeTool::exit(1).stderr("ERROR: raster not found\n"));
    let executor = executor(dir.path(), runner.clone());
    let ticket = ticket(modules(&["g.region", "r.info", "r.fail", "r.info"])).target_mapset(TARGET);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Error);
    assert_eq!(status.process_log.len(), 3);
    assert_eq!(status.process_log[2].return_code, 1);
    let exception = status.exception.unwrap();
    assert_eq!(exception.kind, "ToolExecutionError");
    assert!(exception.message.contains("raster not found"));
    assert_eq!(runner.calls().len(), 3);
    assert!(!executor.config().layout.user_mapset(GROUP, PROJECT, TARGET).exists());
    assert!(!executor.locks().get("grp/nc/M").await.unwrap());
    assert_eq!(workspaces_left(&executor), 0);
}

/// Requests termination of `key` once `after` tool calls have completed.
#[derive(Clone)]
struct TerminateAfter {
    inner: FakeToolRunner,
    statuses: JobStatusStore<Store>,
    key: StatusKey,
    after: usize,
}

#[async_trait]
impl ToolRunner for TerminateAfter {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError> {
        let output = self.inner.run(invocation).await?;
        if self.inner.calls().len() == self.after {
            self.statuses.request_termination(&self.key).await.unwrap();
        }
        Ok(output)
    }
}

#[tokio::test]
async fn termination_between_steps_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let layout = seeded_layout(dir.path());
    let target = layout.user_mapset(GROUP, PROJECT, TARGET);
    write_files(&target, &[("WIND", "north: 5\n"), ("cell/keep", "existing")]);
    let before = snapshot(&target);

    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());
    let ticket = ticket(modules(&["r.mapcalc", "r.mapcalc", "r.mapcalc", "r.mapcalc", "r.mapcalc"]))
        .target_mapset(TARGET);
    let inner = mapcalc_runner();
    let runner = TerminateAfter {
        inner: inner.clone(),
        statuses: JobStatusStore::new(store.clone(), DAY),
        key: ticket.status_key(),
        after: 2,
    };
    let executor = JobExecutor::new(ExecutorConfig::new(layout), store, DAY, runner, clock);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Terminated);
    assert_eq!(status.process_log.len(), 2);
    assert_eq!(status.exception.unwrap().kind, "TerminationRequested");
    assert_eq!(inner.calls().len(), 2);
    assert_eq!(snapshot(&target), before);
    assert!(!executor.statuses().termination_requested(&ticket.status_key()).await.unwrap());
    assert_eq!(workspaces_left(&executor), 0);
}

#[tokio::test]
async fn held_target_lock_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeToolRunner::new();
    let executor = executor(dir.path(), runner.clone());
    assert!(executor.locks().lock("grp/nc/M", DAY).await.unwrap());
    let ticket = ticket(end_to_end_chain()).target_mapset(TARGET);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Error);
    assert_eq!(status.exception.unwrap().kind, "LockConflictError");
    assert!(runner.calls().is_empty());
    assert!(executor.locks().get("grp/nc/M").await.unwrap());
}

#[tokio::test]
async fn user_source_mapsets_are_locked_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let layout = seeded_layout(dir.path());
    write_files(&layout.user_mapset(GROUP, PROJECT, "inputs"), &[("cell/base", "base")]);
    let runner = FakeToolRunner::new();
    let executor = executor(dir.path(), runner);
    assert!(executor.locks().lock("grp/nc/inputs", DAY).await.unwrap());
    let chain = json!({"version": "1", "list": [
        {"id": 1, "module": "r.info", "inputs": {"map": "base@inputs"}}
    ]});

    let status = executor.execute(&ticket(chain)).await;

    assert_eq!(status.exception.unwrap().kind, "LockConflictError");
}

#[tokio::test]
async fn disallowed_module_is_rejected_at_accept() {
    let dir = tempfile::tempdir().unwrap();
    let executor = executor(dir.path(), FakeToolRunner::new());
    let ticket = ticket(modules(&["r.info", "r.out.gdal"]));

    let err = executor.accept(&ticket).await.unwrap_err();

    assert_eq!(err.kind(), "ValidationError");
    assert_eq!(workspaces_left(&executor), 0);
    assert!(executor.statuses().get(&ticket.status_key()).await.unwrap().is_none());
}

#[tokio::test]
async fn ephemeral_job_does_not_merge() {
    let dir = tempfile::tempdir().unwrap();
    let executor = executor(dir.path(), mapcalc_runner());
    let ticket = ticket(end_to_end_chain());
    assert_eq!(ticket.kind(), JobKind::Ephemeral);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Finished);
    assert!(executor.config().layout.user_mapsets(GROUP, PROJECT).unwrap().is_empty());
    assert_eq!(workspaces_left(&executor), 0);
}

/// Never returns within the test's time limit.
#[derive(Clone)]
struct Stalled;

#[async_trait]
impl ToolRunner for Stalled {
    async fn run(&self, _invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ToolOutput { return_code: 0, stdout: String::new(), stderr: String::new(), run_time: Duration::ZERO })
    }
}

#[tokio::test]
async fn job_timeout_ends_in_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(dir.path(), Stalled);
    executor.config.timeout_multiplier = 1;
    let mut quota = quota();
    quota.process_time_limit = 1;
    quota.process_num_limit = 1;
    let ticket = ticket(modules(&["r.info"])).quota(quota).target_mapset(TARGET);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Error);
    assert_eq!(status.exception.unwrap().kind, "TimeoutError");
    assert!(!executor.locks().get("grp/nc/M").await.unwrap());
    assert_eq!(workspaces_left(&executor), 0);
}

#[tokio::test]
async fn terminal_job_is_not_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mapcalc_runner();
    let executor = executor(dir.path(), runner.clone());
    let ticket = ticket(end_to_end_chain());

    let first = executor.execute(&ticket).await;
    let calls = runner.calls().len();
    let second = executor.execute(&ticket).await;

    assert_eq!(first, second);
    assert_eq!(runner.calls().len(), calls);
}

#[tokio::test]
async fn termination_before_start_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeToolRunner::new();
    let executor = executor(dir.path(), runner.clone());
    let ticket = ticket(modules(&["r.info"]));
    executor.accept(&ticket).await.unwrap();
    executor.statuses().request_termination(&ticket.status_key()).await.unwrap();

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Terminated);
    assert!(status.process_log.is_empty());
    assert!(runner.calls().is_empty());
}

fn two_export_chain() -> serde_json::Value {
    json!({"version": "1", "list": [
        {"id": 1, "module": "r.mapcalc", "inputs": {"expression": "out = elevation@PERMANENT * 2"},
         "outputs": {
            "out": {"export": {"type": "raster", "format": "GTiff"}},
            "slope": {"export": {"type": "raster", "format": "GTiff"}}
         }}
    ]})
}

/// Advances the clock on every export tool call.
#[derive(Clone)]
struct SlowExports {
    inner: FakeToolRunner,
    clock: FakeClock,
    each: Duration,
}

#[async_trait]
impl ToolRunner for SlowExports {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError> {
        if invocation.executable == "r.out.gdal" {
            self.clock.advance(self.each);
        }
        self.inner.run(invocation).await
    }
}

#[tokio::test]
async fn exports_keep_locks_alive_past_their_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let runner = SlowExports { inner: mapcalc_runner(), clock: clock.clone(), each: Duration::from_secs(200) };
    let store = MemoryStore::with_clock(clock.clone());
    let executor = JobExecutor::new(ExecutorConfig::new(seeded_layout(dir.path())), store, DAY, runner, clock);
    let mut quota = quota();
    quota.process_time_limit = 300;
    quota.process_num_limit = 1;
    let ticket = ticket(two_export_chain()).quota(quota).target_mapset(TARGET);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Finished, "{:?}", status.exception);
    assert_eq!(status.exports.len(), 2);
    let target = executor.config().layout.user_mapset(GROUP, PROJECT, TARGET);
    assert_eq!(fs::read_to_string(target.join("cell/out")).unwrap(), "doubled");
    assert!(!executor.locks().get("grp/nc/M").await.unwrap());
}

/// Stalls on export tool calls only.
#[derive(Clone)]
struct StalledExports(FakeToolRunner);

#[async_trait]
impl ToolRunner for StalledExports {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, RunnerError> {
        if invocation.executable == "r.out.gdal" {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.0.run(invocation).await
    }
}

#[tokio::test]
async fn timeout_during_exports_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(dir.path(), StalledExports(mapcalc_runner()));
    executor.config.timeout_multiplier = 1;
    let mut quota = quota();
    quota.process_time_limit = 1;
    quota.process_num_limit = 1;
    let ticket = ticket(end_to_end_chain()).quota(quota).target_mapset(TARGET);

    let status = executor.execute(&ticket).await;

    assert_eq!(status.status, JobState::Error);
    assert_eq!(status.exception.unwrap().kind, "TimeoutError");
    assert!(!executor.config().layout.user_mapset(GROUP, PROJECT, TARGET).exists());
    let storage = executor.config().layout.storage_dir(USER, &ticket.resource_id);
    assert_eq!(fs::read_dir(&storage).map(|d| d.count()).unwrap_or(0), 0);
    assert!(!executor.locks().get("grp/nc/M").await.unwrap());
    assert_eq!(workspaces_left(&executor), 0);
}

/// A fifo in the working mapset blocks the merge's copy until a writer
/// opens it, holding the merge past the job timeout.
#[cfg(unix)]
#[tokio::test]
async fn started_merge_is_awaited_under_lock_past_the_job_timeout() {
    use std::sync::{Arc, Mutex};

    let dir = tempfile::tempdir().unwrap();
    let fifo: Arc<Mutex<Option<std::path::PathBuf>>> = Arc::default();
    let runner = FakeToolRunner::new();
    let made = fifo.clone();
    runner.on(
        "r.mapcalc",
        FakeTool::exit(0).effect(move |inv| {
            write_files(&inv.cwd, &[("cell/out", "doubled"), ("cellhd/out", "hdr")]);
            let path = inv.cwd.join("zz_slow");
            let created = std::process::Command::new("mkfifo").arg(&path).status().unwrap();
            assert!(created.success());
            *made.lock().unwrap() = Some(path);
        }),
    );
    let mut executor = executor(dir.path(), runner);
    executor.config.timeout_multiplier = 1;
    let mut quota = quota();
    quota.process_time_limit = 1;
    quota.process_num_limit = 1;
    let ticket = ticket(modules(&["r.mapcalc"])).quota(quota).target_mapset(TARGET);

    let job = tokio::spawn({
        let (executor, ticket) = (executor.clone(), ticket.clone());
        async move { executor.execute(&ticket).await }
    });
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!job.is_finished());
    assert!(executor.locks().get("grp/nc/M").await.unwrap());

    let path = fifo.lock().unwrap().clone().unwrap();
    tokio::task::spawn_blocking(move || drop(fs::OpenOptions::new().write(true).open(path).unwrap()))
        .await
        .unwrap();
    let status = job.await.unwrap();

    // The fifo is not a regular file, so the copy fails once unblocked
    assert_eq!(status.status, JobState::Error);
    assert_eq!(status.exception.unwrap().kind, "MergeIntegrityError");
    assert!(!executor.config().layout.user_mapset(GROUP, PROJECT, TARGET).exists());
    assert!(!executor.locks().get("grp/nc/M").await.unwrap());
    assert_eq!(workspaces_left(&executor), 0);
}
