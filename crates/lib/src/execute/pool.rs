//! Fixed-size worker pool over a shared target queue.
//!
//! Every job is queued up front on a bounded channel which is then closed.
//! Workers pull jobs until the queue is empty and push exactly one result per
//! job onto the results channel. Once all workers have exited, the results are
//! drained; any job without a result (a worker panicked) is reported as failed.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::artifact::{PostProcessOptions, ProcessedArtifact, post_process};
use crate::config::BuildConfig;
use crate::platform::Target;
use crate::resolve::resolve;
use crate::toolchain::{Toolchain, command_line};

use super::types::{BuildEvent, BuildResult, SharedObserver};

/// One target waiting to be built.
#[derive(Debug, Clone)]
pub(crate) struct Job {
  pub index: usize,
  pub target: Target,
  pub output_name: String,
}

/// Read-only state shared by every worker.
pub(crate) struct WorkerContext<T> {
  pub toolchain: Arc<T>,
  pub config: BuildConfig,
  pub work_dir: PathBuf,
  pub version_dir: PathBuf,
  pub post: PostProcessOptions,
  pub observer: SharedObserver,
  pub stop_on_error: bool,
  /// Run-wide cancellation, threaded into every toolchain invocation.
  pub cancel: CancellationToken,
  /// Child of `cancel`; once tripped no new job is started.
  pub halt: CancellationToken,
}

type JobQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Build every job with `workers` workers and return one result per job.
pub(crate) async fn dispatch<T: Toolchain>(
  ctx: Arc<WorkerContext<T>>,
  jobs: Vec<Job>,
  workers: usize,
) -> Vec<BuildResult> {
  let (job_tx, job_rx) = mpsc::channel(jobs.len().max(1));
  for job in &jobs {
    if job_tx.try_send(job.clone()).is_err() {
      // capacity equals the job count and the receiver is alive
      error!(platform = %job.target, "failed to queue target");
    }
  }
  drop(job_tx);

  let queue: JobQueue = Arc::new(Mutex::new(job_rx));
  let (result_tx, mut result_rx) = mpsc::channel(jobs.len().max(1));

  let mut join_set = JoinSet::new();
  for worker in 1..=workers.max(1) {
    let ctx = ctx.clone();
    let queue = queue.clone();
    let result_tx = result_tx.clone();
    join_set.spawn(run_worker(worker, ctx, queue, result_tx));
  }
  drop(result_tx);

  while let Some(joined) = join_set.join_next().await {
    if let Err(e) = joined {
      error!(error = %e, "build worker panicked");
    }
  }

  let mut reported = HashSet::with_capacity(jobs.len());
  let mut results = Vec::with_capacity(jobs.len());
  while let Some((index, result)) = result_rx.recv().await {
    if reported.insert(index) {
      results.push(result);
    } else {
      warn!(index, "duplicate result for target ignored");
    }
  }

  for job in jobs.into_iter().filter(|job| !reported.contains(&job.index)) {
    warn!(platform = %job.target, "no result reported for target");
    let result = BuildResult::failed(job.target, job.output_name, "worker exited without reporting a result");
    ctx.observer.notify(&BuildEvent::TargetFinished {
      worker: 0,
      result: result.clone(),
    });
    results.push(result);
  }
  results
}

async fn run_worker<T: Toolchain>(
  worker: usize,
  ctx: Arc<WorkerContext<T>>,
  queue: JobQueue,
  results: mpsc::Sender<(usize, BuildResult)>,
) {
  debug!(worker, "worker started");
  loop {
    let job = {
      let mut queue = queue.lock().await;
      queue.recv().await
    };
    let Some(job) = job else { break };
    let index = job.index;

    let result = if ctx.halt.is_cancelled() {
      debug!(worker, platform = %job.target, "run halted, skipping target");
      BuildResult::skipped(job.target, job.output_name)
    } else {
      build_target(worker, &ctx, job).await
    };

    if ctx.stop_on_error && !result.is_success() && !ctx.halt.is_cancelled() {
      info!(worker, platform = %result.target, "stopping after first failure");
      ctx.halt.cancel();
    }

    ctx.observer.notify(&BuildEvent::TargetFinished {
      worker,
      result: result.clone(),
    });
    if results.send((index, result)).await.is_err() {
      error!(worker, "result channel closed");
      break;
    }
  }
  debug!(worker, "worker finished");
}

/// Resolve, compile and post-process one target.
async fn build_target<T: Toolchain>(worker: usize, ctx: &WorkerContext<T>, job: Job) -> BuildResult {
  let Job { target, output_name, .. } = job;
  let plan = resolve(&target, &ctx.config);
  let output = ctx.version_dir.join(&output_name);

  ctx.observer.notify(&BuildEvent::TargetStarted {
    worker,
    target: target.clone(),
    output: output.clone(),
    command: command_line(ctx.toolchain.program(), &plan, &output),
  });
  debug!(worker, platform = %target, env = %plan.env_display(), "building target");

  if let Err(e) = ctx
    .toolchain
    .invoke(&ctx.cancel, &ctx.work_dir, &target, &output, &plan)
    .await
  {
    warn!(worker, platform = %target, cancelled = e.is_cancelled(), "target failed");
    return BuildResult::failed(target, output_name, e.to_string());
  }

  let post = ctx.post;
  let built = output.clone();
  let artifact = match tokio::task::spawn_blocking(move || post_process(&built, &post)).await {
    Ok(artifact) => artifact,
    Err(e) => {
      warn!(worker, platform = %target, error = %e, "post-processing aborted");
      ProcessedArtifact {
        path: output,
        file_name: output_name,
        size: None,
        digests: None,
      }
    }
  };

  info!(worker, platform = %target, artifact = %artifact.file_name, "target built");
  BuildResult::succeeded(target, artifact)
}

#[cfg(test)]
mod tests {
  use std::path::Path;
  use std::sync::Mutex as StdMutex;
  use std::time::Duration;

  use super::*;
  use crate::execute::types::{BuildObserver, BuildStatus, NoopObserver};
  use crate::util::testutil::FakeToolchain;
  use tempfile::tempdir;

  #[derive(Default)]
  struct Recorder {
    started: StdMutex<Vec<usize>>,
  }

  impl BuildObserver for Recorder {
    fn notify(&self, event: &BuildEvent) {
      if let BuildEvent::TargetStarted { worker, .. } = event {
        self.started.lock().unwrap().push(*worker);
      }
    }
  }

  fn jobs(targets: &[Target]) -> Vec<Job> {
    targets
      .iter()
      .enumerate()
      .map(|(index, target)| Job {
        index,
        target: target.clone(),
        output_name: target.output_name("app"),
      })
      .collect()
  }

  fn context(
    toolchain: FakeToolchain,
    dir: &Path,
    observer: SharedObserver,
    stop_on_error: bool,
  ) -> Arc<WorkerContext<FakeToolchain>> {
    let cancel = CancellationToken::new();
    Arc::new(WorkerContext {
      toolchain: Arc::new(toolchain),
      config: BuildConfig::default(),
      work_dir: dir.to_path_buf(),
      version_dir: dir.to_path_buf(),
      post: PostProcessOptions {
        compression: None,
        checksums: true,
      },
      observer,
      stop_on_error,
      halt: cancel.child_token(),
      cancel,
    })
  }

  #[tokio::test]
  async fn one_result_per_target_for_any_pool_size() {
    let matrix = crate::platform::default_matrix();
    for workers in [1, 3, 16] {
      let temp = tempdir().unwrap();
      let ctx = context(
        FakeToolchain::new(vec!["riscv64"]),
        temp.path(),
        Arc::new(NoopObserver),
        false,
      );

      let results = dispatch(ctx.clone(), jobs(&matrix), workers).await;

      assert_eq!(results.len(), matrix.len(), "workers = {workers}");
      for target in &matrix {
        assert_eq!(results.iter().filter(|r| &r.target == target).count(), 1);
      }
      let ok = results.iter().filter(|r| r.is_success()).count();
      let failed = results.iter().filter(|r| r.status == BuildStatus::Failed).count();
      assert_eq!(failed, 3);
      assert_eq!(ok + failed, matrix.len());
      assert_eq!(ctx.toolchain.call_count(), matrix.len());
    }
  }

  #[tokio::test]
  async fn successful_rows_carry_size_and_digest() {
    let temp = tempdir().unwrap();
    let target = Target::new("darwin", "arm64");
    let ctx = context(FakeToolchain::new(vec![]), temp.path(), Arc::new(NoopObserver), false);

    let results = dispatch(ctx, jobs(std::slice::from_ref(&target)), 1).await;

    let row = &results[0];
    assert!(row.is_success());
    assert_eq!(row.file_name, "app-arm64-darwin");
    assert_eq!(row.size, Some("darwin/arm64".len() as u64));
    assert_eq!(row.sha256.as_ref().map(String::len), Some(64));
    assert!(temp.path().join("app-arm64-darwin.hash").exists());
  }

  #[tokio::test]
  async fn failure_text_includes_captured_output() {
    let temp = tempdir().unwrap();
    let ctx = context(FakeToolchain::new(vec!["amd64"]), temp.path(), Arc::new(NoopObserver), false);

    let results = dispatch(ctx, jobs(&[Target::new("linux", "amd64")]), 1).await;

    let error = results[0].error.as_deref().unwrap();
    assert!(error.contains("linux/amd64"));
    assert!(error.contains("undefined: foo"));
    assert_eq!(results[0].size_display(), "n/a");
  }

  #[tokio::test]
  async fn stop_on_error_skips_unstarted_targets() {
    let temp = tempdir().unwrap();
    let matrix = vec![
      Target::new("linux", "riscv64"),
      Target::new("linux", "amd64"),
      Target::new("linux", "arm64"),
      Target::new("darwin", "arm64"),
    ];
    let ctx = context(FakeToolchain::new(vec!["riscv64"]), temp.path(), Arc::new(NoopObserver), true);

    let results = dispatch(ctx.clone(), jobs(&matrix), 1).await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].status, BuildStatus::Failed);
    assert!(results[1..].iter().all(|r| r.status == BuildStatus::Skipped));
    assert_eq!(ctx.toolchain.call_count(), 1);
  }

  #[tokio::test]
  async fn cancelled_run_reports_every_target() {
    let temp = tempdir().unwrap();
    let matrix = crate::platform::default_matrix();
    let ctx = context(FakeToolchain::new(vec![]), temp.path(), Arc::new(NoopObserver), false);
    ctx.cancel.cancel();

    let results = dispatch(ctx.clone(), jobs(&matrix), 4).await;

    assert_eq!(results.len(), matrix.len());
    assert!(results.iter().all(|r| r.status == BuildStatus::Skipped));
    assert_eq!(ctx.toolchain.call_count(), 0);
  }

  #[tokio::test]
  async fn workers_share_the_queue() {
    let temp = tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let toolchain = FakeToolchain::new(vec![]).with_delay(Duration::from_millis(50));
    let ctx = context(toolchain, temp.path(), recorder.clone(), false);

    let matrix = crate::platform::default_matrix();
    dispatch(ctx, jobs(&matrix[..6]), 3).await;

    let started = recorder.started.lock().unwrap();
    assert_eq!(started.len(), 6);
    assert!(started.iter().all(|w| (1..=3).contains(w)));
    let mut distinct = started.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert!(distinct.len() > 1);
  }
}
