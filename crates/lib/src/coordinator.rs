//! Running one build worker per target and aggregating the results.
//!
//! Every worker produces exactly one [`BuildResult`]; the coordinator is the
//! single consumer of those results, so the failure count is derived from the
//! collected results rather than from a counter shared between workers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::distro::BuildResult;
use crate::execute::NO_EXIT_CODE;
use crate::toolchain::BuildTarget;

/// How the workers are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
  /// All workers start before any is awaited; every worker runs to completion.
  Parallel,
  /// One worker at a time in target order; stops launching after the first failure.
  Sequential,
}

impl Schedule {
  pub fn from_parallel(parallel: bool) -> Self {
    if parallel { Self::Parallel } else { Self::Sequential }
  }
}

/// Results of a coordinated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
  /// One result per attempted target, in target order.
  pub results: Vec<BuildResult>,
  /// Targets never launched because an earlier sequential worker failed.
  pub unattempted: Vec<BuildTarget>,
}

impl RunSummary {
  pub fn error_count(&self) -> usize {
    self.results.iter().filter(|r| !r.is_success()).count()
  }

  pub fn is_success(&self) -> bool {
    self.error_count() == 0 && self.unattempted.is_empty()
  }

  pub fn result_for(&self, target: &BuildTarget) -> Option<&BuildResult> {
    self.results.iter().find(|r| &r.target == target)
  }
}

/// Run `worker` for every target under `schedule`.
///
/// A worker that panics counts as a failed target.
pub async fn run<W, Fut>(targets: &[BuildTarget], schedule: Schedule, worker: W) -> RunSummary
where
  W: Fn(BuildTarget) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = BuildResult> + Send + 'static,
{
  let worker = Arc::new(worker);
  info!(targets = targets.len(), ?schedule, "starting builds");

  let summary = match schedule {
    Schedule::Parallel => run_parallel(targets, worker).await,
    Schedule::Sequential => run_sequential(targets, worker).await,
  };

  info!(
    attempted = summary.results.len(),
    failed = summary.error_count(),
    unattempted = summary.unattempted.len(),
    "builds finished"
  );
  summary
}

async fn run_parallel<W, Fut>(targets: &[BuildTarget], worker: Arc<W>) -> RunSummary
where
  W: Fn(BuildTarget) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = BuildResult> + Send + 'static,
{
  let mut join_set = JoinSet::new();
  let mut launched = HashMap::new();

  for (index, target) in targets.iter().copied().enumerate() {
    let worker = Arc::clone(&worker);
    let handle = join_set.spawn(async move { worker(target).await });
    launched.insert(handle.id(), (index, target));
  }

  let mut collected: Vec<(usize, BuildResult)> = Vec::with_capacity(targets.len());
  while let Some(joined) = join_set.join_next_with_id().await {
    match joined {
      Ok((id, result)) => {
        let index = launched.get(&id).map(|(i, _)| *i).unwrap_or(usize::MAX);
        report(&result);
        collected.push((index, result));
      }
      Err(e) => {
        let Some((index, target)) = launched.get(&e.id()).copied() else {
          error!(error = %e, "unknown build worker failed");
          continue;
        };
        error!(build = %target, error = %e, "build worker panicked");
        collected.push((index, BuildResult::failed(target, NO_EXIT_CODE)));
      }
    }
  }

  collected.sort_by_key(|(index, _)| *index);
  RunSummary {
    results: collected.into_iter().map(|(_, result)| result).collect(),
    unattempted: Vec::new(),
  }
}

async fn run_sequential<W, Fut>(targets: &[BuildTarget], worker: Arc<W>) -> RunSummary
where
  W: Fn(BuildTarget) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = BuildResult> + Send + 'static,
{
  let mut results = Vec::with_capacity(targets.len());

  for (index, target) in targets.iter().copied().enumerate() {
    let task = tokio::spawn((worker)(target));
    let result = match task.await {
      Ok(result) => result,
      Err(e) => {
        error!(build = %target, error = %e, "build worker panicked");
        BuildResult::failed(target, NO_EXIT_CODE)
      }
    };
    report(&result);

    let failed = !result.is_success();
    results.push(result);
    if failed {
      let unattempted: Vec<BuildTarget> = targets[index + 1..].to_vec();
      if !unattempted.is_empty() {
        warn!(skipped = unattempted.len(), "stopping after first failure");
      }
      return RunSummary { results, unattempted };
    }
  }

  RunSummary {
    results,
    unattempted: Vec::new(),
  }
}

fn report(result: &BuildResult) {
  if result.is_success() {
    info!(build = %result.target, "build succeeded");
  } else {
    warn!(build = %result.target, code = result.exit_code, "build failed");
  }
}
