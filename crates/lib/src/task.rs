//! Build task runner.
//!
//! `Build/task` entries bundle an auxiliary script (a worker, say) and write it
//! back into the source tree before sections are compiled, so a section may
//! reference the generated file.

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::BuildError;
use crate::manifest::{BuildTask, Manifest, ScopeContext, TaskAction};
use crate::resolve::ImportResolver;
use crate::rewrite::rewrite_tilde_paths;
use crate::toolchain::{BundleOptions, Toolchain};

/// Tasks that will run for this build, in manifest order.
///
/// Skipped tasks only run when `uglify` forces processing.
pub fn runnable_tasks(tasks: &[BuildTask], uglify: bool) -> Vec<BuildTask> {
  tasks
    .iter()
    .filter(|task| uglify || task.action != TaskAction::Skip)
    .cloned()
    .collect()
}

/// Run one task, returning the written destination.
async fn run_task(
  task: BuildTask,
  source_root: PathBuf,
  scope: ScopeContext,
  toolchain: Toolchain,
) -> Result<PathBuf, BuildError> {
  let source = source_root.join(&task.source);
  if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
    return Err(BuildError::TaskSourceMissing { path: source });
  }

  let bundled = toolchain.bundle(&source, BundleOptions { treeshake: false }).await?;
  let code = ImportResolver::module().resolve_file(&source, &bundled).await?;
  let code = rewrite_tilde_paths(&code, &scope);
  let code = match task.action {
    TaskAction::Minify => toolchain.minify(&code).await?,
    TaskAction::None | TaskAction::Skip => code,
  };

  let destination = source_root.join(&task.destination);
  if let Some(parent) = destination.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .map_err(|e| BuildError::io(parent, e))?;
  }
  tokio::fs::write(&destination, code)
    .await
    .map_err(|e| BuildError::io(&destination, e))?;

  debug!(
    source = %source.display(),
    destination = %destination.display(),
    action = ?task.action,
    "task complete"
  );
  Ok(destination)
}

/// Run the manifest's build tasks concurrently.
///
/// The first failing task fails the whole run; tasks still in flight are
/// aborted when the set is dropped.
pub async fn run_tasks(
  manifest: &Manifest,
  source_root: &Path,
  scope: &ScopeContext,
  uglify: bool,
  toolchain: &Toolchain,
) -> Result<Vec<PathBuf>, BuildError> {
  let tasks = runnable_tasks(manifest.tasks(), uglify);
  if tasks.is_empty() {
    return Ok(Vec::new());
  }
  info!(count = tasks.len(), "running build tasks");

  let mut join_set = JoinSet::new();
  for task in tasks {
    join_set.spawn(run_task(
      task,
      source_root.to_path_buf(),
      scope.clone(),
      toolchain.clone(),
    ));
  }

  let mut written = Vec::new();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(Ok(path)) => written.push(path),
      Ok(Err(e)) => return Err(e),
      Err(e) => {
        error!(error = %e, "build task panicked");
        return Err(BuildError::TaskPanicked(e.to_string()));
      }
    }
  }
  written.sort();
  Ok(written)
}
