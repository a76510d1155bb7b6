//! Recursive inclusion resolver.
//!
//! Expands `@import` (markup dialect) or `require()` (module dialect)
//! directives by inlining the referenced file, then resolving the inlined text
//! against that file's own directory. Expansion is depth-first and
//! left-to-right, and it stops only when nothing resolvable is left.
//!
//! # Branch isolation
//!
//! Every directive is expanded on its own branch. A branch owns its text
//! buffer and a copy of the set of files already expanded on the path from the
//! root. The set prevents infinite recursion on self or mutual includes, and a
//! file can still be inlined from unrelated places. Sibling branches run as
//! separate tasks and their results are merged back by span, so no buffer is
//! ever shared between concurrently running branches.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::directive::{Dialect, Token, splice, tokenize_dialect};

/// What to do with a directive whose target file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFilePolicy {
  /// Remove the directive silently (markup default).
  Drop,
  /// Replace the directive with a statement that throws when executed (module default).
  DeferredError,
  /// Fail resolution.
  ImmediateError,
}

impl MissingFilePolicy {
  pub fn default_for(dialect: Dialect) -> Self {
    match dialect {
      Dialect::Markup => MissingFilePolicy::Drop,
      Dialect::Module => MissingFilePolicy::DeferredError,
    }
  }
}

/// How sibling directives are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Schedule {
  /// Each sibling branch runs in its own task.
  #[default]
  Concurrent,
  /// Siblings are expanded one after another, left to right.
  Sequential,
}

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("unresolved import '{directive}': {} not found", path.display())]
  Unresolved { directive: String, path: PathBuf },

  #[error("failed to read import {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("import resolution task failed: {0}")]
  Join(String),
}

type BranchFuture = Pin<Box<dyn Future<Output = Result<String, ResolveError>> + Send>>;

/// Resolver configuration for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResolver {
  pub dialect: Dialect,
  pub policy: MissingFilePolicy,
  pub schedule: Schedule,
}

impl ImportResolver {
  pub fn new(dialect: Dialect) -> Self {
    Self {
      dialect,
      policy: MissingFilePolicy::default_for(dialect),
      schedule: Schedule::default(),
    }
  }

  pub fn markup() -> Self {
    Self::new(Dialect::Markup)
  }

  pub fn module() -> Self {
    Self::new(Dialect::Module)
  }

  pub fn with_policy(mut self, policy: MissingFilePolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_schedule(mut self, schedule: Schedule) -> Self {
    self.schedule = schedule;
    self
  }

  /// Resolve every directive reachable from `buffer`, relative to `base_dir`.
  pub async fn resolve(&self, buffer: &str, base_dir: &Path) -> Result<String, ResolveError> {
    resolve_branch(buffer.to_string(), base_dir.to_path_buf(), HashSet::new(), *self).await
  }

  /// Resolve the contents of `path`. The file itself counts as already expanded,
  /// so a self-include is dropped instead of inlined once more.
  pub async fn resolve_file(&self, path: &Path, contents: &str) -> Result<String, ResolveError> {
    let canonical = canonical_path(path).await;
    let base_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
    let visited = HashSet::from([canonical]);
    resolve_branch(contents.to_string(), base_dir, visited, *self).await
  }
}

async fn canonical_path(path: &Path) -> PathBuf {
  match tokio::fs::canonicalize(path).await {
    Ok(p) => dunce::simplified(&p).to_path_buf(),
    Err(_) => path.to_path_buf(),
  }
}

fn resolve_branch(text: String, base_dir: PathBuf, visited: HashSet<PathBuf>, resolver: ImportResolver) -> BranchFuture {
  Box::pin(async move {
    let tokens = tokenize_dialect(&text, resolver.dialect);
    if tokens.is_empty() {
      return Ok(text);
    }

    let replacements = match resolver.schedule {
      Schedule::Concurrent => expand_concurrent(&tokens, &base_dir, &visited, resolver).await?,
      Schedule::Sequential => {
        let mut replacements = Vec::with_capacity(tokens.len());
        for token in &tokens {
          let target = base_dir.join(token.directive.path());
          let directive = token.directive.path().to_string();
          replacements.push(expand(target, directive, visited.clone(), resolver).await?);
        }
        replacements
      }
    };

    let spans: Vec<_> = tokens.into_iter().map(|t| t.span).zip(replacements).collect();
    Ok(splice(&text, &spans))
  })
}

async fn expand_concurrent(
  tokens: &[Token],
  base_dir: &Path,
  visited: &HashSet<PathBuf>,
  resolver: ImportResolver,
) -> Result<Vec<String>, ResolveError> {
  let mut join_set = JoinSet::new();

  for (index, token) in tokens.iter().enumerate() {
    let target = base_dir.join(token.directive.path());
    let directive = token.directive.path().to_string();
    let visited = visited.clone();

    join_set.spawn(async move {
      let replacement = expand(target, directive, visited, resolver).await?;
      Ok::<_, ResolveError>((index, replacement))
    });
  }

  let mut replacements = vec![String::new(); tokens.len()];
  while let Some(joined) = join_set.join_next().await {
    let (index, replacement) = joined.map_err(|e| ResolveError::Join(e.to_string()))??;
    replacements[index] = replacement;
  }
  Ok(replacements)
}

/// Produce the replacement text for one directive.
async fn expand(
  target: PathBuf,
  directive: String,
  mut visited: HashSet<PathBuf>,
  resolver: ImportResolver,
) -> Result<String, ResolveError> {
  let is_file = tokio::fs::metadata(&target).await.map(|m| m.is_file()).unwrap_or(false);
  if !is_file {
    return missing(&target, directive, resolver.policy);
  }

  let canonical = canonical_path(&target).await;
  if !visited.insert(canonical.clone()) {
    debug!(path = %canonical.display(), "import already expanded on this branch, skipping");
    return Ok(String::new());
  }

  let contents = tokio::fs::read_to_string(&target)
    .await
    .map_err(|source| ResolveError::Read {
      path: target.clone(),
      source,
    })?;
  let child_base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();

  resolve_branch(contents, child_base, visited, resolver).await
}

fn missing(target: &Path, directive: String, policy: MissingFilePolicy) -> Result<String, ResolveError> {
  match policy {
    MissingFilePolicy::Drop => {
      warn!(path = %target.display(), "import not found, dropping directive");
      Ok(String::new())
    }
    MissingFilePolicy::DeferredError => {
      warn!(path = %target.display(), "import not found, deferring error to runtime");
      Ok(deferred_throw(target))
    }
    MissingFilePolicy::ImmediateError => Err(ResolveError::Unresolved {
      directive,
      path: target.to_path_buf(),
    }),
  }
}

/// A script statement that raises `File not found: <path>` when reached.
fn deferred_throw(target: &Path) -> String {
  let message = format!("File not found: {}", target.display());
  let literal = serde_json::to_string(&message).unwrap_or_else(|_| "\"File not found\"".to_string());
  format!("(function () {{ throw new Error({}); }})();", literal)
}
