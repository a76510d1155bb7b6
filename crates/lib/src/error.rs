//! Top-level build error.
//!
//! Each pipeline stage has its own error type; `BuildError` unifies them so a
//! caller receives a single rejection with a human-readable reason.

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::package::PackageError;
use crate::resolve::ResolveError;
use crate::toolchain::ToolError;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error(transparent)]
  Package(#[from] PackageError),

  /// A build task's declared source does not exist.
  #[error("build task source not found: {}", path.display())]
  TaskSourceMissing { path: PathBuf },

  #[error("io error on {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  /// A spawned compilation or task was cancelled or panicked.
  #[error("build task aborted: {0}")]
  TaskPanicked(String),
}

impl BuildError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    BuildError::Io {
      path: path.into(),
      source,
    }
  }
}
