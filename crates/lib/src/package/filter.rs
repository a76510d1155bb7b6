//! Public asset selection.
//!
//! Selection is split from copying: [`scan_tree`] lists what is on disk,
//! [`filter_tree`] decides (purely) what ships, and [`copy_tree`] copies
//! exactly the entries it is handed.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::PackageError;
use crate::consts::{DEFAULT_EXCLUDED_EXTENSIONS, MAX_ASSET_SIZE};

/// A regular file under the public tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
  /// Path relative to the tree root.
  pub relative: PathBuf,
  pub size: u64,
}

impl AssetEntry {
  fn extension(&self) -> Option<String> {
    self
      .relative
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase)
  }
}

/// Which assets ship with the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
  /// Extensions always kept, overriding both exclusion rules.
  pub include: Vec<String>,
  pub exclude: Vec<String>,
  pub max_size: u64,
}

impl Default for FilterPolicy {
  fn default() -> Self {
    Self {
      include: Vec::new(),
      exclude: DEFAULT_EXCLUDED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
      max_size: MAX_ASSET_SIZE,
    }
  }
}

impl FilterPolicy {
  /// Default policy plus the manifest's `build@include` extensions.
  pub fn with_includes(include: Vec<String>) -> Self {
    Self {
      include,
      ..Self::default()
    }
  }

  pub fn keeps(&self, entry: &AssetEntry) -> bool {
    let ext = entry.extension();
    if ext.as_ref().is_some_and(|e| self.include.contains(e)) {
      return true;
    }
    if ext.as_ref().is_some_and(|e| self.exclude.contains(e)) {
      return false;
    }
    entry.size <= self.max_size
  }
}

/// Keep the entries `policy` admits, preserving order.
pub fn filter_tree(entries: Vec<AssetEntry>, policy: &FilterPolicy) -> Vec<AssetEntry> {
  entries
    .into_iter()
    .filter(|entry| {
      let keep = policy.keeps(entry);
      if !keep {
        debug!(path = %entry.relative.display(), size = entry.size, "asset filtered out");
      }
      keep
    })
    .collect()
}

/// List regular files under `root`, sorted by path. A missing root is empty.
pub fn scan_tree(root: &Path) -> Result<Vec<AssetEntry>, PackageError> {
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  let mut entries = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|e| PackageError::Walk(e.to_string()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let size = entry
      .metadata()
      .map_err(|e| PackageError::Walk(e.to_string()))?
      .len();
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
    entries.push(AssetEntry { relative, size });
  }
  Ok(entries)
}

/// Copy `entries` from `src_root` to `dest_root`, creating parent directories.
pub async fn copy_tree(src_root: &Path, dest_root: &Path, entries: &[AssetEntry]) -> Result<(), PackageError> {
  for entry in entries {
    let from = src_root.join(&entry.relative);
    let to = dest_root.join(&entry.relative);
    if let Some(parent) = to.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| PackageError::io(parent, e))?;
    }
    tokio::fs::copy(&from, &to).await.map_err(|e| PackageError::io(&from, e))?;
  }
  Ok(())
}
