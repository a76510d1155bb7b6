//! Packaging: writes the destination tree and, optionally, the `<id>.app` container.

mod archive;
mod filter;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

pub use archive::{IconMetadata, stamp_icon, write_container};
pub use filter::{AssetEntry, FilterPolicy, copy_tree, filter_tree, scan_tree};

use crate::assemble::format_timestamp;
use crate::consts::{CONTAINER_EXT, ICON_FILE, LICENSE_FILE, MANIFEST_FILE, PUBLIC_DIR};
use crate::manifest::{Manifest, ScopeContext};
use crate::util::hash::{ContentHash, hash_bytes, hash_file};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("required asset missing: {}", path.display())]
  MissingRequiredAsset { path: PathBuf },

  #[error("cannot replace destination {}: {source}", path.display())]
  DestinationConflict { path: PathBuf, source: std::io::Error },

  #[error("io error on {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("failed to write container: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("failed to enumerate files: {0}")]
  Walk(String),
}

impl PackageError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    PackageError::Io {
      path: path.into(),
      source,
    }
  }
}

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
  pub version: Option<String>,
  pub name: Option<String>,
  pub id: String,
  pub namespace: String,
  pub uglified: bool,
  /// Byte length of `index.xml`, or of the container for compressed builds.
  pub size: u64,
  pub build_path: PathBuf,
  /// Produced files, relative to `build_path`, sorted.
  pub files: Vec<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub container: Option<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub run_requires: Option<BTreeMap<String, String>>,
  /// SHA-256 of the primary artifact.
  pub digest: ContentHash,
}

/// Destination-side options of a build.
#[derive(Debug, Clone)]
pub struct PackageOptions {
  pub destination: PathBuf,
  pub uglify: bool,
  pub compress: bool,
  pub timestamp: DateTime<Utc>,
}

/// The declared credential file, checked to exist.
///
/// Returns `Ok(None)` when the manifest declares no `oauth` entry.
pub async fn check_required_assets(manifest: &Manifest) -> Result<Option<PathBuf>, PackageError> {
  let Some(path) = manifest.source_path("oauth", None) else {
    return Ok(None);
  };
  if tokio::fs::try_exists(&path).await.unwrap_or(false) {
    Ok(Some(path))
  } else {
    Err(PackageError::MissingRequiredAsset { path })
  }
}

/// Refuse a destination that is the source tree or one of its ancestors.
///
/// The destination is removed before every build, so either would delete the
/// application sources.
async fn guard_destination(destination: &Path, source_root: &Path) -> Result<(), PackageError> {
  if !tokio::fs::try_exists(destination).await.unwrap_or(false) {
    return Ok(());
  }
  let canonical = |path: &Path| {
    dunce::canonicalize(path).map_err(|source| PackageError::DestinationConflict {
      path: path.to_path_buf(),
      source,
    })
  };
  let destination_abs = canonical(destination)?;
  let source_abs = canonical(source_root)?;
  if source_abs.starts_with(&destination_abs) {
    return Err(PackageError::DestinationConflict {
      path: destination.to_path_buf(),
      source: std::io::Error::other(format!(
        "destination contains the application source {}",
        source_root.display()
      )),
    });
  }
  Ok(())
}

async fn prepare_destination(destination: &Path) -> Result<(), PackageError> {
  if tokio::fs::try_exists(destination).await.unwrap_or(false) {
    debug!(path = %destination.display(), "removing previous build");
    tokio::fs::remove_dir_all(destination)
      .await
      .map_err(|source| PackageError::DestinationConflict {
        path: destination.to_path_buf(),
        source,
      })?;
  }
  tokio::fs::create_dir_all(destination)
    .await
    .map_err(|source| PackageError::DestinationConflict {
      path: destination.to_path_buf(),
      source,
    })
}

/// Sorted relative paths of every regular file under `root`.
pub fn enumerate_files(root: &Path) -> Result<Vec<PathBuf>, PackageError> {
  let mut files = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|e| PackageError::Walk(e.to_string()))?;
    if entry.file_type().is_file() {
      files.push(entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf());
    }
  }
  files.sort();
  Ok(files)
}

/// Delete everything but the root-level `keep` files, then the emptied directories.
fn remove_loose_files(root: &Path, files: &[PathBuf], keep: &[&str]) -> Result<(), PackageError> {
  for relative in files {
    let root_level = relative.parent().is_none_or(|p| p.as_os_str().is_empty());
    let kept = root_level && relative.to_str().is_some_and(|name| keep.contains(&name));
    if !kept {
      let path = root.join(relative);
      std::fs::remove_file(&path).map_err(|e| PackageError::io(&path, e))?;
    }
  }

  for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
    let entry = entry.map_err(|e| PackageError::Walk(e.to_string()))?;
    if entry.file_type().is_dir() {
      let is_empty = std::fs::read_dir(entry.path())
        .map_err(|e| PackageError::io(entry.path(), e))?
        .next()
        .is_none();
      if is_empty {
        std::fs::remove_dir(entry.path()).map_err(|e| PackageError::io(entry.path(), e))?;
      }
    }
  }
  Ok(())
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), PackageError> {
  tokio::fs::copy(from, to).await.map_err(|e| PackageError::io(from, e))?;
  Ok(())
}

fn file_name(path: &Path) -> Result<&str, PackageError> {
  path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
    PackageError::io(
      path,
      std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    )
  })
}

/// Write the build output for `assembled` and return the build summary.
pub async fn package(
  assembled: &str,
  manifest: &Manifest,
  scope: &ScopeContext,
  options: &PackageOptions,
) -> Result<BuildResult, PackageError> {
  let credential = check_required_assets(manifest).await?;
  let source_root = &manifest.source_root;
  let destination = &options.destination;

  guard_destination(destination, source_root).await?;
  prepare_destination(destination).await?;

  // Public assets go first so the reserved root files below always win.
  let public = source_root.join(PUBLIC_DIR);
  let assets = filter_tree(scan_tree(&public)?, &FilterPolicy::with_includes(manifest.build_includes()));
  copy_tree(&public, destination, &assets).await?;
  debug!(count = assets.len(), "public assets copied");

  let index = destination.join(MANIFEST_FILE);
  tokio::fs::write(&index, assembled)
    .await
    .map_err(|e| PackageError::io(&index, e))?;

  let license = source_root.join(LICENSE_FILE);
  if tokio::fs::try_exists(&license).await.unwrap_or(false) {
    copy_file(&license, &destination.join(LICENSE_FILE)).await?;
  }

  let mut keep = vec![ICON_FILE, LICENSE_FILE];
  if let Some(credential) = &credential {
    let name = file_name(credential)?;
    copy_file(credential, &destination.join(name)).await?;
    keep.push(name);
  }

  let files = enumerate_files(destination)?;

  let (size, digest, container) = if options.compress {
    let total: u64 = files
      .iter()
      .map(|f| std::fs::metadata(destination.join(f)).map(|m| m.len()).unwrap_or(0))
      .sum();

    let icon = destination.join(ICON_FILE);
    if tokio::fs::try_exists(&icon).await.unwrap_or(false) {
      let svg = tokio::fs::read_to_string(&icon)
        .await
        .map_err(|e| PackageError::io(&icon, e))?;
      let metadata = IconMetadata {
        namespace: scope.namespace.clone(),
        id: scope.id.clone(),
        name: manifest.title().unwrap_or_default().to_string(),
        author: manifest.author().unwrap_or_default().to_string(),
        version: manifest.version().unwrap_or_default().to_string(),
        size: total,
        license: manifest.meta_value("license", None).unwrap_or_default().to_string(),
        created: format_timestamp(&options.timestamp),
      };
      tokio::fs::write(&icon, stamp_icon(&svg, &metadata))
        .await
        .map_err(|e| PackageError::io(&icon, e))?;
    }

    let container = destination.join(format!("{}.{}", scope.id, CONTAINER_EXT));
    let len = write_container(destination, &files, &container)?;
    remove_loose_files(destination, &files, &keep)?;
    let digest = hash_file(&container).map_err(|e| PackageError::io(&container, e))?;
    info!(container = %container.display(), bytes = len, "container written");
    (len, digest, Some(container))
  } else {
    (assembled.len() as u64, hash_bytes(assembled.as_bytes()), None)
  };

  Ok(BuildResult {
    version: manifest.version().map(str::to_string),
    name: manifest.title().map(str::to_string),
    id: scope.id.clone(),
    namespace: scope.namespace.clone(),
    uglified: options.uglify,
    size,
    build_path: destination.clone(),
    files,
    container,
    run_requires: manifest.run_requires(),
    digest,
  })
}
