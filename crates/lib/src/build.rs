//! Build an application: manifest in, packaged output out.
//!
//! This is the entry point behind `antbuild build`:
//! - reads `index.xml` and derives the scope
//! - runs the manifest's build tasks
//! - compiles the six sections concurrently
//! - assembles `index.xml` and packages the destination

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::assemble::assemble;
use crate::compile::{CompileContext, compile_sections};
use crate::error::BuildError;
use crate::manifest::Manifest;
use crate::package::{BuildResult, PackageOptions, check_required_assets, package};
use crate::task::run_tasks;
use crate::toolchain::Toolchain;

/// Options for a single build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Application source directory containing `index.xml`
  pub source: PathBuf,
  /// Output directory, replaced on every build
  pub destination: PathBuf,
  /// Strip development blocks, minify scripts and drop formatting whitespace
  pub uglify: bool,
  /// Archive the output into `<id>.app`
  pub compress: bool,
  pub toolchain: Toolchain,
}

impl BuildOptions {
  pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
    Self {
      source: source.into(),
      destination: destination.into(),
      uglify: false,
      compress: false,
      toolchain: Toolchain::default(),
    }
  }

  pub fn uglify(mut self, uglify: bool) -> Self {
    self.uglify = uglify;
    self
  }

  pub fn compress(mut self, compress: bool) -> Self {
    self.compress = compress;
    self
  }

  pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
    self.toolchain = toolchain;
    self
  }
}

/// Build the application at `options.source` into `options.destination`.
///
/// # Errors
///
/// Fails without touching the destination or the source tree if the manifest
/// is missing or malformed, or if the declared credential file is absent.
/// Any tool, resolution, or I/O failure after that aborts the build.
pub async fn build(options: &BuildOptions) -> Result<BuildResult, BuildError> {
  let started = Utc::now();
  let manifest = Manifest::read(&options.source).await?;
  let scope = manifest.scope()?;
  info!(id = %scope.id, namespace = %scope.namespace, "building application");

  // Tasks write into the source tree, so this check comes first.
  check_required_assets(&manifest).await?;

  run_tasks(&manifest, &options.source, &scope, options.uglify, &options.toolchain).await?;

  let ctx = CompileContext {
    manifest: &manifest,
    scope: &scope,
    uglify: options.uglify,
    toolchain: &options.toolchain,
  };
  let sections = compile_sections(ctx).await?;

  let assembled = assemble(
    &manifest.raw,
    &manifest.source_root,
    &sections,
    &scope,
    options.uglify,
    &started,
  )
  .await?;

  let package_options = PackageOptions {
    destination: options.destination.clone(),
    uglify: options.uglify,
    compress: options.compress,
    timestamp: started,
  };
  let result = package(&assembled, &manifest, &scope, &package_options).await?;

  info!(
    id = %result.id,
    size = result.size,
    files = result.files.len(),
    compressed = result.container.is_some(),
    "build complete"
  );
  Ok(result)
}
