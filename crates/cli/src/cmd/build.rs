//! Implementation of the `antbuild build` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use antbuild_lib::toolchain::Toolchain;
use antbuild_lib::{BuildOptions, BuildResult, build};

use crate::output::{
  format_elapsed, format_size, print_info, print_item, print_json, print_stat, print_success, short_digest,
};

/// Arguments of `antbuild build`.
pub struct BuildArgs {
  pub source: PathBuf,
  pub destination: PathBuf,
  pub uglify: bool,
  pub compress: bool,
  pub toolchain: Option<PathBuf>,
}

/// Execute the build command.
///
/// Loads the toolchain, runs the whole pipeline on a fresh runtime and prints
/// a summary (or the `BuildResult` as JSON).
pub fn cmd_build(args: &BuildArgs, json: bool, verbose: bool) -> Result<()> {
  let toolchain = Toolchain::load(args.toolchain.as_deref()).context("Failed to load toolchain")?;
  let source = dunce::canonicalize(&args.source)
    .with_context(|| format!("Source directory not found: {}", args.source.display()))?;
  info!(source = %source.display(), "starting build");

  let options = BuildOptions::new(source, args.destination.clone())
    .uglify(args.uglify)
    .compress(args.compress)
    .toolchain(toolchain);

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(build(&options)).context("Build failed")?;

  if json {
    return print_json(&result);
  }
  print_summary(&result, started.elapsed(), verbose);
  Ok(())
}

fn print_summary(result: &BuildResult, elapsed: std::time::Duration, verbose: bool) {
  let title = match (&result.name, &result.version) {
    (Some(name), Some(version)) => format!("Built {} {} ({}/{})", name, version, result.namespace, result.id),
    (Some(name), None) => format!("Built {} ({}/{})", name, result.namespace, result.id),
    _ => format!("Built {}/{}", result.namespace, result.id),
  };
  print_success(&title);
  print_stat("Output", &result.build_path.display().to_string());
  if let Some(container) = &result.container {
    print_stat("Container", &container.display().to_string());
  }
  print_stat("Size", &format_size(result.size));
  print_stat("Files", &result.files.len().to_string());
  print_stat("Digest", short_digest(&result.digest.0));
  print_stat("Uglified", if result.uglified { "yes" } else { "no" });
  print_stat("Time", &format_elapsed(elapsed));

  if let Some(requires) = &result.run_requires {
    println!();
    print_info("Requires:");
    for (id, description) in requires {
      if description.is_empty() {
        print_item(id);
      } else {
        print_item(format!("{} ({})", id, description));
      }
    }
  }

  if verbose {
    println!();
    println!("Files:");
    for file in &result.files {
      print_item(file.display());
    }
  }
}
