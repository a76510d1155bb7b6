//! External collaborators: script bundler, script minifier, style compiler.
//!
//! Each collaborator is either the built-in implementation or an external
//! command described in a TOML toolchain file:
//!
//! ```toml
//! [bundler]
//! kind = "command"
//! program = "rollup"
//! args = ["{input}", "--file", "{output}", "--format", "iife"]
//! no_treeshake_args = ["--no-treeshake"]
//!
//! [minifier]
//! kind = "builtin"
//! ```

mod command;
mod css;
mod minify;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use command::{CommandSpec, run_tool};
pub use css::compile_nested;
pub use minify::minify_script;

use crate::paths::{TOOLCHAIN_ENV, default_toolchain_file};

/// Errors raised by a toolchain collaborator.
#[derive(Debug, Error)]
pub enum ToolError {
  #[error("{tool} failed (exit code {code:?}): {stderr}")]
  Failed {
    tool: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to start {tool} program '{program}': {source}")]
  Spawn {
    tool: String,
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{tool} rejected its input: {message}")]
  Invalid { tool: String, message: String },

  #[error("invalid toolchain file {path}: {message}")]
  Config { path: PathBuf, message: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// One collaborator: built in, or an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Tool {
  #[default]
  Builtin,
  Command(CommandSpec),
}

/// Options for a single bundling run.
#[derive(Debug, Clone, Copy)]
pub struct BundleOptions {
  /// When false, the bundler must keep unused exports (build tasks).
  pub treeshake: bool,
}

impl Default for BundleOptions {
  fn default() -> Self {
    Self { treeshake: true }
  }
}

/// The three collaborators used by a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
  pub bundler: Tool,
  pub minifier: Tool,
  pub styler: Tool,
}

impl Toolchain {
  /// Load the toolchain.
  ///
  /// Lookup order: `explicit`, then `$ANTBUILD_TOOLCHAIN`, then the default
  /// file in the user config directory. When none exists, every collaborator
  /// is built in. An explicitly named file that does not exist is an error.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ToolError> {
    if let Some(path) = explicit {
      return Self::from_file(path);
    }
    if let Some(path) = std::env::var_os(TOOLCHAIN_ENV).filter(|v| !v.is_empty()) {
      return Self::from_file(Path::new(&path));
    }
    match default_toolchain_file() {
      Some(path) if path.is_file() => Self::from_file(&path),
      _ => {
        debug!("no toolchain file, using built-in collaborators");
        Ok(Self::default())
      }
    }
  }

  /// Parse a toolchain file.
  pub fn from_file(path: &Path) -> Result<Self, ToolError> {
    let text = std::fs::read_to_string(path).map_err(|e| ToolError::Config {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;
    let toolchain: Self = toml::from_str(&text).map_err(|e| ToolError::Config {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;
    info!(path = %path.display(), "loaded toolchain");
    Ok(toolchain)
  }

  /// Bundle the module graph rooted at `entry` into one script.
  pub async fn bundle(&self, entry: &Path, options: BundleOptions) -> Result<String, ToolError> {
    match &self.bundler {
      Tool::Builtin => {
        debug!(entry = %entry.display(), "built-in bundler reads entry verbatim");
        Ok(tokio::fs::read_to_string(entry).await?)
      }
      Tool::Command(spec) => {
        // The temp file is removed on drop, on success and failure alike.
        let output = tempfile::Builder::new().prefix("antbuild-bundle-").suffix(".js").tempfile()?;
        let extra: &[String] = if options.treeshake { &[] } else { &spec.no_treeshake_args };
        let stdout = run_tool("bundler", spec, Some(entry), Some(output.path()), extra, None).await?;
        let written = tokio::fs::read_to_string(output.path()).await?;
        // Bundlers without an output flag print to stdout instead.
        Ok(if written.is_empty() { stdout } else { written })
      }
    }
  }

  /// Minify script text.
  pub async fn minify(&self, script: &str) -> Result<String, ToolError> {
    match &self.minifier {
      Tool::Builtin => Ok(minify_script(script)),
      Tool::Command(spec) => run_tool("minifier", spec, None, None, &[], Some(script)).await,
    }
  }

  /// Compile nested style source to plain CSS.
  pub async fn compile_style(&self, source: &str) -> Result<String, ToolError> {
    match &self.styler {
      Tool::Builtin => compile_nested(source).map_err(|message| ToolError::Invalid {
        tool: "style".to_string(),
        message,
      }),
      Tool::Command(spec) => run_tool("style", spec, None, None, &[], Some(source)).await,
    }
  }
}
