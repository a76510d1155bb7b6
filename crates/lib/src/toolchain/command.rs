//! External tool invocation.
//!
//! Runs a configured program with `{input}`/`{output}` placeholders expanded,
//! optionally feeding text on stdin, and returns its stdout.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::ToolError;

/// A program plus argument template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  /// Extra arguments appended when tree-shaking must be disabled (bundler only).
  #[serde(default)]
  pub no_treeshake_args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: &str) -> Self {
    Self {
      program: program.to_string(),
      args: Vec::new(),
      no_treeshake_args: Vec::new(),
    }
  }

  pub fn with_args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args = args.into_iter().map(Into::into).collect();
    self
  }

  fn expand_args(&self, input: Option<&Path>, output: Option<&Path>, extra: &[String]) -> Vec<String> {
    self
      .args
      .iter()
      .chain(extra)
      .map(|arg| {
        let mut arg = arg.clone();
        if let Some(input) = input {
          arg = arg.replace("{input}", &input.to_string_lossy());
        }
        if let Some(output) = output {
          arg = arg.replace("{output}", &output.to_string_lossy());
        }
        arg
      })
      .collect()
  }
}

/// Run `spec`, returning stdout.
///
/// # Arguments
///
/// * `tool` - Name used in logs and errors (`bundler`, `minifier`, `style`)
/// * `spec` - Program and argument template
/// * `input` / `output` - Values for the `{input}` and `{output}` placeholders
/// * `extra` - Additional templated arguments appended after `spec.args`
/// * `stdin` - Text written to the child's stdin, if any
pub async fn run_tool(
  tool: &str,
  spec: &CommandSpec,
  input: Option<&Path>,
  output: Option<&Path>,
  extra: &[String],
  stdin: Option<&str>,
) -> Result<String, ToolError> {
  let args = spec.expand_args(input, output, extra);
  info!(tool = %tool, program = %spec.program, "running external tool");
  debug!(args = ?args, "tool arguments");

  let mut command = Command::new(&spec.program);
  command
    .args(&args)
    .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let mut child = command.spawn().map_err(|source| ToolError::Spawn {
    tool: tool.to_string(),
    program: spec.program.clone(),
    source,
  })?;

  if let Some(text) = stdin {
    if let Some(mut pipe) = child.stdin.take() {
      pipe.write_all(text.as_bytes()).await?;
      pipe.shutdown().await?;
    }
  }

  let result = child.wait_with_output().await?;

  if !result.status.success() {
    let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "tool stderr");
    }
    return Err(ToolError::Failed {
      tool: tool.to_string(),
      code: result.status.code(),
      stderr,
    });
  }

  Ok(String::from_utf8_lossy(&result.stdout).into_owned())
}
