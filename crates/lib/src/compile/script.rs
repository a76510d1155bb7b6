use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{CompileContext, section_source};
use crate::error::BuildError;
use crate::resolve::ImportResolver;
use crate::rewrite::rewrite_tilde_paths;
use crate::toolchain::BundleOptions;

static DEV_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)/\*\s*@dev-start\s*\*/.*?/\*\s*@dev-end\s*\*/").expect("valid dev block pattern")
});

/// Remove everything between `/* @dev-start */` and `/* @dev-end */`, markers included.
pub fn strip_dev_blocks(script: &str) -> String {
  DEV_BLOCK_RE.replace_all(script, "").into_owned()
}

/// Compile the `script` section: bundle, inline `require()`s, then minify under uglify.
pub async fn compile_script(ctx: CompileContext<'_>) -> Result<Option<String>, BuildError> {
  let Some(entry) = section_source(ctx.manifest, "script", &[("script", None)]).await else {
    return Ok(None);
  };

  let bundled = ctx.toolchain.bundle(&entry, BundleOptions { treeshake: true }).await?;
  let mut code = ImportResolver::module().resolve_file(&entry, &bundled).await?;

  if ctx.uglify {
    code = strip_dev_blocks(&code);
  }
  code = rewrite_tilde_paths(&code, ctx.scope);
  if ctx.uglify {
    code = ctx.toolchain.minify(&code).await?;
  }

  debug!(entry = %entry.display(), bytes = code.len(), "script compiled");
  Ok(Some(code))
}
