//! Section compilers.
//!
//! Each compiler turns one manifest-declared source into the text of one
//! section. A compiler returns `Ok(None)` when its meta key is absent or the
//! declared file does not exist; the section is then omitted from the
//! assembled document.

mod markup;
mod script;
mod style;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::BuildError;
use crate::manifest::{Manifest, ScopeContext};
use crate::toolchain::Toolchain;

pub use markup::{compile_content, compile_icons, compile_stores, compile_xsl};
pub use script::{compile_script, strip_dev_blocks};
pub use style::compile_style;

/// Shared, read-only inputs of every section compiler.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
  pub manifest: &'a Manifest,
  pub scope: &'a ScopeContext,
  pub uglify: bool,
  pub toolchain: &'a Toolchain,
}

/// Compiled section texts. `None` means the section is omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
  pub xsl: Option<String>,
  pub script: Option<String>,
  pub style: Option<String>,
  pub stores: Option<String>,
  pub content: Option<String>,
  pub icons: Option<String>,
}

/// Compile all six sections concurrently. The first failure aborts the rest.
pub async fn compile_sections(ctx: CompileContext<'_>) -> Result<Sections, BuildError> {
  let (script, style, xsl, content, stores, icons) = tokio::try_join!(
    compile_script(ctx),
    compile_style(ctx),
    compile_xsl(ctx),
    compile_content(ctx),
    compile_stores(ctx),
    compile_icons(ctx),
  )?;

  let sections = Sections {
    xsl,
    script,
    style,
    stores,
    content,
    icons,
  };
  info!(
    script = sections.script.is_some(),
    style = sections.style.is_some(),
    xsl = sections.xsl.is_some(),
    content = sections.content.is_some(),
    stores = sections.stores.is_some(),
    icons = sections.icons.is_some(),
    "sections compiled"
  );
  Ok(sections)
}

/// Resolve the first declared `(name, attr)` meta key to an existing file.
///
/// Logs and returns `None` when no key is declared or the file is missing.
pub(crate) async fn section_source(
  manifest: &Manifest,
  section: &str,
  keys: &[(&str, Option<&str>)],
) -> Option<PathBuf> {
  let Some(path) = keys.iter().find_map(|(name, attr)| manifest.source_path(name, *attr)) else {
    debug!(section = %section, "section not declared");
    return None;
  };
  if tokio::fs::try_exists(&path).await.unwrap_or(false) {
    Some(path)
  } else {
    debug!(section = %section, path = %path.display(), "section source missing, omitting");
    None
  }
}

pub(crate) async fn read_source(path: &Path) -> Result<String, BuildError> {
  tokio::fs::read_to_string(path)
    .await
    .map_err(|e| BuildError::io(path, e))
}
