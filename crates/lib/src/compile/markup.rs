//! Markup sections: xsl passthrough, icons, window content and content stores.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CompileContext, read_source, section_source};
use crate::directive::{splice, store_tokens};
use crate::error::BuildError;
use crate::resolve::ImportResolver;
use crate::rewrite::{rewrite_tilde_paths, strip_formatting};

pub async fn compile_xsl(ctx: CompileContext<'_>) -> Result<Option<String>, BuildError> {
  let Some(path) = section_source(ctx.manifest, "xsl", &[("xsl", None)]).await else {
    return Ok(None);
  };
  let text = read_source(&path).await?;
  Ok(Some(rewrite_tilde_paths(&strip_formatting(&text), ctx.scope)))
}

pub async fn compile_icons(ctx: CompileContext<'_>) -> Result<Option<String>, BuildError> {
  let Some(path) = section_source(ctx.manifest, "icons", &[("icons", None)]).await else {
    return Ok(None);
  };
  let text = read_source(&path).await?;
  let text = ImportResolver::markup().resolve_file(&path, &text).await?;
  Ok(Some(rewrite_tilde_paths(&strip_formatting(&text), ctx.scope)))
}

/// The content file with its markup imports inlined.
///
/// `@store` directives are left in place, including those that came from
/// imported partials, so both content compilers see the same text.
async fn resolved_content(ctx: CompileContext<'_>, section: &str) -> Result<Option<(PathBuf, String)>, BuildError> {
  let Some(path) = section_source(ctx.manifest, section, &[("content", None)]).await else {
    return Ok(None);
  };
  let text = read_source(&path).await?;
  let text = ImportResolver::markup().resolve_file(&path, &text).await?;
  Ok(Some((path, text)))
}

/// Window body markup, with every `@store` directive removed.
pub async fn compile_content(ctx: CompileContext<'_>) -> Result<Option<String>, BuildError> {
  let Some((_, text)) = resolved_content(ctx, "content").await? else {
    return Ok(None);
  };
  let removals: Vec<_> = store_tokens(&text).into_iter().map(|t| (t.span, String::new())).collect();
  let text = splice(&text, &removals);

  let text = rewrite_tilde_paths(&text, ctx.scope);
  Ok(Some(if ctx.uglify { strip_formatting(&text) } else { text }))
}

/// `<store>` fragments for every `@store` directive in the resolved content.
///
/// Store paths are relative to the content file's directory, including stores
/// declared in imported partials.
pub async fn compile_stores(ctx: CompileContext<'_>) -> Result<Option<String>, BuildError> {
  let Some((path, text)) = resolved_content(ctx, "stores").await? else {
    return Ok(None);
  };
  let base_dir = path.parent().unwrap_or(Path::new(""));

  let mut fragments = String::new();
  for token in store_tokens(&text) {
    let src = token.directive.path();
    let store_path = base_dir.join(src);
    if !tokio::fs::try_exists(&store_path).await.unwrap_or(false) {
      debug!(store = %src, "store file missing, dropping");
      continue;
    }
    let body = read_source(&store_path).await?;
    let body = ImportResolver::markup().resolve_file(&store_path, &body).await?;
    let body = rewrite_tilde_paths(&body, ctx.scope);
    let body = if ctx.uglify { strip_formatting(&body) } else { body };
    fragments.push_str(&format!("<store src=\"{}\">{}</store>", src, body));
  }

  Ok((!fragments.is_empty()).then_some(fragments))
}
