use tracing::debug;

use super::{CompileContext, read_source, section_source};
use crate::error::BuildError;
use crate::resolve::ImportResolver;
use crate::rewrite::{rewrite_tilde_paths, strip_formatting};
use crate::style::{StyleRole, scope_animations, scope_selector};

fn role_keys(role: StyleRole) -> &'static [(&'static str, Option<&'static str>)] {
  match role {
    StyleRole::Toolbar => &[("toolbar-style", None), ("style", Some("toolbar"))],
    StyleRole::StatusBar => &[("statusbar-style", None), ("style", Some("statusbar"))],
    StyleRole::Dialog => &[("dialog-style", None), ("style", Some("dialog"))],
    StyleRole::Body => &[("style", None)],
  }
}

async fn compile_role(ctx: CompileContext<'_>, role: StyleRole) -> Result<Option<String>, BuildError> {
  let Some(path) = section_source(ctx.manifest, role.as_str(), role_keys(role)).await else {
    return Ok(None);
  };

  let source = read_source(&path).await?;
  let source = ImportResolver::markup().resolve_file(&path, &source).await?;
  let source = scope_animations(&ctx.scope.id, &source);
  let wrapped = scope_selector(ctx.scope, role, &source);
  let css = ctx.toolchain.compile_style(&wrapped).await?;
  let css = strip_formatting(&rewrite_tilde_paths(&css, ctx.scope));

  debug!(role = role.as_str(), path = %path.display(), bytes = css.len(), "style compiled");
  Ok(Some(css))
}

/// Compile the four style roles and concatenate them in role order.
pub async fn compile_style(ctx: CompileContext<'_>) -> Result<Option<String>, BuildError> {
  let mut out = String::new();
  let mut any = false;
  for role in StyleRole::ORDER {
    if let Some(css) = compile_role(ctx, role).await? {
      out.push_str(&css);
      any = true;
    }
  }
  Ok(any.then_some(out))
}
