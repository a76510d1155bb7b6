//! Splices compiled sections into the manifest document.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use crate::compile::Sections;
use crate::consts::BUILT_ATTR;
use crate::error::BuildError;
use crate::manifest::{ManifestError, ScopeContext};
use crate::resolve::{ImportResolver, ResolveError};
use crate::rewrite::{cdata, rewrite_tilde_paths, strip_formatting};

static ROOT_TAG_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<Application\b").expect("valid root tag pattern"));

static EMPTY_HEAD_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<Head(\s[^>]*)?/>").expect("valid empty head pattern"));

static HEAD_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<Head[\s>]").expect("valid head pattern"));

const HEAD_CLOSE: &str = "</Head>";

/// Timestamp format used in the `built` attribute and icon metadata.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
  timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Stamp `built="<timestamp>"` on the root `<Application>` element.
pub fn stamp_built(document: &str, timestamp: &DateTime<Utc>) -> String {
  let stamp = format!(r#"<Application {}="{}""#, BUILT_ATTR, format_timestamp(timestamp));
  ROOT_TAG_RE.replacen(document, 1, stamp.as_str()).into_owned()
}

/// The section blocks in insertion order, empty sections omitted.
pub fn section_blocks(sections: &Sections) -> String {
  let mut out = String::new();
  if let Some(xsl) = sections.xsl.as_deref().filter(|s| !s.is_empty()) {
    out.push_str(xsl);
  }
  let tagged = [
    ("script", &sections.script),
    ("style", &sections.style),
    ("DomStore", &sections.stores),
    ("WindowBody", &sections.content),
    ("WindowIcons", &sections.icons),
  ];
  for (tag, text) in tagged {
    if let Some(text) = text.as_deref().filter(|s| !s.is_empty()) {
      out.push_str(&format!("<{tag}>{}</{tag}>", cdata(text)));
    }
  }
  out
}

/// Resolve markup imports in the document body, leaving `<Head>` untouched.
async fn resolve_outside_head(document: &str, source_root: &Path) -> Result<String, ResolveError> {
  let resolver = ImportResolver::markup();
  let head = HEAD_OPEN_RE
    .find(document)
    .and_then(|open| {
      let start = open.start();
      document[start..]
        .find(HEAD_CLOSE)
        .map(|close| (start, start + close + HEAD_CLOSE.len()))
    });

  match head {
    Some((start, end)) => {
      let before = resolver.resolve(&document[..start], source_root).await?;
      let after = resolver.resolve(&document[end..], source_root).await?;
      Ok(format!("{}{}{}", before, &document[start..end], after))
    }
    None => resolver.resolve(document, source_root).await,
  }
}

/// Build the final `index.xml` text.
///
/// The manifest's raw text is stamped, imports outside the head are inlined,
/// tilde paths are rewritten, and the compiled sections are inserted right
/// before `</Head>`. Formatting whitespace is stripped only under `uglify`.
pub async fn assemble(
  raw: &str,
  source_root: &Path,
  sections: &Sections,
  scope: &ScopeContext,
  uglify: bool,
  timestamp: &DateTime<Utc>,
) -> Result<String, BuildError> {
  let document = EMPTY_HEAD_RE.replacen(raw, 1, "<Head$1></Head>").into_owned();
  let document = stamp_built(&document, timestamp);
  let document = resolve_outside_head(&document, source_root).await?;
  let document = rewrite_tilde_paths(&document, scope);

  let Some(close) = document.find(HEAD_CLOSE) else {
    return Err(ManifestError::Malformed("missing </Head>".to_string()).into());
  };
  let mut assembled = String::with_capacity(document.len());
  assembled.push_str(&document[..close]);
  assembled.push_str(&section_blocks(sections));
  assembled.push_str(&document[close..]);

  Ok(if uglify { strip_formatting(&assembled) } else { assembled })
}
