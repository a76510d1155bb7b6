//! Text rewrites shared by the section compilers and the assembler.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::manifest::ScopeContext;

/// A tilde-rooted reference.
///
/// `~` counts as a path root at the start of input or after whitespace, `>`,
/// `=`, `(`, `,`, a quote or `url(`. The character after `~` is captured so
/// `~/rel` and a bare `~` closed by a quote, `)`, `<` or end of input are
/// matched without lookahead. `~x` (bitwise not) never matches.
static TILDE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(url\(\s*['"]?|^|[\s>=(,"'`])~(/|["'`)<]|$)"#).expect("valid tilde pattern")
});

/// Remove tab, carriage return and newline characters.
pub fn strip_formatting(text: &str) -> String {
  text.chars().filter(|c| !matches!(c, '\t' | '\n' | '\r')).collect()
}

/// Rewrite `~/rel` and bare `~` references to `/app/<namespace>/<id>/rel`.
pub fn rewrite_tilde_paths(text: &str, scope: &ScopeContext) -> String {
  let root = scope.asset_root();
  TILDE_RE
    .replace_all(text, |caps: &Captures<'_>| format!("{}{}{}", &caps[1], root, &caps[2]))
    .into_owned()
}

/// Wrap text in a CDATA section, splitting any embedded terminator.
pub fn cdata(text: &str) -> String {
  format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
