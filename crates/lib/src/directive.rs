//! Inclusion directive tokenizer.
//!
//! Source files request inclusion of other files through three textual
//! directives:
//!
//! - `@import "<path>"` - markup/content dialect
//! - `require("<path>")` - module (script) dialect
//! - `@store "<path>"` - content-store fragment
//!
//! A single tokenizer recognizes all three and tags each match, so callers
//! dispatch on [`Directive`] instead of re-deriving the dialect from the text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(concat!(
    r#"@import\s*["'](?P<import>[^"'\r\n]+)["'];?"#,
    r#"|@store\s*["'](?P<store>[^"'\r\n]+)["'];?"#,
    r#"|\brequire\(\s*["'](?P<require>[^"'\r\n]+)["']\s*\);?"#,
  ))
  .expect("valid directive pattern")
});

/// A parsed inclusion directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Directive {
  Markup { path: String },
  Module { path: String },
  Store { path: String },
}

impl Directive {
  pub fn path(&self) -> &str {
    match self {
      Directive::Markup { path } | Directive::Module { path } | Directive::Store { path } => path,
    }
  }
}

/// Which inclusion directives a resolver expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
  Markup,
  Module,
}

impl Dialect {
  pub fn accepts(self, directive: &Directive) -> bool {
    matches!(
      (self, directive),
      (Dialect::Markup, Directive::Markup { .. }) | (Dialect::Module, Directive::Module { .. })
    )
  }
}

/// A directive located in a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub directive: Directive,
  /// Byte range of the full directive text, including a trailing `;`.
  pub span: Range<usize>,
}

/// Find every directive in `text`, in order of appearance.
pub fn tokenize(text: &str) -> Vec<Token> {
  DIRECTIVE_RE
    .captures_iter(text)
    .filter_map(|caps| {
      let span = caps.get(0)?.range();
      let directive = if let Some(m) = caps.name("import") {
        Directive::Markup {
          path: m.as_str().trim().to_string(),
        }
      } else if let Some(m) = caps.name("store") {
        Directive::Store {
          path: m.as_str().trim().to_string(),
        }
      } else {
        Directive::Module {
          path: caps.name("require")?.as_str().trim().to_string(),
        }
      };
      Some(Token { directive, span })
    })
    .collect()
}

/// Tokens of one dialect only.
pub fn tokenize_dialect(text: &str, dialect: Dialect) -> Vec<Token> {
  tokenize(text)
    .into_iter()
    .filter(|t| dialect.accepts(&t.directive))
    .collect()
}

/// `@store` tokens only.
pub fn store_tokens(text: &str) -> Vec<Token> {
  tokenize(text)
    .into_iter()
    .filter(|t| matches!(t.directive, Directive::Store { .. }))
    .collect()
}

/// Replace non-overlapping spans of `text`, given in ascending order.
pub fn splice(text: &str, replacements: &[(Range<usize>, String)]) -> String {
  let mut out = String::with_capacity(text.len());
  let mut cursor = 0;
  for (span, replacement) in replacements {
    out.push_str(&text[cursor..span.start]);
    out.push_str(replacement);
    cursor = span.end;
  }
  out.push_str(&text[cursor..]);
  out
}
