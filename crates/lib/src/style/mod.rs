//! Style scoping: per-application keyframe names and window selectors.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::manifest::ScopeContext;

static KEYFRAMES_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)@((?:-[a-z]+-)?keyframes)(\s+)([A-Za-z0-9_-]+)").expect("valid keyframes pattern")
});

static ANIMATION_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)((?:-[a-z]+-)?animation(?:-name)?\s*:)([^;}]*)").expect("valid animation pattern")
});

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("valid identifier pattern"));

/// The window region a style source applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRole {
  Toolbar,
  Body,
  StatusBar,
  Dialog,
}

impl StyleRole {
  /// Concatenation order of compiled fragments.
  pub const ORDER: [StyleRole; 4] = [
    StyleRole::Toolbar,
    StyleRole::Body,
    StyleRole::StatusBar,
    StyleRole::Dialog,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      StyleRole::Toolbar => "toolbar",
      StyleRole::Body => "body",
      StyleRole::StatusBar => "statusbar",
      StyleRole::Dialog => "dialog",
    }
  }

  /// Selector group that scopes this role to one application.
  pub fn selector(self, scope: &ScopeContext) -> String {
    let window = format!(r#".{}-window_[data-id="{}"]"#, scope.namespace, scope.id);
    match self {
      StyleRole::Toolbar => format!("{window} .win-toolbar_, {window} .win-caption-toolbar_"),
      StyleRole::StatusBar => format!("{window} .win-status-bar_"),
      StyleRole::Dialog => format!(r#".{}-dialog_[data-id="{}"]"#, scope.namespace, scope.id),
      StyleRole::Body if scope.headless => window,
      StyleRole::Body => format!("{window} .window-body_"),
    }
  }
}

/// Rename `@keyframes` declarations to `<name>-<id>` and update the
/// `animation` / `animation-name` declarations that refer to them.
///
/// Names already ending in `-<id>` are left alone, so running this twice
/// gives the same result as running it once.
pub fn scope_animations(id: &str, css: &str) -> String {
  let suffix = format!("-{id}");
  let names: BTreeSet<String> = KEYFRAMES_RE
    .captures_iter(css)
    .map(|caps| caps[3].to_string())
    .filter(|name| !name.ends_with(&suffix))
    .collect();

  if names.is_empty() {
    return css.to_string();
  }

  let renamed = KEYFRAMES_RE.replace_all(css, |caps: &Captures<'_>| {
    let name = &caps[3];
    if names.contains(name) {
      format!("@{}{}{}{}", &caps[1], &caps[2], name, suffix)
    } else {
      caps[0].to_string()
    }
  });

  ANIMATION_DECL_RE
    .replace_all(&renamed, |caps: &Captures<'_>| {
      let value = IDENT_RE.replace_all(&caps[2], |ident: &Captures<'_>| {
        let token = &ident[0];
        if names.contains(token) {
          format!("{token}{suffix}")
        } else {
          token.to_string()
        }
      });
      format!("{}{}", &caps[1], value)
    })
    .into_owned()
}

/// Wrap `css` in the selector group for `role`.
pub fn scope_selector(scope: &ScopeContext, role: StyleRole, css: &str) -> String {
  format!("{} {{{}}}", role.selector(scope), css)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renames_keyframes_and_references() {
    let css = "@keyframes spin{from{a:b}} @-webkit-keyframes spin{} .x{animation: spin 1s linear; animation-name:spin}";
    let out = scope_animations("demo", css);
    assert_eq!(
      out,
      "@keyframes spin-demo{from{a:b}} @-webkit-keyframes spin-demo{} \
       .x{animation: spin-demo 1s linear; animation-name:spin-demo}"
    );
  }

  #[test]
  fn is_idempotent() {
    let css = "@keyframes fade{} .x{animation:fade 2s} .y{-webkit-animation-name: fade}";
    let once = scope_animations("demo", css);
    assert_eq!(scope_animations("demo", &once), once);
  }

  #[test]
  fn does_not_touch_partial_identifiers() {
    let css = "@keyframes spin{} .x{animation:spin-slow 1s, spin_fast 2s, spin 3s; transition:spin}";
    let out = scope_animations("demo", css);
    assert_eq!(
      out,
      "@keyframes spin-demo{} .x{animation:spin-slow 1s, spin_fast 2s, spin-demo 3s; transition:spin}"
    );
  }

  #[test]
  fn without_keyframes_css_is_unchanged() {
    let css = ".x{animation:external 1s}";
    assert_eq!(scope_animations("demo", css), css);
  }

  #[test]
  fn role_selectors() {
    let scope = ScopeContext::new("demo", "acme");
    assert_eq!(
      StyleRole::Toolbar.selector(&scope),
      r#".acme-window_[data-id="demo"] .win-toolbar_, .acme-window_[data-id="demo"] .win-caption-toolbar_"#
    );
    assert_eq!(
      StyleRole::StatusBar.selector(&scope),
      r#".acme-window_[data-id="demo"] .win-status-bar_"#
    );
    assert_eq!(StyleRole::Dialog.selector(&scope), r#".acme-dialog_[data-id="demo"]"#);
    assert_eq!(
      StyleRole::Body.selector(&scope),
      r#".acme-window_[data-id="demo"] .window-body_"#
    );
  }

  #[test]
  fn headless_body_uses_bare_window() {
    let scope = ScopeContext::new("demo", "ant").with_headless(true);
    assert_eq!(
      scope_selector(&scope, StyleRole::Body, "a:b;"),
      r#".ant-window_[data-id="demo"] {a:b;}"#
    );
  }
}
