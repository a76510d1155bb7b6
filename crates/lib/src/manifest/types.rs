use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One `<meta>` element from the manifest `Head`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEntry {
  pub name: String,
  pub attributes: BTreeMap<String, String>,
  /// Attribute maps of nested child elements, in document order.
  pub children: Vec<BTreeMap<String, String>>,
}

impl MetaEntry {
  /// Look up an attribute, defaulting to `value`.
  pub fn attr(&self, attr: Option<&str>) -> Option<&str> {
    self.attributes.get(attr.unwrap_or("value")).map(String::as_str)
  }
}

/// What a build task does with its bundled output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
  #[default]
  None,
  Minify,
  Skip,
}

impl TaskAction {
  pub fn parse(value: Option<&str>) -> Self {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
      Some("minify") => TaskAction::Minify,
      Some("skip") => TaskAction::Skip,
      _ => TaskAction::None,
    }
  }
}

/// An auxiliary `Build/task` entry: bundle `source` and write it to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTask {
  pub source: PathBuf,
  pub destination: PathBuf,
  pub action: TaskAction,
}

/// Identity of one application, threaded through every rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
  pub id: String,
  pub namespace: String,
  pub headless: bool,
}

impl ScopeContext {
  pub fn new(id: &str, namespace: &str) -> Self {
    Self {
      id: id.to_string(),
      namespace: namespace.to_string(),
      headless: false,
    }
  }

  pub fn with_headless(mut self, headless: bool) -> Self {
    self.headless = headless;
    self
  }

  /// Absolute path that `~` expands to, e.g. `/app/acme/demo`.
  pub fn asset_root(&self) -> String {
    format!("/app/{}/{}", self.namespace, self.id)
  }
}
