//! Application manifest (`index.xml`) reading and metadata lookup.
//!
//! The manifest is decoded once per build. Only the `Head/meta` entries and the
//! optional `Build/task` list are extracted; everything else in the document is
//! carried through untouched in [`Manifest::raw`] for the assembler.

mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_NAMESPACE, MANIFEST_FILE};
use crate::rewrite::strip_formatting;

pub use types::*;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("manifest not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read manifest {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("malformed manifest: {0}")]
  Malformed(String),

  #[error("manifest is missing required meta entry '{0}'")]
  MissingMeta(String),
}

/// A decoded application manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
  /// Directory containing `index.xml`; relative meta paths resolve against it.
  pub source_root: PathBuf,
  /// The document exactly as read, formatting whitespace included.
  pub raw: String,
  pub meta: Vec<MetaEntry>,
  pub tasks: Vec<BuildTask>,
}

impl Manifest {
  /// Read and decode `<source_root>/index.xml`.
  pub async fn read(source_root: &Path) -> Result<Self, ManifestError> {
    let path = source_root.join(MANIFEST_FILE);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
      return Err(ManifestError::NotFound { path });
    }

    let raw = tokio::fs::read_to_string(&path)
      .await
      .map_err(|source| ManifestError::Read { path: path.clone(), source })?;

    let manifest = Self::parse(source_root, raw)?;
    debug!(
      path = %path.display(),
      meta = manifest.meta.len(),
      tasks = manifest.tasks.len(),
      "manifest decoded"
    );
    Ok(manifest)
  }

  /// Decode manifest text. Tabs and newlines are stripped before decoding.
  pub fn parse(source_root: &Path, raw: String) -> Result<Self, ManifestError> {
    let stripped = strip_formatting(&raw);
    let (meta, tasks) = decode(&stripped)?;
    Ok(Self {
      source_root: source_root.to_path_buf(),
      raw,
      meta,
      tasks,
    })
  }

  /// First meta entry named `name`.
  pub fn meta_entry(&self, name: &str) -> Option<&MetaEntry> {
    self.meta.iter().find(|m| m.name == name)
  }

  /// Attribute `attr` (default `value`) of the first entry named `name`.
  ///
  /// `None` means the section is absent, never an error.
  pub fn meta_value(&self, name: &str, attr: Option<&str>) -> Option<&str> {
    self.meta_entry(name).and_then(|m| m.attr(attr))
  }

  /// Child element attribute maps of the entry named `name`.
  pub fn meta_list(&self, name: &str) -> &[BTreeMap<String, String>] {
    self.meta_entry(name).map(|m| m.children.as_slice()).unwrap_or(&[])
  }

  /// Resolve a meta value as a path under the source root.
  pub fn source_path(&self, name: &str, attr: Option<&str>) -> Option<PathBuf> {
    self
      .meta_value(name, attr)
      .filter(|v| !v.trim().is_empty())
      .map(|v| self.source_root.join(v.trim()))
  }

  /// Derive the scope (id, namespace, headless) for this build.
  pub fn scope(&self) -> Result<ScopeContext, ManifestError> {
    let id = self
      .meta_value("id", None)
      .filter(|v| !v.trim().is_empty())
      .ok_or_else(|| ManifestError::MissingMeta("id".to_string()))?;
    let namespace = self
      .meta_value("author", Some("namespace"))
      .filter(|v| !v.trim().is_empty())
      .unwrap_or(DEFAULT_NAMESPACE);

    let headless = match self.meta_entry("headless") {
      Some(entry) => !matches!(entry.attr(None).map(str::trim), Some("false" | "0" | "no")),
      None => false,
    };

    Ok(ScopeContext::new(id.trim(), namespace.trim()).with_headless(headless))
  }

  /// Declared `Build/task` entries, in document order.
  pub fn tasks(&self) -> &[BuildTask] {
    &self.tasks
  }

  pub fn title(&self) -> Option<&str> {
    self.meta_value("title", None)
  }

  pub fn version(&self) -> Option<&str> {
    self.meta_value("title", Some("version"))
  }

  pub fn author(&self) -> Option<&str> {
    self.meta_value("author", None)
  }

  /// Extensions re-admitted by `<meta name="build" include="..."/>`.
  ///
  /// Accepts comma or whitespace separated lists, with or without leading dots.
  pub fn build_includes(&self) -> Vec<String> {
    self
      .meta_value("build", Some("include"))
      .map(|list| {
        list
          .split(|c: char| c == ',' || c.is_whitespace())
          .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
          .filter(|ext| !ext.is_empty())
          .collect()
      })
      .unwrap_or_default()
  }

  /// `requires` children as an id -> description map.
  pub fn run_requires(&self) -> Option<BTreeMap<String, String>> {
    let children = self.meta_list("requires");
    if children.is_empty() {
      return None;
    }
    let requires = children
      .iter()
      .filter_map(|attrs| {
        let id = attrs.get("id")?;
        let description = attrs.get("description").cloned().unwrap_or_default();
        Some((id.clone(), description))
      })
      .collect::<BTreeMap<_, _>>();
    Some(requires)
  }
}

fn element_name(e: &BytesStart<'_>) -> String {
  String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn element_attributes(e: &BytesStart<'_>) -> Result<BTreeMap<String, String>, ManifestError> {
  let mut attributes = BTreeMap::new();
  for attr in e.attributes() {
    let attr = attr.map_err(|err| ManifestError::Malformed(err.to_string()))?;
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    let value = attr
      .unescape_value()
      .map_err(|err| ManifestError::Malformed(err.to_string()))?
      .into_owned();
    attributes.insert(key, value);
  }
  Ok(attributes)
}

/// Walk the document and collect `Head/meta` and `Build/task` elements.
fn decode(text: &str) -> Result<(Vec<MetaEntry>, Vec<BuildTask>), ManifestError> {
  let mut reader = Reader::from_str(text);
  let mut stack: Vec<String> = Vec::new();
  let mut meta: Vec<MetaEntry> = Vec::new();
  let mut tasks = Vec::new();
  let mut heads = 0usize;
  let mut saw_root = false;

  loop {
    let (e, is_start) = match reader.read_event() {
      Ok(Event::Start(e)) => (e, true),
      Ok(Event::Empty(e)) => (e, false),
      Ok(Event::End(_)) => {
        stack.pop();
        continue;
      }
      Ok(Event::Eof) => break,
      Ok(_) => continue,
      Err(err) => {
        return Err(ManifestError::Malformed(format!(
          "{} at byte {}",
          err,
          reader.buffer_position()
        )));
      }
    };

    let name = element_name(&e);
    let path: Vec<&str> = stack.iter().map(String::as_str).collect();

    match (path.as_slice(), name.as_str()) {
      ([], root) => {
        if saw_root {
          return Err(ManifestError::Malformed("multiple root elements".to_string()));
        }
        if root != "Application" {
          return Err(ManifestError::Malformed(format!(
            "root element must be <Application>, found <{}>",
            root
          )));
        }
        saw_root = true;
      }
      (["Application"], "Head") => heads += 1,
      (["Application", "Head"], "meta") => {
        let attributes = element_attributes(&e)?;
        let entry_name = attributes.get("name").cloned().unwrap_or_default();
        meta.push(MetaEntry {
          name: entry_name,
          attributes,
          children: Vec::new(),
        });
      }
      (["Application", "Head", "meta"], _) => {
        let attributes = element_attributes(&e)?;
        if let Some(entry) = meta.last_mut() {
          entry.children.push(attributes);
        }
      }
      (["Application", "Build"], "task") => {
        let attributes = element_attributes(&e)?;
        let (Some(source), Some(destination)) = (attributes.get("source"), attributes.get("destination")) else {
          return Err(ManifestError::Malformed(
            "build task requires source and destination".to_string(),
          ));
        };
        tasks.push(BuildTask {
          source: PathBuf::from(source),
          destination: PathBuf::from(destination),
          action: TaskAction::parse(attributes.get("action").map(String::as_str)),
        });
      }
      _ => {}
    }

    if is_start {
      stack.push(name);
    }
  }

  if !saw_root {
    return Err(ManifestError::Malformed("document has no root element".to_string()));
  }
  match heads {
    1 => Ok((meta, tasks)),
    0 => Err(ManifestError::Malformed("missing <Head> block".to_string())),
    n => Err(ManifestError::Malformed(format!("expected one <Head> block, found {}", n))),
  }
}
