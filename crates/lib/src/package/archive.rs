//! Container creation: icon metadata stamping and the `<id>.app` zip.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quick_xml::escape::escape;
use regex::Regex;
use tracing::debug;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::PackageError;

static SVG_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("valid svg pattern"));

/// Identity written into the packaged icon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconMetadata {
  pub namespace: String,
  pub id: String,
  pub name: String,
  pub author: String,
  pub version: String,
  /// Total byte size of the packaged files.
  pub size: u64,
  pub license: String,
  pub created: String,
}

impl IconMetadata {
  fn to_element(&self) -> String {
    format!(
      r#"<metadata><app namespace="{}" id="{}" name="{}" author="{}" version="{}" size="{}" license="{}" created="{}"/></metadata>"#,
      escape(self.namespace.as_str()),
      escape(self.id.as_str()),
      escape(self.name.as_str()),
      escape(self.author.as_str()),
      escape(self.version.as_str()),
      self.size,
      escape(self.license.as_str()),
      escape(self.created.as_str()),
    )
  }
}

/// Insert a `<metadata>` element right after the opening `<svg>` tag.
///
/// A self-closing `<svg/>` is opened up so it can hold the element. Text
/// without an `<svg>` tag is returned unchanged.
pub fn stamp_icon(svg: &str, metadata: &IconMetadata) -> String {
  let Some(open) = SVG_OPEN_RE.find(svg) else {
    return svg.to_string();
  };
  let tag = open.as_str();
  let element = metadata.to_element();
  let mut out = String::with_capacity(svg.len() + element.len() + 8);
  out.push_str(&svg[..open.start()]);
  if let Some(head) = tag.strip_suffix("/>") {
    out.push_str(head.trim_end());
    out.push('>');
    out.push_str(&element);
    out.push_str("</svg>");
  } else {
    out.push_str(tag);
    out.push_str(&element);
  }
  out.push_str(&svg[open.end()..]);
  out
}

/// Zip `files` (relative to `root`) into `container` with maximum deflate compression.
///
/// Entry names always use `/` separators. Returns the container's byte length.
pub fn write_container(root: &Path, files: &[PathBuf], container: &Path) -> Result<u64, PackageError> {
  let file = File::create(container).map_err(|e| PackageError::io(container, e))?;
  let mut writer = zip::ZipWriter::new(BufWriter::new(file));
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .compression_level(Some(9));

  for relative in files {
    let name = relative
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");
    writer.start_file(name.clone(), options)?;
    let path = root.join(relative);
    let mut source = File::open(&path).map_err(|e| PackageError::io(&path, e))?;
    std::io::copy(&mut source, &mut writer).map_err(|e| PackageError::io(&path, e))?;
    debug!(entry = %name, "archived");
  }

  let mut inner = writer.finish()?;
  inner.flush().map_err(|e| PackageError::io(container, e))?;
  drop(inner);

  let len = std::fs::metadata(container)
    .map_err(|e| PackageError::io(container, e))?
    .len();
  Ok(len)
}
