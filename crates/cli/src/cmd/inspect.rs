//! Implementation of the `antbuild inspect` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use antbuild_lib::manifest::Manifest;

use crate::output::{print_info, print_item, print_json, print_stat, print_warning};

/// Section labels and the meta keys that declare them, first match wins.
const SECTIONS: &[(&str, &[(&str, Option<&str>)])] = &[
  ("script", &[("script", None)]),
  ("toolbar", &[("toolbar-style", None), ("style", Some("toolbar"))]),
  ("body", &[("style", None)]),
  ("statusbar", &[("statusbar-style", None), ("style", Some("statusbar"))]),
  ("dialog", &[("dialog-style", None), ("style", Some("dialog"))]),
  ("xsl", &[("xsl", None)]),
  ("content", &[("content", None)]),
  ("icons", &[("icons", None)]),
];

/// Execute the inspect command.
///
/// Reads the manifest only; nothing is compiled or written.
pub fn cmd_inspect(source: &Path, json: bool) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let manifest = rt.block_on(Manifest::read(source)).context("Failed to read manifest")?;
  let scope = manifest.scope().context("Invalid manifest")?;

  let sections: Vec<(&str, std::path::PathBuf, bool)> = SECTIONS
    .iter()
    .filter_map(|(label, keys)| {
      let path = keys.iter().find_map(|(name, attr)| manifest.source_path(name, *attr))?;
      let exists = path.exists();
      Some((*label, path, exists))
    })
    .collect();

  if json {
    let value = json!({
      "id": scope.id,
      "namespace": scope.namespace,
      "headless": scope.headless,
      "title": manifest.title(),
      "version": manifest.version(),
      "sections": sections
        .iter()
        .map(|(label, path, exists)| json!({ "section": label, "path": path, "exists": exists }))
        .collect::<Vec<_>>(),
      "tasks": manifest.tasks(),
      "requires": manifest.run_requires(),
    });
    return print_json(&value);
  }

  print_info(&format!("{}/{}", scope.namespace, scope.id));
  if let Some(title) = manifest.title() {
    print_stat("Title", title);
  }
  if let Some(version) = manifest.version() {
    print_stat("Version", version);
  }
  print_stat("Asset root", &scope.asset_root());
  if scope.headless {
    print_stat("Headless", "yes");
  }

  println!();
  println!("Sections:");
  if sections.is_empty() {
    println!("  (none)");
  }
  for (label, path, exists) in &sections {
    if *exists {
      print_item(format!("{}: {}", label, path.display()));
    } else {
      print_warning(&format!("{} source missing, will be omitted: {}", label, path.display()));
    }
  }

  let tasks = manifest.tasks();
  if !tasks.is_empty() {
    println!();
    println!("Tasks:");
    for task in tasks {
      print_item(format!(
        "{} -> {} ({:?})",
        task.source.display(),
        task.destination.display(),
        task.action
      ));
    }
  }
  Ok(())
}
