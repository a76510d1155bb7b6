//! CLI smoke tests for antbuild.
//!
//! These tests run the binary against small application trees and check exit
//! codes and the shape of the output.

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Get a Command for the antbuild binary, isolated from the user's toolchain file.
fn antbuild_cmd(home: &Path) -> Command {
  let mut cmd = cargo_bin_cmd!("antbuild");
  cmd
    .env_remove("ANTBUILD_TOOLCHAIN")
    .env("HOME", home)
    .env("XDG_CONFIG_HOME", home.join(".config"))
    .env("RUST_LOG", "warn");
  cmd
}

fn write_file(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Application>
	<Head>
		<meta name="id" value="demo"/>
		<meta name="title" value="Demo" version="0.3.1"/>
		<meta name="author" value="Jane" namespace="acme"/>
		<meta name="script" value="app.js"/>
		<meta name="style" value="app.css"/>
	</Head>
	<Build>
		<task source="src/worker.js" destination="public/worker.js"/>
	</Build>
</Application>"#;

/// Application tree with a script, a style, a task and a public asset.
fn demo_app() -> TempDir {
  let temp = TempDir::new().unwrap();
  let root = temp.path();
  write_file(root, "index.xml", MANIFEST);
  write_file(root, "app.js", "load(\"~/data.json\");\n");
  write_file(root, "app.css", ".title { color: red; }\n");
  write_file(root, "src/worker.js", "postMessage(1);\n");
  write_file(root, "public/icon.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>");
  temp
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let home = TempDir::new().unwrap();
  antbuild_cmd(home.path())
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"))
    .stdout(predicate::str::contains("build"))
    .stdout(predicate::str::contains("inspect"));
}

#[test]
fn version_flag_works() {
  let home = TempDir::new().unwrap();
  antbuild_cmd(home.path())
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("antbuild"));
}

#[test]
fn build_requires_arguments() {
  let home = TempDir::new().unwrap();
  antbuild_cmd(home.path()).arg("build").assert().failure();
}

// =============================================================================
// Build
// =============================================================================

#[test]
#[serial]
fn build_writes_directory_output() {
  let home = TempDir::new().unwrap();
  let app = demo_app();
  let out = TempDir::new().unwrap();
  let dest = out.path().join("dist");

  antbuild_cmd(home.path())
    .arg("build")
    .arg(app.path())
    .arg(&dest)
    .assert()
    .success()
    .stdout(predicate::str::contains("Built Demo 0.3.1 (acme/demo)"));

  let index = std::fs::read_to_string(dest.join("index.xml")).unwrap();
  assert!(index.contains("/app/acme/demo/data.json"));
  assert!(index.contains(r#".acme-window_[data-id="demo"] .window-body_"#));
  assert!(dest.join("icon.svg").exists());
  assert!(dest.join("worker.js").exists());
  // tasks write into the source tree
  assert!(app.path().join("public/worker.js").exists());
}

#[test]
#[serial]
fn build_json_reports_result() {
  let home = TempDir::new().unwrap();
  let app = demo_app();
  let out = TempDir::new().unwrap();
  let dest = out.path().join("dist");

  let output = antbuild_cmd(home.path())
    .arg("build")
    .arg(app.path())
    .arg(&dest)
    .args(["--uglify", "--compress", "--json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["id"], "demo");
  assert_eq!(result["namespace"], "acme");
  assert_eq!(result["uglified"], true);
  assert!(result["container"].as_str().unwrap().ends_with("demo.app"));
  assert!(dest.join("demo.app").exists());
  assert!(!dest.join("index.xml").exists());
}

#[test]
#[serial]
fn build_fails_without_manifest() {
  let home = TempDir::new().unwrap();
  let app = TempDir::new().unwrap();
  let out = TempDir::new().unwrap();

  antbuild_cmd(home.path())
    .arg("build")
    .arg(app.path())
    .arg(out.path().join("dist"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("manifest not found"));
}

#[test]
#[serial]
fn build_fails_with_missing_toolchain_file() {
  let home = TempDir::new().unwrap();
  let app = demo_app();
  let out = TempDir::new().unwrap();

  antbuild_cmd(home.path())
    .arg("build")
    .arg(app.path())
    .arg(out.path().join("dist"))
    .arg("--toolchain")
    .arg(home.path().join("nope.toml"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("toolchain"));
}

// =============================================================================
// Inspect
// =============================================================================

#[test]
#[serial]
fn inspect_lists_sections_and_tasks() {
  let home = TempDir::new().unwrap();
  let app = demo_app();

  antbuild_cmd(home.path())
    .arg("inspect")
    .arg(app.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("acme/demo"))
    .stdout(predicate::str::contains("script"))
    .stdout(predicate::str::contains("src/worker.js"));
}

#[test]
#[serial]
fn inspect_warns_about_missing_sources() {
  let home = TempDir::new().unwrap();
  let app = demo_app();
  std::fs::remove_file(app.path().join("app.css")).unwrap();

  antbuild_cmd(home.path())
    .arg("inspect")
    .arg(app.path())
    .assert()
    .success()
    .stderr(predicate::str::contains("body source missing"));
}

#[test]
#[serial]
fn inspect_json_is_valid() {
  let home = TempDir::new().unwrap();
  let app = demo_app();

  let output = antbuild_cmd(home.path())
    .args(["inspect", "--json"])
    .arg(app.path())
    .output()
    .unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value["id"], "demo");
  assert_eq!(value["tasks"][0]["action"], "none");
  assert_eq!(value["sections"].as_array().unwrap().len(), 2);
}
