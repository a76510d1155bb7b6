//! Test fixtures shared by the unit tests.

use std::path::Path;

/// Returns the shell binary and args that run `script`.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Write `(relative path, contents)` pairs under `root`, creating parents.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
  for (rel, contents) in files {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
  }
}
