//! Content hashing for build artifacts.
//!
//! `BuildResult::digest` is the SHA-256 of the primary artifact: `index.xml`
//! for directory builds, `<id>.app` for compressed builds.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA-256 hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn hash_bytes_known_value() {
    assert_eq!(
      hash_bytes(b"").0,
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }

  #[test]
  fn file_and_bytes_agree() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("index.xml");
    let data = vec![b'x'; 20_000];
    fs::write(&path, &data).unwrap();
    assert_eq!(hash_file(&path).unwrap(), hash_bytes(&data));
  }

  #[test]
  fn missing_file_is_error() {
    let temp = tempdir().unwrap();
    assert!(hash_file(&temp.path().join("nope")).is_err());
  }
}
