//! Fixed names and limits shared across the build pipeline.

pub const APP_NAME: &str = "antbuild";

/// Manifest file at the root of every application source tree.
pub const MANIFEST_FILE: &str = "index.xml";

/// Directory whose contents become the installed asset root (`~/`).
pub const PUBLIC_DIR: &str = "public";

pub const ICON_FILE: &str = "icon.svg";
pub const LICENSE_FILE: &str = "LICENSE";

/// Extension of the compressed container (`<id>.app`).
pub const CONTAINER_EXT: &str = "app";

/// Namespace used when the manifest's `author` entry carries none.
pub const DEFAULT_NAMESPACE: &str = "ant";

/// Public assets larger than this are not copied unless re-admitted.
pub const MAX_ASSET_SIZE: u64 = 5 * 1024 * 1024;

/// Public asset extensions left out of a build unless `build@include` lists them.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &["less", "map", "psd", "ai", "sketch", "xcf", "zip", "app"];

/// Root element attribute carrying the build timestamp.
pub const BUILT_ATTR: &str = "built";
