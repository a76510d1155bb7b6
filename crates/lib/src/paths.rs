//! Well-known locations for user configuration.

use std::path::PathBuf;

use crate::consts::APP_NAME;

/// Environment variable naming an explicit toolchain file.
pub const TOOLCHAIN_ENV: &str = "ANTBUILD_TOOLCHAIN";

/// Returns the user's home directory, if known.
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE").map(PathBuf::from)
}

/// Returns the user's home directory, if known.
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> Option<PathBuf> {
  std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join(APP_NAME))
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> Option<PathBuf> {
  let config_home = std::env::var_os("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|home| home.join(".config")))?;
  Some(config_home.join(APP_NAME))
}

/// Default location of the toolchain file.
pub fn default_toolchain_file() -> Option<PathBuf> {
  config_dir().map(|dir| dir.join("toolchain.toml"))
}
