//! Where the config file lives, and writing the commented default.

use std::path::{Path, PathBuf};

use podium_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "PODIUM_CONFIG";

/// `$PODIUM_CONFIG` when set and non-empty, else
/// `<config dir>/podium/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("podium").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the documented default config to `path`, creating parent dirs.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_err = |what: &str, target: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {what} {}: {e}", target.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err("create", parent, e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_err("write", path, e))?;

    info!(path = %path.display(), "Wrote default config");
    Ok(())
}
