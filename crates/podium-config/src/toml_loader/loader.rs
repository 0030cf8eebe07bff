//! Reading `config.toml` into a [`PodiumConfig`].

use std::path::Path;

use podium_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::PodiumConfig;
use crate::validation;

/// Parse TOML text. Missing keys take their serde defaults.
pub fn parse_config(content: &str) -> Result<PodiumConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("invalid TOML: {e}")))
}

/// Load the config at `path`.
///
/// A file that parses but fails validation is replaced by the defaults,
/// with a warning, so a bad timing value never stops the engine.
pub fn load_from_path(path: &Path) -> Result<PodiumConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    let config = parse_config(&content)?;
    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
        return Ok(PodiumConfig::default());
    }

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load from [`default_config_path`], writing the default file first if
/// there is none.
pub fn load_default() -> Result<PodiumConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "No config found, creating default");
            create_default_config(&path)?;
            Ok(PodiumConfig::default())
        }
        other => other,
    }
}
