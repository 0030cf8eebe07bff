//! Podium configuration system.
//!
//! TOML-based configuration for the audio-room engine. All sections use
//! sensible defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use podium_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! let url = config.api.signaling_url("room-1", "user-1").unwrap();
//! println!("{url}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ApiConfig, LoggingConfig, MediaConfig, MuteConfig, PodiumConfig, RoleConfig,
    SignalingConfig, SyncConfig, CONFIG_SCHEMA_VERSION,
};

use podium_common::ConfigError;

/// Convenience function to load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, and validates the result.
pub fn load_config() -> Result<PodiumConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &PodiumConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
