//! Logging configuration types.

use serde::{Deserialize, Serialize};

/// Fallback log filter used when `RUST_LOG` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
