//! Configuration schema types for Podium.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod api;
mod logging;
mod room;
mod signaling;

pub use api::*;
pub use logging::*;
pub use room::*;
pub use signaling::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PodiumConfig {
    pub api: ApiConfig,
    pub media: MediaConfig,
    pub signaling: SignalingConfig,
    pub mute: MuteConfig,
    pub sync: SyncConfig,
    pub role: RoleConfig,
    pub logging: LoggingConfig,
}
