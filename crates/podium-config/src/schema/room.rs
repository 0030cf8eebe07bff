//! Audio-room timing configuration: mute arbitration, reconciliation
//! sweep, and role metadata sync.

use serde::{Deserialize, Serialize};

/// Local microphone toggle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MuteConfig {
    /// Minimum gap between the end of one toggle and the start of the next.
    pub debounce_ms: u32,
    /// How long transport echoes of a toggle are ignored.
    pub protection_window_ms: u32,
    /// Hard ceiling on a single toggle.
    pub safety_timeout_ms: u32,
    /// Pause before reading back the transport's mute flag.
    pub verify_delay_ms: u32,
}

impl Default for MuteConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            protection_window_ms: 1500,
            safety_timeout_ms: 5000,
            verify_delay_ms: 300,
        }
    }
}

/// Periodic mute reconciliation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub settle_delay_ms: u32,
    pub interval_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 5000,
            interval_ms: 2000,
        }
    }
}

/// Role metadata propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub update_timeout_ms: u32,
    pub initial_timeout_ms: u32,
    pub initial_delay_ms: u32,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            update_timeout_ms: 2000,
            initial_timeout_ms: 5000,
            initial_delay_ms: 300,
        }
    }
}
