//! Signaling channel configuration types.

use serde::{Deserialize, Serialize};

/// Reconnect policy for the event-notification socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub max_reconnect_attempts: u32,
    pub base_delay_ms: u32,
    pub max_delay_ms: u32,
    pub connect_timeout_ms: u32,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            connect_timeout_ms: 15_000,
        }
    }
}
