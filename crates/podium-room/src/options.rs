//! Runtime tuning for the engine, built from `podium-config` sections.

use std::time::Duration;

use podium_config::{MuteConfig, PodiumConfig, RoleConfig, SignalingConfig, SyncConfig};

fn ms(value: u32) -> Duration {
    Duration::from_millis(u64::from(value))
}

/// Reconnect policy for the signaling channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingOptions {
    pub max_reconnect_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for SignalingOptions {
    fn default() -> Self {
        Self::from(&SignalingConfig::default())
    }
}

impl From<&SignalingConfig> for SignalingOptions {
    fn from(config: &SignalingConfig) -> Self {
        Self {
            max_reconnect_attempts: config.max_reconnect_attempts,
            base_delay: ms(config.base_delay_ms),
            max_delay: ms(config.max_delay_ms),
            connect_timeout: ms(config.connect_timeout_ms),
        }
    }
}

impl SignalingOptions {
    /// Delay before reconnect attempt `attempt` (1-based):
    /// `min(base * 2^attempt, max)`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Timing for local microphone toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteOptions {
    pub debounce: Duration,
    pub protection_window: Duration,
    pub safety_timeout: Duration,
    pub verify_delay: Duration,
}

impl Default for MuteOptions {
    fn default() -> Self {
        Self::from(&MuteConfig::default())
    }
}

impl From<&MuteConfig> for MuteOptions {
    fn from(config: &MuteConfig) -> Self {
        Self {
            debounce: ms(config.debounce_ms),
            protection_window: ms(config.protection_window_ms),
            safety_timeout: ms(config.safety_timeout_ms),
            verify_delay: ms(config.verify_delay_ms),
        }
    }
}

/// Reconciliation sweep schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub settle_delay: Duration,
    pub interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            settle_delay: ms(config.settle_delay_ms),
            interval: ms(config.interval_ms),
        }
    }
}

/// Role metadata propagation limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSyncOptions {
    pub update_timeout: Duration,
    pub initial_timeout: Duration,
    pub initial_delay: Duration,
}

impl Default for RoleSyncOptions {
    fn default() -> Self {
        Self::from(&RoleConfig::default())
    }
}

impl From<&RoleConfig> for RoleSyncOptions {
    fn from(config: &RoleConfig) -> Self {
        Self {
            update_timeout: ms(config.update_timeout_ms),
            initial_timeout: ms(config.initial_timeout_ms),
            initial_delay: ms(config.initial_delay_ms),
        }
    }
}

/// Everything a media session needs, bundled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomOptions {
    pub mute: MuteOptions,
    pub sync: SyncOptions,
    pub role: RoleSyncOptions,
}

impl From<&PodiumConfig> for RoomOptions {
    fn from(config: &PodiumConfig) -> Self {
        Self {
            mute: MuteOptions::from(&config.mute),
            sync: SyncOptions::from(&config.sync),
            role: RoleSyncOptions::from(&config.role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delays_double_then_cap() {
        let opts = SignalingOptions::default();
        let delays: Vec<u64> = (1..=5)
            .map(|n| opts.reconnect_delay(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![2000, 4000, 8000, 10_000, 10_000]);
    }

    #[test]
    fn reconnect_delay_never_overflows() {
        let opts = SignalingOptions::default();
        assert_eq!(opts.reconnect_delay(64), Duration::from_secs(10));
    }

    #[test]
    fn defaults_match_config_defaults() {
        let mute = MuteOptions::default();
        assert_eq!(mute.debounce, Duration::from_millis(200));
        assert_eq!(mute.protection_window, Duration::from_millis(1500));
        assert_eq!(mute.safety_timeout, Duration::from_secs(5));

        let sync = SyncOptions::default();
        assert_eq!(sync.settle_delay, Duration::from_secs(5));
        assert_eq!(sync.interval, Duration::from_secs(2));

        let role = RoleSyncOptions::default();
        assert_eq!(role.update_timeout, Duration::from_secs(2));
        assert_eq!(role.initial_timeout, Duration::from_secs(5));
    }

    #[test]
    fn room_options_follow_loaded_config() {
        let mut config = PodiumConfig::default();
        config.mute.debounce_ms = 50;
        config.sync.interval_ms = 500;
        let opts = RoomOptions::from(&config);
        assert_eq!(opts.mute.debounce, Duration::from_millis(50));
        assert_eq!(opts.sync.interval, Duration::from_millis(500));
    }
}
