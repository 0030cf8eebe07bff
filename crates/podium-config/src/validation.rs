//! Configuration validation.
//!
//! Validates numeric ranges and endpoint URLs, collecting every violation.

use crate::schema::PodiumConfig;
use podium_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PodiumConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if config.api.base_url.trim().is_empty() {
        errors.push("api.base_url must not be empty".into());
    } else if let Err(e) = config.api.signaling_url("validate", "validate") {
        errors.push(e.to_string());
    }
    validate_range(&mut errors, "api.request_timeout_ms", config.api.request_timeout_ms, 500, 60_000);

    if !(config.media.ws_url.starts_with("ws://") || config.media.ws_url.starts_with("wss://")) {
        errors.push(format!(
            "media.ws_url = {:?} must start with ws:// or wss://",
            config.media.ws_url
        ));
    }

    // Signaling
    let s = &config.signaling;
    validate_range(&mut errors, "signaling.max_reconnect_attempts", s.max_reconnect_attempts, 0, 20);
    validate_range(&mut errors, "signaling.base_delay_ms", s.base_delay_ms, 100, 10_000);
    validate_range(&mut errors, "signaling.max_delay_ms", s.max_delay_ms, 1000, 120_000);
    validate_range(&mut errors, "signaling.connect_timeout_ms", s.connect_timeout_ms, 1000, 60_000);
    if s.base_delay_ms > s.max_delay_ms {
        errors.push(format!(
            "signaling.base_delay_ms ({}) exceeds signaling.max_delay_ms ({})",
            s.base_delay_ms, s.max_delay_ms
        ));
    }

    // Mute
    let m = &config.mute;
    validate_range(&mut errors, "mute.debounce_ms", m.debounce_ms, 0, 2000);
    validate_range(&mut errors, "mute.protection_window_ms", m.protection_window_ms, 0, 10_000);
    validate_range(&mut errors, "mute.safety_timeout_ms", m.safety_timeout_ms, 1000, 30_000);
    validate_range(&mut errors, "mute.verify_delay_ms", m.verify_delay_ms, 0, 2000);

    // Sync
    validate_range(&mut errors, "sync.settle_delay_ms", config.sync.settle_delay_ms, 0, 60_000);
    validate_range(&mut errors, "sync.interval_ms", config.sync.interval_ms, 250, 60_000);

    // Role
    let r = &config.role;
    validate_range(&mut errors, "role.update_timeout_ms", r.update_timeout_ms, 500, 10_000);
    validate_range(&mut errors, "role.initial_timeout_ms", r.initial_timeout_ms, 500, 30_000);
    validate_range(&mut errors, "role.initial_delay_ms", r.initial_delay_ms, 0, 5000);

    if config.logging.level.trim().is_empty() {
        errors.push("logging.level must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}
