//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Podium Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[api]
base_url = "http://localhost:8080/api"
# token_path = "/livekit-token"
# request_timeout_ms = 10000   # 500-60000

[media]
# ws_url = "ws://localhost:7880"

[signaling]
# max_reconnect_attempts = 5   # 0-20
# base_delay_ms = 1000         # 100-10000
# max_delay_ms = 10000         # 1000-120000
# connect_timeout_ms = 15000   # 1000-60000

[mute]
# debounce_ms = 200            # 0-2000
# protection_window_ms = 1500  # 0-10000
# safety_timeout_ms = 5000     # 1000-30000
# verify_delay_ms = 300        # 0-2000

[sync]
# settle_delay_ms = 5000       # 0-60000
# interval_ms = 2000           # 250-60000

[role]
# update_timeout_ms = 2000     # 500-10000
# initial_timeout_ms = 5000    # 500-30000
# initial_delay_ms = 300       # 0-5000

[logging]
# level = "info"
"##
    .to_string()
}
