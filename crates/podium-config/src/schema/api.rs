//! REST and media endpoint configuration.

use podium_common::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. `https://example.com/api`.
    pub base_url: String,
    /// Path (relative to `base_url`) that issues media access tokens.
    pub token_path: String,
    pub request_timeout_ms: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".into(),
            token_path: "/livekit-token".into(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    /// Signaling endpoint for a `(room, user)` pair.
    ///
    /// `http` maps to `ws` and `https` to `wss`. A base without a scheme
    /// is treated as `http`. The socket always lives at `/api/ws`.
    pub fn signaling_url(&self, room_id: &str, user_id: &str) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| ConfigError::ParseError(format!("invalid api.base_url: {e}")))?;
        let ws_scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(ws_scheme)
            .map_err(|_| ConfigError::ParseError("cannot derive websocket scheme".into()))?;

        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/api/ws"));
        url.query_pairs_mut()
            .clear()
            .append_pair("roomId", room_id)
            .append_pair("userId", user_id);
        Ok(url)
    }

    /// Full URL of the token endpoint.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token_path.trim_start_matches('/')
        )
    }
}

/// Media transport endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ws_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:7880".into(),
        }
    }
}
