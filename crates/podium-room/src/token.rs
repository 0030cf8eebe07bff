//! Media access tokens from the backend REST API.

use std::time::Duration;

use async_trait::async_trait;
use podium_config::ApiConfig;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed token response: {0}")]
    Malformed(String),
}

/// Issues a short-lived media access token for `(room, user)`.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self, room_id: &str, user_id: &str) -> Result<String, TokenError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// `GET {base}/livekit-token?roomName=..&userId=..` returning `{"token": ".."}`.
pub struct HttpTokenSource {
    url: String,
    http: reqwest::Client,
}

impl HttpTokenSource {
    pub fn new(api: &ApiConfig) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_millis(u64::from(api.request_timeout_ms)))
            .build()?;
        Ok(Self {
            url: api.token_url(),
            http,
        })
    }

    pub(crate) fn build_request(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<reqwest::Request, TokenError> {
        Ok(self
            .http
            .get(&self.url)
            .query(&[("roomName", room_id), ("userId", user_id)])
            .build()?)
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch(&self, room_id: &str, user_id: &str) -> Result<String, TokenError> {
        let request = self.build_request(room_id, user_id)?;
        debug!(room_id, user_id, "requesting media token");

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(200).collect::<String>();
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        match parsed.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(TokenError::Malformed("missing token field".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_room_and_user() {
        let api = ApiConfig {
            base_url: "https://debates.example.com/api".into(),
            ..Default::default()
        };
        let source = HttpTokenSource::new(&api).unwrap();
        let request = source.build_request("room 7", "alice").unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/api/livekit-token");
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("roomName".to_string(), "room 7".to_string()),
                ("userId".to_string(), "alice".to_string()),
            ]
        );
    }

    #[test]
    fn token_response_tolerates_missing_field() {
        let parsed: TokenResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.token.is_none());
        let parsed: TokenResponse = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("abc"));
    }
}
