//! Message envelope, connection status, and socket-level types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Message Envelope
// ---------------------------------------------------------------------------

/// A signaling message: a JSON object with a `type` field. Unknown fields
/// are preserved in `fields` so producers can add data freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SignalingMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Announce presence in the room.
    pub fn join_room() -> Self {
        Self::new(kinds::JOIN_ROOM)
    }

    pub fn leave_room() -> Self {
        Self::new(kinds::LEAVE_ROOM)
    }

    /// Tell the room about the local user's own mute intent.
    pub fn self_mute_change(muted: bool) -> Self {
        Self::new(kinds::SELF_MUTE_CHANGE).with("isSelfMuted", muted)
    }

    /// Host-side mute of another participant.
    pub fn host_mute_change(target_user_id: &str, muted: bool) -> Self {
        Self::new(kinds::MUTE_CHANGE)
            .with("targetUserId", target_user_id)
            .with("isMutedByHost", muted)
    }
}

/// Wire names of the message types exchanged with the room backend.
pub mod kinds {
    pub const JOIN_ROOM: &str = "debate:join_room";
    pub const LEAVE_ROOM: &str = "debate:leave_room";
    pub const SELF_MUTE_CHANGE: &str = "debate:self_mute_change";
    pub const MUTE_CHANGE: &str = "debate:mute_change";
    pub const PARTICIPANTS_UPDATED: &str = "debate:participants_updated";
    pub const STATUS_CHANGED: &str = "debate:status_changed";
    pub const USER_JOINED: &str = "user-joined";
    pub const USER_LEFT: &str = "user-left";
    /// Synthesized for text payloads that are not JSON.
    pub const TEXT: &str = "text";
}

// ---------------------------------------------------------------------------
// Connection Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalingState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts ran out. Stays here until the next `connect()`.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalingStatus {
    pub state: SignalingState,
    pub reconnect_attempt: u32,
    pub max_attempts: u32,
}

impl SignalingStatus {
    pub fn is_connected(&self) -> bool {
        self.state == SignalingState::Connected
    }
}

// ---------------------------------------------------------------------------
// Socket Events
// ---------------------------------------------------------------------------

/// A raw inbound payload before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
    /// A raw frame delivered without message reassembly.
    Framed(Vec<u8>),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Binary(_) => "binary",
            Payload::Framed(_) => "framed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Payload(Payload),
    Closed { code: u16, was_clean: bool },
}

pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const ABNORMAL: u16 = 1006;
    pub const POLICY_VIOLATION: u16 = 1008;
}

/// Whether a close with `code` should schedule a reconnect.
pub fn should_reconnect(code: u16, was_clean: bool) -> bool {
    match code {
        close_code::NORMAL | close_code::POLICY_VIOLATION => false,
        close_code::GOING_AWAY => !was_clean,
        _ => true,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignalingError {
    #[error("signaling channel is not connected")]
    NotConnected,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("signaling channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_code_policy() {
        assert!(!should_reconnect(1000, true));
        assert!(!should_reconnect(1000, false));
        assert!(!should_reconnect(1008, false));
        assert!(should_reconnect(1001, false));
        assert!(!should_reconnect(1001, true));
        assert!(should_reconnect(1006, false));
        assert!(should_reconnect(1011, true));
        assert!(should_reconnect(4000, true));
    }

    #[test]
    fn message_keeps_unknown_fields() {
        let msg: SignalingMessage =
            serde_json::from_str(r#"{"type":"user-joined","userId":"u1","side":"agree"}"#)
                .unwrap();
        assert_eq!(msg.kind, "user-joined");
        assert_eq!(msg.str_field("userId"), Some("u1"));
        assert_eq!(msg.str_field("side"), Some("agree"));
    }

    #[test]
    fn message_without_type_is_rejected() {
        assert!(serde_json::from_str::<SignalingMessage>(r#"{"userId":"u1"}"#).is_err());
    }

    #[test]
    fn outbound_builders_use_backend_field_names() {
        let json = serde_json::to_value(SignalingMessage::self_mute_change(true)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "debate:self_mute_change", "isSelfMuted": true})
        );

        let json = serde_json::to_value(SignalingMessage::host_mute_change("u2", false)).unwrap();
        assert_eq!(json["targetUserId"], "u2");
        assert_eq!(json["isMutedByHost"], false);
    }
}
