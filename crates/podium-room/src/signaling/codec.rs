//! Normalizes raw socket payloads into [`SignalingMessage`]s.

use serde_json::Value;
use tracing::{debug, warn};

use super::types::{kinds, Payload, SignalingError, SignalingMessage};

/// Decode an inbound payload.
///
/// Text that is not JSON becomes a `text` message carrying the raw
/// content. Anything else that fails to decode is logged and dropped.
pub fn decode(payload: Payload) -> Option<SignalingMessage> {
    let kind = payload.kind();
    match payload {
        Payload::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(value) => from_value(value, kind),
            Err(_) => {
                debug!(len = text.len(), "non-JSON text payload, wrapping as text message");
                Some(SignalingMessage::new(kinds::TEXT).with("content", text))
            }
        },
        Payload::Binary(bytes) | Payload::Framed(bytes) => {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => from_value(value, kind),
                Err(e) => {
                    warn!(kind, len = bytes.len(), error = %e, "dropping undecodable payload");
                    None
                }
            }
        }
    }
}

fn from_value(value: Value, kind: &str) -> Option<SignalingMessage> {
    match serde_json::from_value::<SignalingMessage>(value) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(kind, error = %e, "dropping malformed signaling message");
            None
        }
    }
}

pub fn encode(message: &SignalingMessage) -> Result<String, SignalingError> {
    Ok(serde_json::to_string(message)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_json_decodes() {
        let msg = decode(Payload::Text(r#"{"type":"user-joined","userId":"u1"}"#.into())).unwrap();
        assert_eq!(msg.kind, "user-joined");
        assert_eq!(msg.str_field("userId"), Some("u1"));
    }

    #[test]
    fn binary_and_framed_json_decode() {
        let raw = br#"{"type":"debate:participants_updated","participants":[]}"#.to_vec();
        assert_eq!(
            decode(Payload::Binary(raw.clone())).unwrap().kind,
            "debate:participants_updated"
        );
        assert_eq!(
            decode(Payload::Framed(raw)).unwrap().kind,
            "debate:participants_updated"
        );
    }

    #[test]
    fn plain_text_falls_back_to_text_message() {
        let msg = decode(Payload::Text("hello room".into())).unwrap();
        assert_eq!(msg.kind, "text");
        assert_eq!(msg.str_field("content"), Some("hello room"));
    }

    #[test]
    fn garbage_binary_is_dropped() {
        assert!(decode(Payload::Binary(vec![0xff, 0x00, 0x13])).is_none());
        assert!(decode(Payload::Framed(b"not json".to_vec())).is_none());
    }

    #[test]
    fn json_without_type_is_dropped() {
        assert!(decode(Payload::Text(r#"{"userId":"u1"}"#.into())).is_none());
        assert!(decode(Payload::Text("42".into())).is_none());
    }

    #[test]
    fn encode_flattens_fields() {
        let text = encode(&SignalingMessage::new("ping").with("n", 3)).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"type": "ping", "n": 3}));
    }
}
