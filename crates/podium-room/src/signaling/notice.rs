//! Typed view of the room notices the backend broadcasts.

use serde_json::Value;

use super::types::{kinds, SignalingMessage};

/// Room status that ends the session for everyone.
pub const STATUS_ENDED: &str = "ENDED";

#[derive(Debug, Clone, PartialEq)]
pub enum RoomNotice {
    /// The membership list changed. Entries are passed through untouched.
    ParticipantsUpdated { participants: Vec<Value> },
    StatusChanged {
        room_id: Option<String>,
        status: String,
        old_status: Option<String>,
    },
    UserJoined { user_id: String },
    UserLeft { user_id: String },
    Text { content: String },
    /// Anything this client does not interpret.
    Other { kind: String },
}

impl RoomNotice {
    pub fn from_message(message: &SignalingMessage) -> Self {
        let owned = |key: &str| message.str_field(key).map(str::to_string);
        match message.kind.as_str() {
            kinds::PARTICIPANTS_UPDATED => RoomNotice::ParticipantsUpdated {
                participants: message
                    .get("participants")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
            kinds::STATUS_CHANGED => match owned("status") {
                Some(status) => RoomNotice::StatusChanged {
                    room_id: owned("debateId"),
                    status,
                    old_status: owned("oldStatus"),
                },
                None => RoomNotice::Other {
                    kind: message.kind.clone(),
                },
            },
            kinds::USER_JOINED | kinds::USER_LEFT => match owned("userId") {
                Some(user_id) if message.kind == kinds::USER_JOINED => {
                    RoomNotice::UserJoined { user_id }
                }
                Some(user_id) => RoomNotice::UserLeft { user_id },
                None => RoomNotice::Other {
                    kind: message.kind.clone(),
                },
            },
            kinds::TEXT => RoomNotice::Text {
                content: owned("content").unwrap_or_default(),
            },
            other => RoomNotice::Other {
                kind: other.to_string(),
            },
        }
    }

    /// The room was closed by its host.
    pub fn is_room_ended(&self) -> bool {
        matches!(self, RoomNotice::StatusChanged { status, .. } if status == STATUS_ENDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::codec::decode;
    use crate::signaling::types::Payload;

    fn notice(raw: &str) -> RoomNotice {
        RoomNotice::from_message(&decode(Payload::Text(raw.into())).unwrap())
    }

    #[test]
    fn status_changed_to_ended() {
        let n = notice(r#"{"type":"debate:status_changed","debateId":"d1","status":"ENDED","oldStatus":"LIVE"}"#);
        assert!(n.is_room_ended());
        assert_eq!(
            n,
            RoomNotice::StatusChanged {
                room_id: Some("d1".into()),
                status: "ENDED".into(),
                old_status: Some("LIVE".into()),
            }
        );
    }

    #[test]
    fn status_change_to_live_is_not_end() {
        assert!(!notice(r#"{"type":"debate:status_changed","status":"LIVE"}"#).is_room_ended());
    }

    #[test]
    fn participants_and_joins() {
        match notice(r#"{"type":"debate:participants_updated","participants":[{"userId":"a"},{"userId":"b"}]}"#) {
            RoomNotice::ParticipantsUpdated { participants } => assert_eq!(participants.len(), 2),
            other => panic!("unexpected notice: {other:?}"),
        }
        assert_eq!(
            notice(r#"{"type":"user-joined","userId":"u9","side":"agree"}"#),
            RoomNotice::UserJoined { user_id: "u9".into() }
        );
        assert_eq!(
            notice(r#"{"type":"user-left","userId":"u9"}"#),
            RoomNotice::UserLeft { user_id: "u9".into() }
        );
    }

    #[test]
    fn missing_fields_degrade_to_other() {
        assert_eq!(
            notice(r#"{"type":"user-joined"}"#),
            RoomNotice::Other { kind: "user-joined".into() }
        );
        assert_eq!(
            notice(r#"{"type":"future:thing","x":1}"#),
            RoomNotice::Other { kind: "future:thing".into() }
        );
    }

    #[test]
    fn text_fallback_notice() {
        assert_eq!(
            notice("plain words"),
            RoomNotice::Text { content: "plain words".into() }
        );
    }
}
