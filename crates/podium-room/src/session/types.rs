//! Session lifecycle types.

use podium_common::Role;

use crate::token::TokenError;
use crate::transport::TransportError;

/// Lifecycle of the media transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Who is joining which room, in which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub room_id: String,
    pub user_id: String,
    pub role: Role,
}

impl SessionParams {
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            role,
        }
    }

    /// Same room and same user, regardless of role.
    pub fn same_seat(&self, other: &SessionParams) -> bool {
        self.room_id == other.room_id && self.user_id == other.user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new transport session was established.
    Connected,
    /// Only the role changed; metadata was updated in place.
    RoleUpdated,
    AlreadyJoined,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token fetch failed: {0}")]
    Token(#[from] TokenError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("room was left while joining")]
    Left,

    #[error("not joined to a room")]
    NotJoined,
}
