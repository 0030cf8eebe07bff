//! Live audio-room synchronization engine.
//!
//! Keeps three independently updating sources of truth consistent: the
//! local user's microphone intent, the media transport's reported track
//! state, and the roster of remote peers. A reconnecting signaling
//! channel runs alongside for out-of-band room events.
//!
//! The media transport itself (codecs, routing, capture) is an external
//! collaborator reached through [`MediaTransport`].

pub mod mute;
pub mod options;
pub mod peers;
pub mod role_sync;
pub mod session;
pub mod signaling;
pub mod token;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use mute::{MuteError, MuteStateController, PassiveOutcome, SkipReason, ToggleOutcome};
pub use options::{MuteOptions, RoleSyncOptions, RoomOptions, SignalingOptions, SyncOptions};
pub use peers::{Peer, PeerRegistry, PeerUpdate};
pub use podium_common::Role;
pub use role_sync::{RoleMetadataSync, RoleSyncOutcome};
pub use session::{ConnectionState, JoinOutcome, MediaSessionManager, SessionError, SessionParams};
pub use signaling::{
    RoomNotice, SignalingClient, SignalingError, SignalingMessage, SignalingState,
    SignalingStatus, WsConnector,
};
pub use token::{HttpTokenSource, TokenError, TokenSource};
pub use transport::{
    AudioHandle, AudioTrack, MediaTransport, MicrophoneAccess, PermissionError,
    RemoteAudioPublication, RemoteParticipant, TrackPublication, TransportError, TransportEvent,
};
