//! Seam to the media transport (the SFU client) and the device layer.
//!
//! The engine never touches audio frames. It drives the transport through
//! [`MediaTransport`] and learns about the room through the
//! [`TransportEvent`] stream returned by `connect`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use podium_common::Role;
use tokio::sync::mpsc;

use crate::mute::MuteError;

/// A playable or capturable audio track owned by the transport.
pub trait AudioTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    /// Release the underlying device or stream. Must be idempotent.
    fn stop(&self);
}

/// Shared handle to a track. The registry stops it when the owning
/// peer goes away.
pub type AudioHandle = Arc<dyn AudioTrack>;

/// The local microphone publication as the transport reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPublication {
    pub sid: String,
    pub muted: bool,
}

/// A remote participant's audio publication.
#[derive(Debug, Clone)]
pub struct RemoteAudioPublication {
    pub sid: String,
    pub muted: bool,
    pub subscribed: bool,
    pub track: Option<AudioHandle>,
}

/// Snapshot of one remote participant.
#[derive(Debug, Clone, Default)]
pub struct RemoteParticipant {
    pub identity: String,
    pub metadata: Option<String>,
    pub audio: Option<RemoteAudioPublication>,
}

impl RemoteParticipant {
    /// Role advertised in the participant's metadata, `Agree` when absent
    /// or unparseable.
    pub fn role(&self) -> Role {
        self.metadata
            .as_deref()
            .and_then(Role::from_metadata)
            .unwrap_or_default()
    }

    /// Muted unless an audio publication says otherwise.
    pub fn is_muted(&self) -> bool {
        self.audio.as_ref().map_or(true, |a| a.muted)
    }
}

/// Everything the transport reports asynchronously.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    Disconnected { reason: Option<String> },
    Reconnecting,
    Reconnected,
    ParticipantConnected { participant: RemoteParticipant },
    ParticipantDisconnected { identity: String },
    TrackPublished {
        participant: RemoteParticipant,
        publication: RemoteAudioPublication,
    },
    TrackSubscribed {
        participant: RemoteParticipant,
        publication: RemoteAudioPublication,
    },
    TrackUnsubscribed { identity: String },
    TrackMuted { identity: String },
    TrackUnmuted { identity: String },
    ParticipantMetadataChanged { participant: RemoteParticipant },
    LocalTrackPublished { publication: TrackPublication },
    LocalTrackUnpublished,
    /// The OS or browser revoked microphone access mid-session.
    LocalPermissionRevoked,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("not connected")]
    NotConnected,

    #[error("operation timed out")]
    Timeout,

    #[error("microphone permission denied")]
    PermissionDenied,
}

impl From<TransportError> for MuteError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::PermissionDenied => MuteError::PermissionDenied,
            TransportError::Timeout => MuteError::TransportTimeout,
            other => MuteError::Transport(other),
        }
    }
}

/// Client side of the media transport.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Join the media room. Events for this connection arrive on the
    /// returned channel until it closes.
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    /// Enable or disable the local microphone. Returns the resulting
    /// publication, or `None` when no track is published.
    async fn set_microphone_enabled(
        &self,
        enabled: bool,
    ) -> Result<Option<TrackPublication>, TransportError>;

    /// Current local microphone publication, if any.
    fn microphone_publication(&self) -> Option<TrackPublication>;

    async fn set_metadata(&self, metadata: String) -> Result<(), TransportError>;

    fn local_metadata(&self) -> Option<String>;

    fn remote_participants(&self) -> Vec<RemoteParticipant>;

    /// Stop every local track and its underlying capture stream.
    fn stop_local_tracks(&self);

    async fn disconnect(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("microphone permission denied")]
    Denied,

    #[error("microphone unavailable: {0}")]
    Unavailable(String),
}

/// Explicit microphone permission prompt.
#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    async fn request(&self) -> Result<(), PermissionError>;
}
