//! Per-session event handling shared by the event loop and the sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};

use super::dispatch::{apply_peer_event, route, EventRoute};
use super::types::ConnectionState;
use crate::mute::MuteStateController;
use crate::peers::PeerRegistry;
use crate::role_sync::RoleMetadataSync;
use crate::transport::{MediaTransport, TransportEvent};

/// Handles owned by one joined session.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) transport: Arc<dyn MediaTransport>,
    pub(crate) peers: Arc<RwLock<PeerRegistry>>,
    pub(crate) mute: Arc<MuteStateController>,
    pub(crate) role_sync: Arc<RoleMetadataSync>,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
    /// Set once on intentional leave. Terminal for this session.
    pub(crate) left: Arc<AtomicBool>,
    pub(crate) local_identity: String,
}

impl SessionContext {
    pub(crate) fn has_left(&self) -> bool {
        self.left.load(Ordering::Acquire)
    }

    pub(crate) fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Fill the roster from the transport's current participants.
    pub(crate) async fn hydrate_peers(&self) -> usize {
        let remotes = self.transport.remote_participants();
        let mut peers = self.peers.write().await;
        remotes
            .iter()
            .filter(|p| p.identity != self.local_identity)
            .filter(|p| peers.hydrate_participant(p))
            .count()
    }

    pub(crate) async fn handle_event(&self, event: TransportEvent) {
        if self.has_left() {
            debug!(?event, "Session left, ignoring transport event");
            return;
        }

        match route(&event, &self.local_identity) {
            EventRoute::Session => self.handle_lifecycle(event).await,
            EventRoute::Peers => {
                let mut peers = self.peers.write().await;
                apply_peer_event(&mut peers, event);
            }
            EventRoute::LocalMute => self.handle_local(event).await,
            EventRoute::Ignore => debug!(?event, "Ignoring transport event"),
        }
    }

    async fn handle_lifecycle(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.state.send_replace(ConnectionState::Connected);
            }
            TransportEvent::Reconnecting => {
                info!("Media transport reconnecting");
                self.state.send_replace(ConnectionState::Reconnecting);
            }
            TransportEvent::Reconnected => {
                self.state.send_replace(ConnectionState::Connected);
                let added = self.hydrate_peers().await;
                info!(added, "Media transport reconnected, roster refreshed");
                // A reconnect may briefly report the track muted; the
                // asymmetric rule keeps an unmuted user unmuted.
                if let Some(publication) = self.transport.microphone_publication() {
                    self.mute.reconcile(publication.muted).await;
                }
            }
            TransportEvent::Disconnected { reason } => {
                warn!(reason = reason.as_deref().unwrap_or("unknown"), "Media transport disconnected");
                self.state.send_replace(ConnectionState::Disconnected);
                self.peers.write().await.clear();
            }
            _ => {}
        }
    }

    async fn handle_local(&self, event: TransportEvent) {
        match event {
            TransportEvent::TrackMuted { .. } => {
                self.mute.reconcile(true).await;
            }
            TransportEvent::TrackUnmuted { .. } => {
                self.mute.apply_passive(false);
            }
            TransportEvent::LocalTrackPublished { publication } => {
                self.mute.reconcile(publication.muted).await;
            }
            TransportEvent::LocalTrackUnpublished => {
                // Never read as a mute: the track may be republished.
                self.mute.apply_passive(true);
            }
            TransportEvent::LocalPermissionRevoked => {
                self.mute.on_permission_revoked();
            }
            _ => {}
        }
    }
}

/// Feed transport events to the session until the stream ends.
pub(crate) async fn event_loop(ctx: SessionContext, mut events: mpsc::Receiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        ctx.handle_event(event).await;
    }
    debug!(user_id = %ctx.local_identity, "Transport event stream closed");
}
