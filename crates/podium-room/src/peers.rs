//! Roster of remote participants.

use std::collections::HashMap;
use std::sync::Arc;

use podium_common::Role;
use tracing::debug;

use crate::transport::{AudioHandle, RemoteParticipant};

/// One remote participant as the room currently sees them.
#[derive(Debug, Clone)]
pub struct Peer {
    pub user_id: String,
    pub role: Role,
    pub muted: bool,
    pub audio: Option<AudioHandle>,
}

/// Partial update merged by [`PeerRegistry::upsert`].
///
/// Without `user_id` the update only touches an existing entry.
#[derive(Debug, Clone, Default)]
pub struct PeerUpdate {
    pub user_id: Option<String>,
    pub role: Option<Role>,
    pub muted: Option<bool>,
    /// `Some(None)` detaches the stream, `None` leaves it alone.
    pub audio: Option<Option<AudioHandle>>,
}

impl PeerUpdate {
    /// An update that may create the entry.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = Some(muted);
        self
    }

    pub fn audio(mut self, handle: AudioHandle) -> Self {
        self.audio = Some(Some(handle));
        self
    }

    pub fn detach_audio(mut self) -> Self {
        self.audio = Some(None);
        self
    }

    /// Role and mute flag as advertised by the transport.
    pub fn from_participant(participant: &RemoteParticipant) -> Self {
        let update = Self::for_user(participant.identity.clone()).role(participant.role());
        match &participant.audio {
            Some(audio) => update.muted(audio.muted),
            None => update,
        }
    }
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<String, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `update` into the entry for `user_id`.
    ///
    /// A missing entry is created only when the update carries a user id.
    /// Returns whether anything was stored.
    pub fn upsert(&mut self, user_id: &str, update: PeerUpdate) -> bool {
        if !self.peers.contains_key(user_id) {
            if update.user_id.is_none() {
                debug!(user_id, "Ignoring update for unknown peer");
                return false;
            }
            debug!(user_id, "Adding peer");
            self.peers.insert(
                user_id.to_string(),
                Peer {
                    user_id: user_id.to_string(),
                    role: Role::default(),
                    muted: true,
                    audio: None,
                },
            );
        }
        let Some(peer) = self.peers.get_mut(user_id) else {
            return false;
        };

        if let Some(role) = update.role {
            peer.role = role;
        }
        if let Some(muted) = update.muted {
            peer.muted = muted;
        }
        if let Some(audio) = update.audio {
            // A replaced stream is ours to release; a detached one was
            // already torn down by the transport.
            if let (Some(old), Some(new)) = (&peer.audio, &audio) {
                if !Arc::ptr_eq(old, new) {
                    old.stop();
                }
            }
            peer.audio = audio;
        }
        true
    }

    /// Release the peer's audio and drop the entry.
    pub fn remove(&mut self, user_id: &str) -> Option<Peer> {
        let peer = self.peers.get_mut(user_id)?;
        if let Some(audio) = peer.audio.take() {
            audio.stop();
        }
        debug!(user_id, "Removed peer");
        self.peers.remove(user_id)
    }

    /// All peers, ordered by user id.
    pub fn list(&self) -> Vec<Peer> {
        let mut peers: Vec<Peer> = self.peers.values().cloned().collect();
        peers.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        peers
    }

    pub fn get(&self, user_id: &str) -> Option<&Peer> {
        self.peers.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Release every audio handle and empty the roster.
    pub fn clear(&mut self) {
        for peer in self.peers.values_mut() {
            if let Some(audio) = peer.audio.take() {
                audio.stop();
            }
        }
        self.peers.clear();
    }

    /// Add a participant found while hydrating from the transport.
    ///
    /// Only participants with a subscribed audio track are added.
    pub fn hydrate_participant(&mut self, participant: &RemoteParticipant) -> bool {
        let Some(publication) = &participant.audio else {
            return false;
        };
        let Some(track) = publication.track.as_ref().filter(|_| publication.subscribed) else {
            return false;
        };
        let update = PeerUpdate::from_participant(participant).audio(Arc::clone(track));
        self.upsert(&participant.identity, update)
    }

    /// Correct drifted entries from the transport's authoritative view.
    ///
    /// Remote peers have no local intent to protect, so mute flags sync in
    /// both directions. Returns the number of corrected entries.
    pub fn reconcile_remote(&mut self, participants: &[RemoteParticipant]) -> usize {
        let mut corrected = 0;
        for participant in participants {
            let Some(peer) = self.peers.get_mut(&participant.identity) else {
                continue;
            };
            let mut drifted = false;
            if let Some(audio) = &participant.audio {
                if peer.muted != audio.muted {
                    debug!(
                        user_id = %peer.user_id,
                        muted = audio.muted,
                        "Correcting drifted peer mute flag"
                    );
                    peer.muted = audio.muted;
                    drifted = true;
                }
            }
            let role = participant.role();
            if peer.role != role {
                peer.role = role;
                drifted = true;
            }
            if drifted {
                corrected += 1;
            }
        }
        corrected
    }
}
