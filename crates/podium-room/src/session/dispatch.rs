//! Maps every transport event to the component that owns it.

use crate::peers::{PeerRegistry, PeerUpdate};
use crate::transport::TransportEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRoute {
    /// Connection lifecycle, owned by the session manager.
    Session,
    /// Remote roster changes, owned by the peer registry.
    Peers,
    /// Local microphone reports, owned by the mute controller.
    LocalMute,
    Ignore,
}

/// Route `event` for a session whose local participant is `local_identity`.
pub fn route(event: &TransportEvent, local_identity: &str) -> EventRoute {
    use TransportEvent::*;

    let remote = |identity: &str| {
        if identity == local_identity {
            EventRoute::Ignore
        } else {
            EventRoute::Peers
        }
    };

    match event {
        Connected | Disconnected { .. } | Reconnecting | Reconnected => EventRoute::Session,
        ParticipantConnected { participant }
        | TrackPublished { participant, .. }
        | TrackSubscribed { participant, .. }
        | ParticipantMetadataChanged { participant } => remote(&participant.identity),
        ParticipantDisconnected { identity } | TrackUnsubscribed { identity } => remote(identity),
        TrackMuted { identity } | TrackUnmuted { identity } => {
            if identity == local_identity {
                EventRoute::LocalMute
            } else {
                EventRoute::Peers
            }
        }
        LocalTrackPublished { .. } | LocalTrackUnpublished | LocalPermissionRevoked => {
            EventRoute::LocalMute
        }
    }
}

/// Apply a [`EventRoute::Peers`] event to the registry.
pub(crate) fn apply_peer_event(registry: &mut PeerRegistry, event: TransportEvent) {
    match event {
        TransportEvent::ParticipantConnected { participant } => {
            registry.upsert(&participant.identity, PeerUpdate::from_participant(&participant));
        }
        TransportEvent::ParticipantDisconnected { identity } => {
            registry.remove(&identity);
        }
        TransportEvent::TrackPublished {
            participant,
            publication,
        } => {
            let update = PeerUpdate::from_participant(&participant).muted(publication.muted);
            registry.upsert(&participant.identity, update);
        }
        TransportEvent::TrackSubscribed {
            participant,
            publication,
        } => {
            let mut update = PeerUpdate::from_participant(&participant).muted(publication.muted);
            if let Some(track) = publication.track {
                update = update.audio(track);
            }
            registry.upsert(&participant.identity, update);
        }
        TransportEvent::TrackUnsubscribed { identity } => {
            registry.upsert(&identity, PeerUpdate::default().detach_audio());
        }
        TransportEvent::TrackMuted { identity } => {
            registry.upsert(&identity, PeerUpdate::default().muted(true));
        }
        TransportEvent::TrackUnmuted { identity } => {
            registry.upsert(&identity, PeerUpdate::default().muted(false));
        }
        TransportEvent::ParticipantMetadataChanged { participant } => {
            // Refresh a known peer; metadata alone never creates one.
            let update = PeerUpdate {
                user_id: None,
                ..PeerUpdate::from_participant(&participant)
            };
            registry.upsert(&participant.identity, update);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remote, FakeTrack};
    use crate::transport::{RemoteAudioPublication, TrackPublication};
    use podium_common::Role;

    const ME: &str = "me";

    #[test]
    fn lifecycle_events_go_to_session() {
        for event in [
            TransportEvent::Connected,
            TransportEvent::Disconnected { reason: None },
            TransportEvent::Reconnecting,
            TransportEvent::Reconnected,
        ] {
            assert_eq!(route(&event, ME), EventRoute::Session);
        }
    }

    #[test]
    fn mute_events_split_by_identity() {
        let local = TransportEvent::TrackMuted { identity: ME.into() };
        let other = TransportEvent::TrackUnmuted { identity: "bob".into() };
        assert_eq!(route(&local, ME), EventRoute::LocalMute);
        assert_eq!(route(&other, ME), EventRoute::Peers);
    }

    #[test]
    fn local_publication_events_go_to_mute() {
        let published = TransportEvent::LocalTrackPublished {
            publication: TrackPublication {
                sid: "TR".into(),
                muted: false,
            },
        };
        assert_eq!(route(&published, ME), EventRoute::LocalMute);
        assert_eq!(route(&TransportEvent::LocalTrackUnpublished, ME), EventRoute::LocalMute);
        assert_eq!(route(&TransportEvent::LocalPermissionRevoked, ME), EventRoute::LocalMute);
    }

    #[test]
    fn roster_events_about_self_are_ignored() {
        let event = TransportEvent::ParticipantConnected {
            participant: remote(ME, None, None, false),
        };
        assert_eq!(route(&event, ME), EventRoute::Ignore);
        let event = TransportEvent::ParticipantDisconnected { identity: "bob".into() };
        assert_eq!(route(&event, ME), EventRoute::Peers);
    }

    #[test]
    fn roster_lifecycle() {
        let mut registry = PeerRegistry::new();
        let track = FakeTrack::new("bob-audio");

        apply_peer_event(
            &mut registry,
            TransportEvent::ParticipantConnected {
                participant: remote("bob", Some(r#"{"role":"disagree"}"#), None, false),
            },
        );
        apply_peer_event(
            &mut registry,
            TransportEvent::TrackSubscribed {
                participant: remote("bob", Some(r#"{"role":"disagree"}"#), None, false),
                publication: RemoteAudioPublication {
                    sid: "TR_bob".into(),
                    muted: false,
                    subscribed: true,
                    track: Some(track.clone()),
                },
            },
        );
        let bob = registry.get("bob").unwrap();
        assert_eq!(bob.role, Role::Disagree);
        assert!(!bob.muted);
        assert!(bob.audio.is_some());

        apply_peer_event(&mut registry, TransportEvent::TrackMuted { identity: "bob".into() });
        assert!(registry.get("bob").unwrap().muted);

        apply_peer_event(&mut registry, TransportEvent::TrackUnsubscribed { identity: "bob".into() });
        assert!(registry.get("bob").unwrap().audio.is_none());
        assert!(!track.is_stopped());

        apply_peer_event(
            &mut registry,
            TransportEvent::ParticipantDisconnected { identity: "bob".into() },
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn metadata_change_only_refreshes_known_peers() {
        let mut registry = PeerRegistry::new();
        apply_peer_event(
            &mut registry,
            TransportEvent::ParticipantMetadataChanged {
                participant: remote("carol", Some(r#"{"role":"host"}"#), Some(false), true),
            },
        );
        assert!(registry.is_empty());

        registry.upsert("carol", PeerUpdate::for_user("carol"));
        apply_peer_event(
            &mut registry,
            TransportEvent::ParticipantMetadataChanged {
                participant: remote("carol", Some(r#"{"role":"host"}"#), Some(false), true),
            },
        );
        let carol = registry.get("carol").unwrap();
        assert_eq!(carol.role, Role::Host);
        assert!(!carol.muted);
    }

    #[test]
    fn mute_event_for_unknown_peer_creates_nothing() {
        let mut registry = PeerRegistry::new();
        apply_peer_event(&mut registry, TransportEvent::TrackUnmuted { identity: "zed".into() });
        assert!(registry.is_empty());
    }
}
