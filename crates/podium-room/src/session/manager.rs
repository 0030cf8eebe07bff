//! Connect, reconnect, and leave lifecycle of the media session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use podium_common::Role;
use podium_config::PodiumConfig;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::handler::{event_loop, SessionContext};
use super::sweep::run_sweep;
use super::types::{ConnectionState, JoinOutcome, SessionError, SessionParams};
use crate::mute::{MuteError, MuteStateController, ToggleOutcome};
use crate::options::RoomOptions;
use crate::peers::{Peer, PeerRegistry};
use crate::role_sync::RoleMetadataSync;
use crate::signaling::SignalingClient;
use crate::token::{HttpTokenSource, TokenError, TokenSource};
use crate::transport::{MediaTransport, MicrophoneAccess};

struct ActiveSession {
    params: SessionParams,
    ctx: SessionContext,
    desired_role: watch::Sender<Role>,
    tasks: Vec<JoinHandle<()>>,
}

/// Orchestrates one media session at a time and wires the transport's
/// events into the roster, the mute controller, and role sync.
///
/// The manager does not own a signaling channel. An application that runs
/// one must hand it over with [`attach_signaling`](Self::attach_signaling),
/// otherwise it keeps reconnecting after [`leave`](Self::leave).
pub struct MediaSessionManager {
    transport: Arc<dyn MediaTransport>,
    tokens: Arc<dyn TokenSource>,
    media_url: String,
    options: RoomOptions,
    state: Arc<watch::Sender<ConnectionState>>,
    peers: Arc<RwLock<PeerRegistry>>,
    mute: Arc<MuteStateController>,
    role_sync: Arc<RoleMetadataSync>,
    session: Mutex<Option<ActiveSession>>,
    /// Leave flag of the newest join; set by `leave()` before it waits.
    leave_flag: StdMutex<Arc<AtomicBool>>,
    signaling: StdMutex<Option<Arc<SignalingClient>>>,
}

impl MediaSessionManager {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        microphone: Arc<dyn MicrophoneAccess>,
        tokens: Arc<dyn TokenSource>,
        media_url: impl Into<String>,
        options: RoomOptions,
    ) -> Self {
        let (state, state_rx) = watch::channel(ConnectionState::Disconnected);
        let mute = Arc::new(MuteStateController::new(
            Arc::clone(&transport),
            microphone,
            state_rx,
            options.mute.clone(),
        ));
        let role_sync = Arc::new(RoleMetadataSync::new(
            Arc::clone(&transport),
            Arc::clone(&mute),
            options.role.clone(),
        ));
        Self {
            transport,
            tokens,
            media_url: media_url.into(),
            options,
            state: Arc::new(state),
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            mute,
            role_sync,
            session: Mutex::new(None),
            leave_flag: StdMutex::new(Arc::new(AtomicBool::new(false))),
            signaling: StdMutex::new(None),
        }
    }

    /// Build from a loaded config with the HTTP token source.
    pub fn from_config(
        transport: Arc<dyn MediaTransport>,
        microphone: Arc<dyn MicrophoneAccess>,
        config: &PodiumConfig,
    ) -> Result<Self, TokenError> {
        let tokens = Arc::new(HttpTokenSource::new(&config.api)?);
        Ok(Self::new(
            transport,
            microphone,
            tokens,
            config.media.ws_url.clone(),
            RoomOptions::from(config),
        ))
    }

    /// Join a room, or update the role of the room already joined.
    ///
    /// With the same room and user on a connected session, a role change
    /// only updates presence metadata. Anything else tears the current
    /// session down and connects afresh.
    pub async fn join(&self, params: SessionParams) -> Result<JoinOutcome, SessionError> {
        let mut session = self.session.lock().await;

        if let Some(active) = session.as_mut() {
            if active.params.same_seat(&params) && self.state() == ConnectionState::Connected {
                if active.params.role == params.role {
                    return Ok(JoinOutcome::AlreadyJoined);
                }
                info!(
                    from = %active.params.role,
                    to = %params.role,
                    "Role changed, updating metadata without reconnecting"
                );
                active.params.role = params.role;
                active.desired_role.send_replace(params.role);
                if !self.mute.is_in_flight() {
                    self.role_sync.spawn_sync(params.role);
                } else {
                    debug!("Mute toggle in flight, role update left to the sweep");
                }
                return Ok(JoinOutcome::RoleUpdated);
            }
        }

        if let Some(previous) = session.take() {
            info!(room_id = %previous.params.room_id, "Leaving previous session before join");
            self.teardown(previous).await;
        }

        let left = Arc::new(AtomicBool::new(false));
        *self.leave_flag.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&left);

        self.state.send_replace(ConnectionState::Connecting);
        info!(room_id = %params.room_id, user_id = %params.user_id, role = %params.role, "Joining room");

        let token = match self.tokens.fetch(&params.room_id, &params.user_id).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Token fetch failed");
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };
        if left.load(Ordering::Acquire) {
            self.state.send_replace(ConnectionState::Disconnected);
            return Err(SessionError::Left);
        }

        let events = match self.transport.connect(&self.media_url, &token).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Media transport connect failed");
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };
        if left.load(Ordering::Acquire) {
            self.transport.disconnect().await;
            self.state.send_replace(ConnectionState::Disconnected);
            return Err(SessionError::Left);
        }

        let ctx = SessionContext {
            transport: Arc::clone(&self.transport),
            peers: Arc::clone(&self.peers),
            mute: Arc::clone(&self.mute),
            role_sync: Arc::clone(&self.role_sync),
            state: Arc::clone(&self.state),
            left,
            local_identity: params.user_id.clone(),
        };

        self.state.send_replace(ConnectionState::Connected);
        let hydrated = ctx.hydrate_peers().await;
        self.mute
            .hydrate(self.transport.microphone_publication().as_ref());
        info!(room_id = %params.room_id, peers = hydrated, "Joined room");

        let (desired_role, desired_rx) = watch::channel(params.role);
        let role_sync = Arc::clone(&self.role_sync);
        let initial_rx = desired_rx.clone();
        let tasks = vec![
            tokio::spawn(event_loop(ctx.clone(), events)),
            tokio::spawn(async move {
                let outcome = role_sync.attach_initial(initial_rx).await;
                debug!(?outcome, "Initial role metadata");
            }),
            tokio::spawn(run_sweep(ctx.clone(), self.options.sync.clone(), desired_rx)),
        ];

        *session = Some(ActiveSession {
            params,
            ctx,
            desired_role,
            tasks,
        });
        Ok(JoinOutcome::Connected)
    }

    /// Change the local role on the joined room.
    pub async fn set_role(&self, role: Role) -> Result<JoinOutcome, SessionError> {
        let params = {
            let session = self.session.lock().await;
            let active = session.as_ref().ok_or(SessionError::NotJoined)?;
            SessionParams {
                role,
                ..active.params.clone()
            }
        };
        self.join(params).await
    }

    /// Intentionally leave. Terminal for the current session: late events
    /// are ignored and nothing reconnects.
    pub async fn leave(&self) {
        self.leave_flag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store(true, Ordering::Release);

        let previous = self.session.lock().await.take();
        match previous {
            Some(active) => self.teardown(active).await,
            None => {
                self.mute.reset();
                self.state.send_replace(ConnectionState::Disconnected);
            }
        }

        let signaling = self
            .signaling
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(client) = signaling {
            client.close().await;
        }
        info!("Left room");
    }

    async fn teardown(&self, active: ActiveSession) {
        active.ctx.left.store(true, Ordering::Release);
        for task in &active.tasks {
            task.abort();
        }
        // Cuts short a toggle still running so it cannot re-enable the mic.
        self.mute.reset();

        // Stop capture at the hardware level, not just unpublish, so the
        // platform's microphone indicator goes dark.
        self.transport.stop_local_tracks();
        match tokio::time::timeout(
            self.options.mute.safety_timeout,
            self.transport.set_microphone_enabled(false),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!(error = %e, "Disabling microphone on leave failed"),
            Err(_) => debug!("Disabling microphone on leave timed out"),
        }
        self.transport.disconnect().await;

        self.peers.write().await.clear();
        self.mute.reset();
        self.state.send_replace(ConnectionState::Disconnected);
        debug!(room_id = %active.params.room_id, "Session torn down");
    }

    /// Close this signaling client together with the session on leave.
    ///
    /// Required for any signaling channel that runs beside the session:
    /// an intentional leave must stop its reconnects too.
    pub fn attach_signaling(&self, client: Arc<SignalingClient>) {
        *self.signaling.lock().unwrap_or_else(PoisonError::into_inner) = Some(client);
    }

    /// Flip the local microphone. See [`MuteStateController::toggle`].
    pub async fn toggle_mute(&self) -> Result<ToggleOutcome, MuteError> {
        self.mute.toggle().await
    }

    pub fn is_muted(&self) -> bool {
        self.mute.is_muted()
    }

    pub fn mute_controller(&self) -> &Arc<MuteStateController> {
        &self.mute
    }

    pub fn role_sync(&self) -> &Arc<RoleMetadataSync> {
        &self.role_sync
    }

    pub async fn peers(&self) -> Vec<Peer> {
        self.peers.read().await.list()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Whether the newest session was intentionally left.
    pub fn has_left(&self) -> bool {
        self.leave_flag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .load(Ordering::Acquire)
    }

    pub async fn current_params(&self) -> Option<SessionParams> {
        self.session.lock().await.as_ref().map(|s| s.params.clone())
    }
}
