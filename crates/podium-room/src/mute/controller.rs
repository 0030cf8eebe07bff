//! Sole arbiter of the local microphone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use podium_common::new_correlation_id;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::{passive_transition, LocalMuteState, PassiveDecision};
use super::{MuteError, PassiveOutcome, SkipReason, ToggleOutcome};
use crate::options::MuteOptions;
use crate::session::ConnectionState;
use crate::transport::{MediaTransport, MicrophoneAccess, PermissionError, TrackPublication};

/// Owns the local mute intent and serializes every microphone transition.
///
/// Other components read from it or report passive observations to it.
/// Only [`toggle`](Self::toggle) and a permission revocation may mute a
/// user who intends to be unmuted.
pub struct MuteStateController {
    transport: Arc<dyn MediaTransport>,
    microphone: Arc<dyn MicrophoneAccess>,
    connection: watch::Receiver<ConnectionState>,
    options: MuteOptions,
    state: Mutex<LocalMuteState>,
    in_flight_tx: watch::Sender<bool>,
    /// Bumped by every `reset()`; a running toggle stops when it changes.
    resets: watch::Sender<u64>,
}

/// Clears the in-flight flag when a toggle ends, including by cancellation.
struct InFlightGuard<'a> {
    controller: &'a MuteStateController,
    generation: u64,
    completed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        if state.generation != self.generation {
            return;
        }
        if self.completed {
            state.clear_in_flight();
        } else {
            state.clear_all();
        }
        drop(state);
        self.controller.in_flight_tx.send_replace(false);
    }
}

impl MuteStateController {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        microphone: Arc<dyn MicrophoneAccess>,
        connection: watch::Receiver<ConnectionState>,
        options: MuteOptions,
    ) -> Self {
        let (in_flight_tx, _) = watch::channel(false);
        let (resets, _) = watch::channel(0);
        Self {
            transport,
            microphone,
            connection,
            options,
            state: Mutex::new(LocalMuteState::default()),
            in_flight_tx,
            resets,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocalMuteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip the local microphone.
    ///
    /// Guard rejections are reported as [`ToggleOutcome::Skipped`], not as
    /// errors. Errors are the user-visible failures: permission denial,
    /// a failed unmute, a hung transport, or a transport error.
    pub async fn toggle(&self) -> Result<ToggleOutcome, MuteError> {
        let connection = *self.connection.borrow();
        if connection != ConnectionState::Connected {
            debug!(?connection, "Toggle skipped, session not connected");
            return Ok(ToggleOutcome::Skipped(SkipReason::NotConnected));
        }

        let now = Instant::now();
        let (target_muted, generation, mut resets) = {
            let mut state = self.lock();
            if state.in_flight_at(now, self.options.safety_timeout) {
                debug!("Toggle skipped, another toggle in flight");
                return Ok(ToggleOutcome::Skipped(SkipReason::InFlight));
            }
            if state.debounced_at(now, self.options.debounce) {
                debug!("Toggle debounced");
                return Ok(ToggleOutcome::Skipped(SkipReason::Debounced));
            }
            let target = !state.intended_muted;
            // Subscribed under the lock so a reset cannot slip in unseen.
            let resets = self.resets.subscribe();
            (target, state.begin(now, self.options.protection_window), resets)
        };
        self.in_flight_tx.send_replace(true);

        let mut guard = InFlightGuard {
            controller: self,
            generation,
            completed: false,
        };
        let correlation_id = new_correlation_id();
        info!(%correlation_id, target_muted, "Toggling microphone");

        let bounded = tokio::time::timeout(
            self.options.safety_timeout,
            self.apply(target_muted, generation),
        );
        let result = tokio::select! {
            result = bounded => match result {
                Ok(result) => result,
                Err(_) => Err(MuteError::TransportTimeout),
            },
            _ = resets.changed() => {
                info!(%correlation_id, "Controller reset, abandoning toggle");
                return Ok(ToggleOutcome::Skipped(SkipReason::Reset));
            }
        };

        let mut state = self.lock();
        if state.generation != generation {
            info!(%correlation_id, "Controller reset, discarding toggle result");
            return Ok(ToggleOutcome::Skipped(SkipReason::Reset));
        }
        match result {
            Ok(muted) => {
                state.intended_muted = muted;
                state.last_completed = Some(Instant::now());
                guard.completed = true;
                info!(%correlation_id, muted, "Microphone toggle applied");
                Ok(ToggleOutcome::Applied { muted })
            }
            Err(err) => {
                if let MuteError::UnmuteFailed { actual_muted } = err {
                    state.intended_muted = actual_muted;
                }
                warn!(%correlation_id, error = %err, "Microphone toggle failed");
                Err(err)
            }
        }
    }

    /// Drive the transport toward `target_muted`. Returns the resulting
    /// muted flag.
    async fn apply(&self, target_muted: bool, generation: u64) -> Result<bool, MuteError> {
        if target_muted {
            self.mute().await
        } else {
            self.unmute(generation).await
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    async fn mute(&self) -> Result<bool, MuteError> {
        match self.transport.set_microphone_enabled(false).await? {
            Some(_) => Ok(self.settled_muted().await),
            None => Ok(true),
        }
    }

    async fn unmute(&self, generation: u64) -> Result<bool, MuteError> {
        if self.transport.microphone_publication().is_none() {
            // Ask explicitly so the platform prompt always appears.
            match self.microphone.request().await {
                Ok(()) => debug!("Microphone permission granted"),
                Err(PermissionError::Denied) => return Err(MuteError::PermissionDenied),
                Err(PermissionError::Unavailable(reason)) => {
                    warn!(%reason, "Permission check unavailable, continuing")
                }
            }
        }

        if self.transport.set_microphone_enabled(true).await?.is_none() {
            return Err(MuteError::UnmuteFailed { actual_muted: true });
        }
        if !self.settled_muted().await {
            return Ok(false);
        }

        if !self.is_current(generation) {
            return Err(MuteError::UnmuteFailed { actual_muted: true });
        }
        warn!("Microphone still muted after enable, cycling once");
        let retry = async {
            self.transport.set_microphone_enabled(false).await?;
            self.transport.set_microphone_enabled(true).await
        };
        if let Err(err) = retry.await {
            warn!(error = %err, "Unmute retry failed");
            return Err(MuteError::UnmuteFailed { actual_muted: true });
        }
        if self.settled_muted().await {
            return Err(MuteError::UnmuteFailed { actual_muted: true });
        }
        Ok(false)
    }

    /// Muted flag after the transport has had time to settle.
    async fn settled_muted(&self) -> bool {
        tokio::time::sleep(self.options.verify_delay).await;
        self.transport
            .microphone_publication()
            .map_or(true, |publication| publication.muted)
    }

    /// Report a transport-observed mute flag for the local microphone.
    ///
    /// Ignored while a toggle is in flight or inside its protection window.
    /// Otherwise only muted -> unmuted is applied.
    pub fn apply_passive(&self, reported_muted: bool) -> PassiveOutcome {
        let now = Instant::now();
        let mut state = self.lock();
        if state.in_flight_at(now, self.options.safety_timeout) || state.is_protected(now) {
            return PassiveOutcome::Ignored;
        }
        state.expire_protection(now);

        match passive_transition(state.intended_muted, reported_muted) {
            PassiveDecision::Unchanged => PassiveOutcome::Unchanged,
            PassiveDecision::Recover => {
                state.intended_muted = false;
                info!("Transport reports microphone live, recovering unmuted state");
                PassiveOutcome::Recovered
            }
            PassiveDecision::Refuse => {
                debug!("Ignoring passive mute of an unmuted user");
                PassiveOutcome::Refused
            }
        }
    }

    /// [`apply_passive`](Self::apply_passive), then push the transport back
    /// to unmuted if the report was refused.
    pub async fn reconcile(&self, reported_muted: bool) -> PassiveOutcome {
        let outcome = self.apply_passive(reported_muted);
        if outcome == PassiveOutcome::Refused {
            self.reassert_unmuted().await;
        }
        outcome
    }

    /// Best-effort: re-enable the microphone when the transport says muted
    /// but the user intends to be live.
    pub async fn reassert_unmuted(&self) {
        let now = Instant::now();
        {
            let state = self.lock();
            if state.intended_muted || state.in_flight_at(now, self.options.safety_timeout) {
                return;
            }
        }
        let transport_muted = self
            .transport
            .microphone_publication()
            .is_some_and(|publication| publication.muted);
        if !transport_muted {
            return;
        }
        debug!("Re-enabling microphone to match unmuted intent");
        if let Err(err) = self.transport.set_microphone_enabled(true).await {
            warn!(error = %err, "Failed to re-enable microphone");
        }
    }

    /// The platform revoked microphone access. The only passive path that
    /// may mute an unmuted user.
    pub fn on_permission_revoked(&self) {
        let mut state = self.lock();
        warn!(was_muted = state.intended_muted, "Microphone permission revoked");
        state.intended_muted = true;
        state.user_initiated = false;
        state.protected_until = None;
    }

    /// Seed the intent from an existing publication after connecting.
    pub fn hydrate(&self, publication: Option<&TrackPublication>) {
        let muted = publication.map_or(true, |p| p.muted);
        let mut state = self.lock();
        state.intended_muted = muted;
        if !muted {
            state.arm_protection(Instant::now(), self.options.protection_window);
        }
        debug!(muted, "Hydrated local mute state");
    }

    /// Back to muted with every flag cleared.
    pub fn reset(&self) {
        let mut state = self.lock();
        let generation = state.generation.wrapping_add(1);
        *state = LocalMuteState {
            generation,
            ..LocalMuteState::default()
        };
        drop(state);
        self.in_flight_tx.send_replace(false);
        self.resets.send_modify(|count| *count = count.wrapping_add(1));
    }

    pub fn is_muted(&self) -> bool {
        self.lock().intended_muted
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock()
            .in_flight_at(Instant::now(), self.options.safety_timeout)
    }

    /// Watch channel that flips to `true` while a toggle runs.
    pub fn subscribe_in_flight(&self) -> watch::Receiver<bool> {
        self.in_flight_tx.subscribe()
    }

    pub fn snapshot(&self) -> LocalMuteState {
        self.lock().clone()
    }
}
