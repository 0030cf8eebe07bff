//! Local mute intent and the passive-update policy.

use std::time::Duration;

use tokio::time::Instant;

/// The local user's microphone intent plus the flags that guard it.
#[derive(Debug, Clone)]
pub struct LocalMuteState {
    /// What the UI renders. Authoritative.
    pub intended_muted: bool,
    pub last_toggle: Option<Instant>,
    pub last_completed: Option<Instant>,
    pub in_flight: bool,
    pub in_flight_since: Option<Instant>,
    pub user_initiated: bool,
    pub protected_until: Option<Instant>,
    pub(crate) generation: u64,
}

impl Default for LocalMuteState {
    fn default() -> Self {
        Self {
            intended_muted: true,
            last_toggle: None,
            last_completed: None,
            in_flight: false,
            in_flight_since: None,
            user_initiated: false,
            protected_until: None,
            generation: 0,
        }
    }
}

impl LocalMuteState {
    /// In flight and not yet past the safety timeout.
    pub fn in_flight_at(&self, now: Instant, safety_timeout: Duration) -> bool {
        match (self.in_flight, self.in_flight_since) {
            (true, Some(since)) => now.duration_since(since) < safety_timeout,
            (true, None) => true,
            _ => false,
        }
    }

    /// Inside the protection window of a user-initiated toggle.
    pub fn is_protected(&self, now: Instant) -> bool {
        self.user_initiated && self.protected_until.is_some_and(|until| now < until)
    }

    pub(crate) fn debounced_at(&self, now: Instant, debounce: Duration) -> bool {
        self.last_completed
            .is_some_and(|done| now.duration_since(done) < debounce)
    }

    /// Capture intent for a new toggle. Returns its generation.
    pub(crate) fn begin(&mut self, now: Instant, protection_window: Duration) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = true;
        self.in_flight_since = Some(now);
        self.last_toggle = Some(now);
        self.arm_protection(now, protection_window);
        self.generation
    }

    pub(crate) fn arm_protection(&mut self, now: Instant, window: Duration) {
        self.user_initiated = true;
        self.protected_until = Some(now + window);
    }

    pub(crate) fn clear_in_flight(&mut self) {
        self.in_flight = false;
        self.in_flight_since = None;
    }

    /// Drop every guard flag so the user can retry at once.
    pub(crate) fn clear_all(&mut self) {
        self.clear_in_flight();
        self.user_initiated = false;
        self.protected_until = None;
        self.last_completed = None;
    }

    /// Lazily expire the protection window.
    pub(crate) fn expire_protection(&mut self, now: Instant) {
        if self.user_initiated && !self.is_protected(now) {
            self.user_initiated = false;
            self.protected_until = None;
        }
    }
}

/// What a passive (event or sweep driven) report may do to the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveDecision {
    Unchanged,
    /// muted -> unmuted: the transport recovered on its own.
    Recover,
    /// unmuted -> muted: never taken passively.
    Refuse,
}

/// The asymmetric sync rule for the local microphone.
///
/// Only an explicit toggle or a permission revocation may mute a user who
/// intends to be unmuted. Every passive path goes through here.
pub fn passive_transition(intended_muted: bool, reported_muted: bool) -> PassiveDecision {
    match (intended_muted, reported_muted) {
        (true, false) => PassiveDecision::Recover,
        (false, true) => PassiveDecision::Refuse,
        _ => PassiveDecision::Unchanged,
    }
}
