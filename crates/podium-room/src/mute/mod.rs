//! Local microphone intent: toggling, guarding, and reconciliation.

mod controller;
mod state;


pub use controller::MuteStateController;
pub use state::{passive_transition, LocalMuteState, PassiveDecision};

use crate::transport::TransportError;

/// Result of a `toggle()` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied { muted: bool },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConnected,
    InFlight,
    Debounced,
    /// The controller was reset while the toggle ran; nothing was applied.
    Reset,
}

/// What a passive report did to the local intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveOutcome {
    /// A toggle is running or its protection window is open.
    Ignored,
    Unchanged,
    Recovered,
    Refused,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MuteError {
    #[error("microphone permission denied; allow microphone access in your settings")]
    PermissionDenied,

    #[error("microphone operation timed out")]
    TransportTimeout,

    #[error("failed to unmute microphone")]
    UnmuteFailed { actual_muted: bool },

    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl MuteError {
    /// Whether the UI should tell the user about this failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, MuteError::PermissionDenied | MuteError::UnmuteFailed { .. })
    }
}
