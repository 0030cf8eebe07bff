//! Periodic reconciliation against the transport's authoritative state.

use podium_common::Role;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::handler::SessionContext;
use super::types::ConnectionState;
use crate::mute::PassiveOutcome;
use crate::options::SyncOptions;
use crate::role_sync::RoleSyncOutcome;

/// What one sweep pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) local: Option<PassiveOutcome>,
    pub(crate) peers_corrected: usize,
    pub(crate) role: Option<RoleSyncOutcome>,
}

/// Wait out the settle delay, then sweep on every interval tick.
pub(crate) async fn run_sweep(
    ctx: SessionContext,
    options: SyncOptions,
    desired_role: watch::Receiver<Role>,
) {
    tokio::time::sleep(options.settle_delay).await;
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if ctx.has_left() {
            return;
        }
        if ctx.connection_state() != ConnectionState::Connected {
            continue;
        }
        let role = *desired_role.borrow();
        let report = sweep_once(&ctx, role).await;
        debug!(
            local = ?report.local,
            peers_corrected = report.peers_corrected,
            role = ?report.role,
            "Reconciliation sweep"
        );
    }
}

pub(crate) async fn sweep_once(ctx: &SessionContext, desired_role: Role) -> SweepReport {
    // Local: muted -> unmuted only, with a transport nudge on refusal.
    let local = match ctx.transport.microphone_publication() {
        Some(publication) => Some(ctx.mute.reconcile(publication.muted).await),
        None => None,
    };

    // Remote: no intent to protect, sync both ways.
    let remotes = ctx.transport.remote_participants();
    let peers_corrected = ctx.peers.write().await.reconcile_remote(&remotes);

    let role = if ctx.role_sync.needs_update(desired_role) {
        Some(ctx.role_sync.sync(desired_role).await)
    } else {
        None
    };

    SweepReport {
        local,
        peers_corrected,
        role,
    }
}
