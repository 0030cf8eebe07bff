//! Propagates the local role to peers through presence metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use podium_common::Role;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::mute::MuteStateController;
use crate::options::RoleSyncOptions;
use crate::transport::MediaTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSyncOutcome {
    /// Metadata already carries the role.
    Unchanged,
    Updated,
    /// A mute toggle was running. The sweep retries later.
    SkippedMuteInFlight,
    /// Another metadata update was still running.
    SkippedBusy,
    /// A mute toggle started mid-update and took priority.
    Preempted,
    /// Timed out or rejected. Logged only.
    Failed,
}

/// Best-effort, last-writer-wins role metadata updates.
///
/// Never waits on the mute controller and yields to it: an update is not
/// started while a toggle is in flight, and a running update is abandoned
/// as soon as one begins.
pub struct RoleMetadataSync {
    transport: Arc<dyn MediaTransport>,
    mute: Arc<MuteStateController>,
    options: RoleSyncOptions,
    updating: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RoleMetadataSync {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        mute: Arc<MuteStateController>,
        options: RoleSyncOptions,
    ) -> Self {
        Self {
            transport,
            mute,
            options,
            updating: AtomicBool::new(false),
        }
    }

    /// Role currently attached to the local participant's metadata.
    pub fn attached_role(&self) -> Option<Role> {
        self.transport
            .local_metadata()
            .as_deref()
            .and_then(Role::from_metadata)
    }

    pub fn needs_update(&self, role: Role) -> bool {
        self.attached_role() != Some(role)
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Attach `role` if it differs from the metadata, bounded by the
    /// short update timeout.
    pub async fn sync(&self, role: Role) -> RoleSyncOutcome {
        self.update(role, self.options.update_timeout).await
    }

    /// First attach after connecting: give the room a moment to settle,
    /// then attach whatever role is desired by then, with the longer
    /// timeout.
    pub async fn attach_initial(&self, desired: watch::Receiver<Role>) -> RoleSyncOutcome {
        tokio::time::sleep(self.options.initial_delay).await;
        let role = *desired.borrow();
        self.update(role, self.options.initial_timeout).await
    }

    /// Run [`sync`](Self::sync) in the background.
    pub fn spawn_sync(self: &Arc<Self>, role: Role) -> JoinHandle<RoleSyncOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.sync(role).await })
    }

    async fn update(&self, role: Role, timeout: Duration) -> RoleSyncOutcome {
        if !self.needs_update(role) {
            return RoleSyncOutcome::Unchanged;
        }
        if self.mute.is_in_flight() {
            debug!(%role, "Role update skipped, mute toggle in flight");
            return RoleSyncOutcome::SkippedMuteInFlight;
        }
        if self.updating.swap(true, Ordering::AcqRel) {
            debug!(%role, "Role update skipped, another update running");
            return RoleSyncOutcome::SkippedBusy;
        }
        let _busy = BusyGuard(&self.updating);

        let in_flight = self.mute.subscribe_in_flight();
        tokio::select! {
            result = tokio::time::timeout(timeout, self.transport.set_metadata(role.to_metadata())) => {
                match result {
                    Ok(Ok(())) => {
                        info!(%role, "Role metadata updated");
                        RoleSyncOutcome::Updated
                    }
                    Ok(Err(e)) => {
                        warn!(%role, error = %e, "Role metadata update failed");
                        RoleSyncOutcome::Failed
                    }
                    Err(_) => {
                        warn!(
                            %role,
                            timeout_ms = timeout.as_millis() as u64,
                            "Role metadata update timed out"
                        );
                        RoleSyncOutcome::Failed
                    }
                }
            }
            _ = toggle_started(in_flight) => {
                info!(%role, "Role metadata update pre-empted by mute toggle");
                RoleSyncOutcome::Preempted
            }
        }
    }
}

/// Resolves once a mute toggle is in flight.
async fn toggle_started(mut in_flight: watch::Receiver<bool>) {
    loop {
        if *in_flight.borrow_and_update() {
            return;
        }
        if in_flight.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
