//! Public handle for the signaling channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use podium_config::ApiConfig;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

use super::codec;
use super::connection::{connection_loop, LinkContext, SharedHandler};
use super::connector::{SignalingConnector, WsConnector};
use super::types::{SignalingError, SignalingMessage, SignalingState, SignalingStatus};
use crate::options::SignalingOptions;

/// How long `close()` waits for the loop to send its close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

struct ActiveLink {
    command_tx: mpsc::Sender<String>,
    // Dropping this alone also stops the loop.
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Reconnecting event-notification client keyed by `(channel, participant)`.
///
/// The connection runs on a background task. Dropping the client closes it
/// with code 1000 and cancels any pending reconnect.
pub struct SignalingClient {
    api: ApiConfig,
    options: SignalingOptions,
    connector: Arc<dyn SignalingConnector>,
    handler: SharedHandler,
    status: Arc<watch::Sender<SignalingStatus>>,
    link: Mutex<Option<ActiveLink>>,
}

impl SignalingClient {
    pub fn new(
        api: ApiConfig,
        options: SignalingOptions,
        connector: Arc<dyn SignalingConnector>,
    ) -> Self {
        let status = SignalingStatus {
            max_attempts: options.max_reconnect_attempts,
            ..Default::default()
        };
        let (status_tx, _) = watch::channel(status);
        Self {
            api,
            options,
            connector,
            handler: Arc::new(RwLock::new(None)),
            status: Arc::new(status_tx),
            link: Mutex::new(None),
        }
    }

    /// Client over a real WebSocket.
    pub fn websocket(api: ApiConfig, options: SignalingOptions) -> Self {
        Self::new(api, options, Arc::new(WsConnector))
    }

    /// Open the channel for `(channel_id, participant_id)`.
    ///
    /// Any previous connection is closed first. Calling this after
    /// reconnects were exhausted starts over with a fresh attempt counter.
    pub async fn connect(
        &self,
        channel_id: &str,
        participant_id: &str,
    ) -> Result<(), SignalingError> {
        let url = self
            .api
            .signaling_url(channel_id, participant_id)
            .map_err(|e| SignalingError::Connect(e.to_string()))?;

        if let Some(previous) = self.take_link() {
            self.shutdown(previous).await;
        }

        let (command_tx, command_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let link = LinkContext {
            url,
            options: self.options.clone(),
            connector: Arc::clone(&self.connector),
            handler: Arc::clone(&self.handler),
            status: Arc::clone(&self.status),
        };
        let task = tokio::spawn(connection_loop(link, command_rx, shutdown_rx));

        *self.link.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveLink {
            command_tx,
            shutdown_tx,
            task,
        });
        Ok(())
    }

    /// Send a message on the open connection.
    pub async fn send(&self, message: &SignalingMessage) -> Result<(), SignalingError> {
        if !self.is_connected() {
            return Err(SignalingError::NotConnected);
        }
        let text = codec::encode(message)?;
        let command_tx = self
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|link| link.command_tx.clone())
            .ok_or(SignalingError::NotConnected)?;
        command_tx
            .send(text)
            .await
            .map_err(|_| SignalingError::Closed)
    }

    /// Install the message handler, replacing any previous one.
    ///
    /// The handler runs on the connection task and must not block.
    pub async fn on_message<F>(&self, handler: F)
    where
        F: Fn(SignalingMessage) + Send + Sync + 'static,
    {
        *self.handler.write().await = Some(Box::new(handler));
    }

    pub async fn clear_message_handler(&self) {
        *self.handler.write().await = None;
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    pub fn status(&self) -> SignalingStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SignalingStatus> {
        self.status.subscribe()
    }

    /// Close with code 1000 and cancel any pending reconnect.
    pub async fn close(&self) {
        if let Some(link) = self.take_link() {
            self.shutdown(link).await;
        }
    }

    fn take_link(&self) -> Option<ActiveLink> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    async fn shutdown(&self, link: ActiveLink) {
        let ActiveLink {
            shutdown_tx,
            mut task,
            ..
        } = link;
        let _ = shutdown_tx.send(()).await;
        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            warn!("Signaling task did not stop in time, aborting");
            task.abort();
        }
        self.status.send_modify(|s| {
            s.state = SignalingState::Disconnected;
            s.reconnect_attempt = 0;
        });
    }
}
