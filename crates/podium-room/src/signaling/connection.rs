//! Background connection loop with close-code aware reconnect.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use super::codec;
use super::connector::{SignalingConnector, SignalingSocket};
use super::types::{
    close_code, should_reconnect, SignalingMessage, SignalingState, SignalingStatus, SocketEvent,
};
use crate::options::SignalingOptions;

/// The single active inbound message handler.
pub(crate) type MessageHandler = Box<dyn Fn(SignalingMessage) + Send + Sync>;
pub(crate) type SharedHandler = Arc<RwLock<Option<MessageHandler>>>;

/// Everything one connection loop needs.
pub(crate) struct LinkContext {
    pub(crate) url: Url,
    pub(crate) options: SignalingOptions,
    pub(crate) connector: Arc<dyn SignalingConnector>,
    pub(crate) handler: SharedHandler,
    pub(crate) status: Arc<watch::Sender<SignalingStatus>>,
}

enum SessionResult {
    Shutdown,
    Closed { code: u16, was_clean: bool },
}

fn publish(status: &watch::Sender<SignalingStatus>, state: SignalingState, attempt: u32) {
    status.send_modify(|s| {
        s.state = state;
        s.reconnect_attempt = attempt;
    });
}

/// Runs until shutdown, a non-reconnecting close, or exhaustion.
///
/// Dropping the shutdown sender counts as a shutdown.
pub(crate) async fn connection_loop(
    link: LinkContext,
    mut command_rx: mpsc::Receiver<String>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut attempt: u32 = 0;
    // Strip the query so user ids stay out of the logs.
    let endpoint = format!("{}{}", link.url.origin().ascii_serialization(), link.url.path());

    loop {
        publish(&link.status, SignalingState::Connecting, attempt);
        info!(url = %endpoint, attempt, "Connecting to signaling channel");

        let opened = tokio::select! {
            result = tokio::time::timeout(
                link.options.connect_timeout,
                link.connector.open(&link.url),
            ) => result,
            _ = shutdown_rx.recv() => {
                publish(&link.status, SignalingState::Disconnected, 0);
                return;
            }
        };

        let (code, was_clean) = match opened {
            Ok(Ok(mut socket)) => {
                attempt = 0;
                publish(&link.status, SignalingState::Connected, 0);
                info!(url = %endpoint, "Signaling channel open");

                match run_socket(socket.as_mut(), &link, &mut command_rx, &mut shutdown_rx).await {
                    SessionResult::Shutdown => {
                        info!("Signaling channel closed by client");
                        publish(&link.status, SignalingState::Disconnected, 0);
                        return;
                    }
                    SessionResult::Closed { code, was_clean } => (code, was_clean),
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to open signaling channel");
                (close_code::ABNORMAL, false)
            }
            Err(_elapsed) => {
                warn!(
                    timeout_ms = link.options.connect_timeout.as_millis() as u64,
                    "Signaling connect timed out"
                );
                (close_code::ABNORMAL, false)
            }
        };

        if !should_reconnect(code, was_clean) {
            info!(code, "Signaling channel closed, not reconnecting");
            publish(&link.status, SignalingState::Disconnected, 0);
            return;
        }

        if attempt >= link.options.max_reconnect_attempts {
            warn!(
                attempts = attempt,
                "Signaling reconnect attempts exhausted"
            );
            publish(&link.status, SignalingState::Exhausted, attempt);
            return;
        }

        attempt += 1;
        let delay = link.options.reconnect_delay(attempt);
        publish(&link.status, SignalingState::Disconnected, attempt);
        info!(
            code,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Signaling channel lost, scheduling reconnect"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => {
                publish(&link.status, SignalingState::Disconnected, 0);
                return;
            }
        }
    }
}

async fn run_socket(
    socket: &mut dyn SignalingSocket,
    link: &LinkContext,
    command_rx: &mut mpsc::Receiver<String>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> SessionResult {
    loop {
        tokio::select! {
            event = socket.next_event() => match event {
                SocketEvent::Payload(payload) => {
                    if let Some(message) = codec::decode(payload) {
                        dispatch(&link.handler, message).await;
                    }
                }
                SocketEvent::Closed { code, was_clean } => {
                    debug!(code, was_clean, "Signaling socket closed");
                    return SessionResult::Closed { code, was_clean };
                }
            },

            Some(text) = command_rx.recv() => {
                if let Err(e) = socket.send_text(text).await {
                    warn!(error = %e, "Signaling send failed");
                    return SessionResult::Closed {
                        code: close_code::ABNORMAL,
                        was_clean: false,
                    };
                }
            }

            _ = shutdown_rx.recv() => {
                socket.close(close_code::NORMAL, "client closing").await;
                return SessionResult::Shutdown;
            }
        }
    }
}

async fn dispatch(handler: &SharedHandler, message: SignalingMessage) {
    let guard = handler.read().await;
    match guard.as_ref() {
        Some(handle) => handle(message),
        None => debug!(kind = %message.kind, "No signaling handler, dropping message"),
    }
}
