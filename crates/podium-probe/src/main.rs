//! podium-probe: watch a room's signaling channel from the terminal.
//!
//! Connects with the same reconnect policy the engine uses and logs every
//! room notice and connection status change until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use podium_common::PodiumError;
use podium_config::{toml_loader, validation, PodiumConfig};
use podium_room::{
    RoomNotice, SignalingClient, SignalingMessage, SignalingOptions, SignalingState,
};

#[derive(Parser)]
#[command(name = "podium-probe", about = "Watch a podium room's signaling channel")]
struct Args {
    /// Room to watch.
    #[arg(short, long)]
    room: String,

    /// Participant id to connect as. A random id is used when omitted.
    #[arg(short, long)]
    user: Option<String>,

    /// Config file to load instead of the default location.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `api.base_url`.
    #[arg(long)]
    api_url: Option<String>,

    /// Announce the join to the room after connecting.
    #[arg(long)]
    announce: bool,
}

/// Tracks whether the room has been told about this participant on the
/// current connection. A reconnect is a fresh session on the server side,
/// so the announcement is owed again.
#[derive(Debug)]
struct Announcement {
    enabled: bool,
    sent: bool,
}

impl Announcement {
    fn new(enabled: bool) -> Self {
        Self { enabled, sent: false }
    }

    /// Whether a join announcement should go out for this status change.
    fn due(&mut self, connected: bool) -> bool {
        if !connected {
            self.sent = false;
            return false;
        }
        self.enabled && !self.sent
    }

    fn mark_sent(&mut self) {
        self.sent = true;
    }

    fn is_sent(&self) -> bool {
        self.sent
    }
}

fn load(args: &Args) -> podium_common::Result<PodiumConfig> {
    let mut config = match &args.config {
        Some(path) => toml_loader::load_from_path(path)?,
        None => podium_config::load_config()?,
    };
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    validation::validate(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("podium-probe: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "podium-probe stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &PodiumConfig) -> podium_common::Result<()> {
    let user = args.user.clone().unwrap_or_else(podium_common::new_id);
    let client = SignalingClient::websocket(
        config.api.clone(),
        SignalingOptions::from(&config.signaling),
    );

    client
        .on_message(|message| match RoomNotice::from_message(&message) {
            notice if notice.is_room_ended() => {
                tracing::warn!(?notice, "Room ended by host");
            }
            RoomNotice::Other { kind } => tracing::debug!(%kind, "Unhandled message"),
            notice => tracing::info!(?notice, "Room notice"),
        })
        .await;

    client
        .connect(&args.room, &user)
        .await
        .map_err(|e| PodiumError::Signaling(e.to_string()))?;
    tracing::info!(room = %args.room, user = %user, "podium-probe watching room");

    let mut status = client.subscribe_status();
    let mut announcement = Announcement::new(args.announce);
    let outcome = loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *status.borrow_and_update();
                tracing::info!(
                    state = ?current.state,
                    attempt = current.reconnect_attempt,
                    max = current.max_attempts,
                    "Signaling status"
                );
                if announcement.due(current.is_connected()) {
                    match client.send(&SignalingMessage::join_room()).await {
                        Ok(()) => announcement.mark_sent(),
                        Err(e) => tracing::warn!(error = %e, "Join announcement failed"),
                    }
                }
                if current.state == SignalingState::Exhausted {
                    break Err(PodiumError::Signaling("reconnect attempts exhausted".into()));
                }
            }
            interrupted = tokio::signal::ctrl_c() => {
                match interrupted {
                    Ok(()) => {
                        tracing::info!("Interrupted, closing");
                        break Ok(());
                    }
                    Err(e) => break Err(PodiumError::from(e)),
                }
            }
        }
    };

    if announcement.is_sent() {
        if let Err(e) = client.send(&SignalingMessage::leave_room()).await {
            tracing::debug!(error = %e, "Leave announcement failed");
        }
    }
    client.clear_message_handler().await;
    client.close().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcement_is_owed_once_per_connection() {
        let mut announcement = Announcement::new(true);
        assert!(announcement.due(true));
        announcement.mark_sent();
        assert!(!announcement.due(true));

        // Dropped and reconnected: the server has forgotten us.
        assert!(!announcement.due(false));
        assert!(!announcement.is_sent());
        assert!(announcement.due(true));
    }

    #[test]
    fn failed_announcement_is_retried_on_next_status() {
        let mut announcement = Announcement::new(true);
        assert!(announcement.due(true));
        assert!(announcement.due(true));
    }

    #[test]
    fn announcement_disabled_never_fires() {
        let mut announcement = Announcement::new(false);
        assert!(!announcement.due(true));
        assert!(!announcement.due(false));
        assert!(!announcement.due(true));
    }
}
