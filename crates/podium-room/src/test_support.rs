//! In-crate fakes for the transport, device, and token seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::signaling::{Payload, SignalingConnector, SignalingError, SignalingSocket, SocketEvent};
use crate::token::{TokenError, TokenSource};
use crate::transport::{
    AudioHandle, AudioTrack, MediaTransport, MicrophoneAccess, PermissionError,
    RemoteAudioPublication, RemoteParticipant, TrackPublication, TransportError, TransportEvent,
};

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct FakeTrack {
    id: String,
    stops: AtomicUsize,
}

impl FakeTrack {
    pub(crate) fn new(id: &str) -> Arc<FakeTrack> {
        Arc::new(FakeTrack {
            id: id.to_string(),
            stops: AtomicUsize::new(0),
        })
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stops.load(Ordering::SeqCst) > 0
    }
}

impl AudioTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A remote participant. `muted: None` means no audio publication.
pub(crate) fn remote(
    identity: &str,
    metadata: Option<&str>,
    muted: Option<bool>,
    subscribed: bool,
) -> RemoteParticipant {
    RemoteParticipant {
        identity: identity.to_string(),
        metadata: metadata.map(str::to_string),
        audio: muted.map(|muted| RemoteAudioPublication {
            sid: format!("TR_{identity}"),
            muted,
            subscribed,
            track: subscribed.then(|| -> AudioHandle { FakeTrack::new(identity) }),
        }),
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) publication: Option<TrackPublication>,
    pub(crate) metadata: Option<String>,
    pub(crate) remotes: Vec<RemoteParticipant>,
    /// Ordered log of side-effecting calls.
    pub(crate) calls: Vec<String>,
    pub(crate) connects: usize,
    events: Option<mpsc::Sender<TransportEvent>>,

    pub(crate) mic_delay: Duration,
    pub(crate) mic_hangs: bool,
    pub(crate) mic_error: Option<TransportError>,
    /// Enables that leave the publication muted.
    pub(crate) stuck_muted_enables: usize,
    pub(crate) enable_yields_nothing: bool,
    pub(crate) metadata_delay: Duration,
    pub(crate) metadata_error: Option<TransportError>,
    pub(crate) connect_error: Option<TransportError>,
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<FakeTransport> {
        Arc::new(FakeTransport::default())
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn count_calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub(crate) fn microphone_publication_muted(&self) -> Option<bool> {
        self.state().publication.as_ref().map(|p| p.muted)
    }

    pub(crate) fn set_publication(&self, muted: Option<bool>) {
        self.state().publication = muted.map(|muted| TrackPublication {
            sid: "TR_local".into(),
            muted,
        });
    }

    /// Deliver an event to the current connection, if any.
    pub(crate) async fn emit(&self, event: TransportEvent) {
        let tx = self.state().events.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        let mut state = self.state();
        state.calls.push(format!("connect({url},{token})"));
        if let Some(err) = state.connect_error.clone() {
            return Err(err);
        }
        state.connects += 1;
        let (tx, rx) = mpsc::channel(64);
        state.events = Some(tx);
        Ok(rx)
    }

    async fn set_microphone_enabled(
        &self,
        enabled: bool,
    ) -> Result<Option<TrackPublication>, TransportError> {
        let (delay, hangs) = {
            let mut state = self.state();
            state.calls.push(format!("set_microphone_enabled({enabled})"));
            (state.mic_delay, state.mic_hangs)
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(err) = state.mic_error.clone() {
            return Err(err);
        }
        if !enabled {
            return Ok(state.publication.as_mut().map(|p| {
                p.muted = true;
                p.clone()
            }));
        }
        if state.enable_yields_nothing {
            return Ok(None);
        }
        let muted = if state.stuck_muted_enables > 0 {
            state.stuck_muted_enables -= 1;
            true
        } else {
            false
        };
        let publication = state.publication.get_or_insert_with(|| TrackPublication {
            sid: "TR_local".into(),
            muted: true,
        });
        publication.muted = muted;
        Ok(Some(publication.clone()))
    }

    fn microphone_publication(&self) -> Option<TrackPublication> {
        self.state().publication.clone()
    }

    async fn set_metadata(&self, metadata: String) -> Result<(), TransportError> {
        let delay = {
            let mut state = self.state();
            state.calls.push(format!("set_metadata({metadata})"));
            state.metadata_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        if let Some(err) = state.metadata_error.clone() {
            return Err(err);
        }
        state.metadata = Some(metadata);
        Ok(())
    }

    fn local_metadata(&self) -> Option<String> {
        self.state().metadata.clone()
    }

    fn remote_participants(&self) -> Vec<RemoteParticipant> {
        self.state().remotes.clone()
    }

    fn stop_local_tracks(&self) {
        let mut state = self.state();
        state.calls.push("stop_local_tracks".into());
    }

    async fn disconnect(&self) {
        let mut state = self.state();
        state.calls.push("disconnect".into());
        state.events = None;
    }
}

// ---------------------------------------------------------------------------
// Microphone + tokens
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeMic {
    pub(crate) answer: Mutex<Option<PermissionError>>,
    pub(crate) requests: AtomicUsize,
}

impl FakeMic {
    pub(crate) fn granting() -> Arc<FakeMic> {
        Arc::new(FakeMic::default())
    }

    pub(crate) fn refusing(err: PermissionError) -> Arc<FakeMic> {
        Arc::new(FakeMic {
            answer: Mutex::new(Some(err)),
            requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MicrophoneAccess for FakeMic {
    async fn request(&self) -> Result<(), PermissionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.answer.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeTokens {
    pub(crate) fetches: AtomicUsize,
    pub(crate) delay: Duration,
    pub(crate) fail: bool,
}

#[async_trait]
impl TokenSource for FakeTokens {
    async fn fetch(&self, room_id: &str, user_id: &str) -> Result<String, TokenError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(TokenError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(format!("tok-{room_id}-{user_id}"))
    }
}

// ---------------------------------------------------------------------------
// Signaling sockets
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct SocketLog {
    sent: Mutex<Vec<String>>,
    closed: Mutex<Vec<u16>>,
}

pub(crate) struct FakeSocket {
    events: mpsc::UnboundedReceiver<SocketEvent>,
    log: Arc<SocketLog>,
}

#[async_trait]
impl SignalingSocket for FakeSocket {
    async fn send_text(&mut self, text: String) -> Result<(), SignalingError> {
        self.log.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_event(&mut self) -> SocketEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self, code: u16, _reason: &str) {
        self.log.closed.lock().unwrap().push(code);
    }
}

/// Server side of a scripted socket.
pub(crate) struct ServerEnd {
    tx: mpsc::UnboundedSender<SocketEvent>,
    log: Arc<SocketLog>,
}

impl ServerEnd {
    pub(crate) fn push_text(&self, text: &str) {
        self.push(Payload::Text(text.to_string()));
    }

    pub(crate) fn push(&self, payload: Payload) {
        let _ = self.tx.send(SocketEvent::Payload(payload));
    }

    pub(crate) fn close(&self, code: u16, was_clean: bool) {
        let _ = self.tx.send(SocketEvent::Closed { code, was_clean });
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.log.sent.lock().unwrap().clone()
    }

    pub(crate) fn closed(&self) -> Vec<u16> {
        self.log.closed.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub(crate) struct FakeConnector {
    script: Mutex<VecDeque<FakeSocket>>,
    opens: Mutex<Vec<(Instant, Url)>>,
}

impl FakeConnector {
    pub(crate) fn accept(&self) -> ServerEnd {
        let (tx, rx) = mpsc::unbounded_channel();
        let log = Arc::new(SocketLog::default());
        self.script.lock().unwrap().push_back(FakeSocket {
            events: rx,
            log: Arc::clone(&log),
        });
        ServerEnd { tx, log }
    }

    pub(crate) fn opened_urls(&self) -> Vec<Url> {
        self.opens
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub(crate) fn open_offsets(&self, start: Instant) -> Vec<u64> {
        self.opens
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| at.duration_since(start).as_millis() as u64)
            .collect()
    }
}

#[async_trait]
impl SignalingConnector for FakeConnector {
    async fn open(&self, url: &Url) -> Result<Box<dyn SignalingSocket>, SignalingError> {
        self.opens.lock().unwrap().push((Instant::now(), url.clone()));
        // An empty script refuses the connection.
        match self.script.lock().unwrap().pop_front() {
            Some(socket) => Ok(Box::new(socket)),
            None => Err(SignalingError::Connect("refused".into())),
        }
    }
}

