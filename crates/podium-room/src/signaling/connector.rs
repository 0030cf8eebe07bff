//! Socket seam and the `tokio-tungstenite` implementation.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use super::types::{close_code, Payload, SignalingError, SocketEvent};

/// Close code reported when the peer closed without a status.
const NO_STATUS: u16 = 1005;

/// One open signaling connection.
#[async_trait]
pub trait SignalingSocket: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SignalingError>;

    /// Next inbound payload or the close that ended the connection.
    async fn next_event(&mut self) -> SocketEvent;

    async fn close(&mut self, code: u16, reason: &str);
}

/// Opens signaling connections.
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn open(&self, url: &Url) -> Result<Box<dyn SignalingSocket>, SignalingError>;
}

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn open(&self, url: &Url) -> Result<Box<dyn SignalingSocket>, SignalingError> {
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;
        Ok(Box::new(WsSocket { stream }))
    }
}

struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SignalingSocket for WsSocket {
    async fn send_text(&mut self, text: String) -> Result<(), SignalingError> {
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|_| SignalingError::Closed)
    }

    async fn next_event(&mut self) -> SocketEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return SocketEvent::Payload(Payload::Text(text.as_str().to_owned()))
                }
                Some(Ok(WsMessage::Binary(bytes))) => {
                    return SocketEvent::Payload(Payload::Binary(bytes.to_vec()))
                }
                Some(Ok(WsMessage::Frame(frame))) => {
                    return SocketEvent::Payload(Payload::Framed(frame.payload().to_vec()))
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    return SocketEvent::Closed {
                        code: frame.map_or(NO_STATUS, |f| u16::from(f.code)),
                        was_clean: true,
                    }
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "signaling socket error");
                    return SocketEvent::Closed {
                        code: close_code::ABNORMAL,
                        was_clean: false,
                    };
                }
                None => {
                    return SocketEvent::Closed {
                        code: close_code::ABNORMAL,
                        was_clean: false,
                    }
                }
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        let _ = self.stream.close(Some(frame)).await;
    }
}
