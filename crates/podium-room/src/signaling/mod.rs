//! Reconnecting signaling channel for out-of-band room events.
//!
//! Payloads are normalized into [`SignalingMessage`]s and handed to a
//! single replaceable handler. Closes with 1000 or 1008 end the channel.
//! Anything else reconnects with capped exponential backoff until the
//! attempt budget runs out.

mod client;
mod codec;
mod connection;
mod connector;
mod notice;
mod types;


pub use client::SignalingClient;
pub use codec::{decode, encode};
pub use connector::{SignalingConnector, SignalingSocket, WsConnector};
pub use notice::{RoomNotice, STATUS_ENDED};
pub use types::{
    close_code, kinds, should_reconnect, Payload, SignalingError, SignalingMessage,
    SignalingState, SignalingStatus, SocketEvent,
};
