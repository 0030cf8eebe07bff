//! Media session lifecycle and transport event wiring.

mod dispatch;
mod handler;
mod manager;
mod sweep;
mod types;


pub use dispatch::{route, EventRoute};
pub use manager::MediaSessionManager;
pub use types::{ConnectionState, JoinOutcome, SessionError, SessionParams};
