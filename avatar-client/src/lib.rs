//! # avatar-client
//!
//! Device-pairing and message-exchange layer for Rooh Avatar.
//!
//! This is the library both companion apps link to keep their character in
//! sync.
//!
//! ## Features
//!
//! - **Peer Session**: support probe, idempotent session creation, activation
//!   and send as awaitable operations over a callback-based transport
//! - **Sync Controller**: the authoritative character state, outbound sends
//!   with published status, last-writer-wins inbound updates
//! - **Transport Abstraction**: pluggable transport layer (loopback, mock)
//!
//! ## Example
//!
//! ```ignore
//! use avatar_client::{LoopbackTransport, PeerSession, SyncConfig, SyncController};
//!
//! let (phone, _watch) = LoopbackTransport::pair("phone", "watch");
//! let config = SyncConfig::default();
//! let controller = SyncController::new(
//!     PeerSession::new(phone, &config),
//!     CharacterPayload::default(),
//!     &config,
//! );
//! let _listener = controller.spawn_inbound_listener();
//!
//! controller.set_age(30);
//! controller.request_send().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod session;
pub mod transport;

pub use config::SyncConfig;
pub use controller::{ControllerEvent, SyncController};
pub use session::{PeerSession, SessionDelegate, SessionError, SessionId};
pub use transport::{
    LoopbackTransport, MockTransport, PeerTransport, ReplyHandler, TransportError,
};
