//! Transport abstraction for Rooh Avatar sync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! device-to-device link (a platform pairing API, the in-process loopback,
//! a mock for testing).
//!
//! # Design
//!
//! The transport contract is callback based, the way platform pairing APIs
//! are:
//! - `is_supported()` probes the capability without side effects
//! - `create_session()` creates the session and registers a [`SessionDelegate`]
//! - `request_activation()` starts activation; completion arrives later via
//!   [`SessionDelegate::activation_did_complete`]
//! - `send_message()` transmits an envelope and calls the [`ReplyHandler`]
//!   exactly once with the peer's reply or an error
//!
//! Unsolicited messages from the peer are pushed through
//! [`SessionDelegate::did_receive_message`]. [`PeerSession`](crate::PeerSession)
//! turns all of this into awaitable operations.

mod loopback;
mod mock;

pub use loopback::LoopbackTransport;
pub use mock::MockTransport;

use avatar_types::MessageEnvelope;
use thiserror::Error;

use crate::session::SessionDelegate;

/// Called once with the outcome of a [`PeerTransport::send_message`].
pub type ReplyHandler = Box<dyn FnOnce(Result<MessageEnvelope, TransportError>) + Send + 'static>;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The device has no pairing capability.
    #[error("pairing is not supported on this device")]
    Unsupported,

    /// No session was created before use.
    #[error("no session")]
    NoSession,

    /// Session creation failed.
    #[error("session creation failed: {0}")]
    CreateFailed(String),

    /// Activation could not be started or did not succeed.
    #[error("activation failed: {0}")]
    ActivationFailed(String),

    /// The paired device is not reachable.
    #[error("peer unreachable")]
    PeerUnreachable,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Contract a device-to-device link must fulfil.
///
/// Implementations must not call back into the delegate while holding a
/// lock that [`send_message`](Self::send_message) or
/// [`request_activation`](Self::request_activation) also take.
pub trait PeerTransport: Send + Sync + 'static {
    /// Whether this device can pair at all.
    fn is_supported(&self) -> bool;

    /// Create the session and register the delegate that receives
    /// activation, deactivation, and inbound-message callbacks.
    fn create_session(&self, delegate: SessionDelegate) -> Result<(), TransportError>;

    /// Start activation.
    ///
    /// An `Err` means activation could not be started at all. Otherwise the
    /// outcome is reported through the delegate, possibly before this call
    /// returns.
    fn request_activation(&self) -> Result<(), TransportError>;

    /// Transmit an envelope to the peer.
    ///
    /// `reply` must be called at most once. Dropping it without calling it
    /// is reported to the sender as a lost reply.
    fn send_message(&self, envelope: MessageEnvelope, reply: ReplyHandler);
}
