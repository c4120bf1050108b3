//! Outbound sync progress as seen by the presentation layer.

use std::fmt;
use thiserror::Error;

/// Why an outbound sync did not succeed.
///
/// Inbound decode failures never show up here; they are dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFailure {
    /// The pairing transport is unavailable on this device.
    #[error("pairing with a companion device is not supported on this device")]
    CapabilityUnsupported,

    /// The transport reported an error while activating the session.
    #[error("session activation failed: {0}")]
    Activation(String),

    /// The transport reported an error while transmitting.
    #[error("message send failed: {0}")]
    Send(String),
}

/// Progress of the most recent outbound send.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing requested.
    #[default]
    Idle,
    /// Creating or activating the session.
    EstablishingConnection,
    /// Payload handed to the transport, waiting for the peer's reply.
    Sending,
    /// The peer acknowledged the payload.
    Succeeded,
    /// The send did not go through.
    Failed(SyncFailure),
}

impl SyncStatus {
    /// Whether a send is between its first and last transition.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::EstablishingConnection | Self::Sending)
    }

    /// The failure, if this status is one.
    pub fn failure(&self) -> Option<&SyncFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::EstablishingConnection => f.write_str("establishing connection"),
            Self::Sending => f.write_str("sending"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}
