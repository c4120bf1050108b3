//! In-process transport linking two sessions.
//!
//! Each end plays one device. Envelopes cross as MessagePack bytes, and
//! activation and delivery complete on tokio tasks, so the sessions see the
//! same asynchronous callbacks a radio link would give them.

use std::sync::{Arc, Weak};

use avatar_types::MessageEnvelope;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::debug;

use super::{PeerTransport, ReplyHandler, TransportError};
use crate::session::SessionDelegate;

#[derive(Debug)]
struct LoopbackEnd {
    name: String,
    delegate: Option<SessionDelegate>,
    active: bool,
}

/// One end of an in-process device pair.
#[derive(Debug)]
pub struct LoopbackTransport {
    end: Arc<Mutex<LoopbackEnd>>,
    peer: Weak<Mutex<LoopbackEnd>>,
}

impl LoopbackTransport {
    /// Create two linked ends.
    ///
    /// Dropping one end makes the other's peer unreachable.
    pub fn pair(first: &str, second: &str) -> (Self, Self) {
        let a = Arc::new(Mutex::new(LoopbackEnd {
            name: first.to_string(),
            delegate: None,
            active: false,
        }));
        let b = Arc::new(Mutex::new(LoopbackEnd {
            name: second.to_string(),
            delegate: None,
            active: false,
        }));
        let first = Self {
            peer: Arc::downgrade(&b),
            end: a,
        };
        let second = Self {
            peer: Arc::downgrade(&first.end),
            end: b,
        };
        (first, second)
    }

    /// Name of this end.
    pub fn name(&self) -> String {
        self.end.lock().name.clone()
    }

    /// Whether this end's session has been activated.
    pub fn is_active(&self) -> bool {
        self.end.lock().active
    }

    /// Simulate this device dropping off the link.
    ///
    /// The local session is told it was deactivated; the peer can no longer
    /// reach this end until it is activated again.
    pub fn disconnect(&self) {
        let delegate = {
            let mut end = self.end.lock();
            end.active = false;
            end.delegate.clone()
        };
        if let Some(delegate) = delegate {
            delegate.did_deactivate();
        }
    }
}

impl PeerTransport for LoopbackTransport {
    fn is_supported(&self) -> bool {
        true
    }

    fn create_session(&self, delegate: SessionDelegate) -> Result<(), TransportError> {
        let mut end = self.end.lock();
        debug!(end = %end.name, "loopback session created");
        end.delegate = Some(delegate);
        Ok(())
    }

    fn request_activation(&self) -> Result<(), TransportError> {
        let delegate = self
            .end
            .lock()
            .delegate
            .clone()
            .ok_or(TransportError::NoSession)?;
        let handle = Handle::try_current()
            .map_err(|e| TransportError::ActivationFailed(e.to_string()))?;

        let end = Arc::clone(&self.end);
        handle.spawn(async move {
            tokio::task::yield_now().await;
            end.lock().active = true;
            delegate.activation_did_complete(Ok(()));
        });
        Ok(())
    }

    fn send_message(&self, envelope: MessageEnvelope, reply: ReplyHandler) {
        if !self.end.lock().active {
            return reply(Err(TransportError::SendFailed(
                "local session is not active".to_string(),
            )));
        }
        let bytes = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => return reply(Err(TransportError::SendFailed(e.to_string()))),
        };
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return reply(Err(TransportError::SendFailed(e.to_string()))),
        };

        let peer = self.peer.upgrade();
        handle.spawn(async move {
            reply(deliver(peer, &bytes));
        });
    }
}

fn deliver(
    peer: Option<Arc<Mutex<LoopbackEnd>>>,
    bytes: &[u8],
) -> Result<MessageEnvelope, TransportError> {
    let peer = peer.ok_or(TransportError::PeerUnreachable)?;
    let delegate = {
        let end = peer.lock();
        if !end.active {
            return Err(TransportError::PeerUnreachable);
        }
        end.delegate.clone().ok_or(TransportError::PeerUnreachable)?
    };

    let envelope =
        MessageEnvelope::from_bytes(bytes).map_err(|e| TransportError::SendFailed(e.to_string()))?;
    debug!(bytes = bytes.len(), "loopback delivering envelope");
    let receipt = delegate.did_receive_message(envelope);

    // The reply crosses the link too.
    let receipt_bytes = receipt
        .to_bytes()
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
    MessageEnvelope::from_bytes(&receipt_bytes).map_err(|e| TransportError::SendFailed(e.to_string()))
}
