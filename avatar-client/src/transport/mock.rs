//! Mock transport for testing.
//!
//! Allows forcing failures, holding back completions, injecting inbound
//! envelopes, and capturing sent envelopes for verification.

use super::{PeerTransport, ReplyHandler, TransportError};
use crate::session::SessionDelegate;
use avatar_types::MessageEnvelope;
use parking_lot::Mutex;
use std::sync::Arc;

/// Mock transport for testing.
///
/// Activation completes synchronously and every send is answered with a
/// delivery receipt unless told otherwise. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    unsupported: bool,
    delegate: Option<SessionDelegate>,
    sessions_created: usize,
    activation_requests: usize,
    defer_activation: bool,
    hold_replies: bool,
    held_replies: Vec<ReplyHandler>,
    sent_messages: Vec<MessageEnvelope>,
    fail_next_create: Option<String>,
    fail_next_request: Option<String>,
    fail_next_activation: Option<String>,
    fail_next_send: Option<String>,
    drop_next_reply: bool,
}

impl std::fmt::Debug for MockTransportInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransportInner")
            .field("unsupported", &self.unsupported)
            .field("sessions_created", &self.sessions_created)
            .field("activation_requests", &self.activation_requests)
            .field("sent_messages", &self.sent_messages.len())
            .field("held_replies", &self.held_replies.len())
            .finish()
    }
}

impl MockTransport {
    /// Create a new mock transport on a device that supports pairing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport on a device without pairing support.
    pub fn unsupported() -> Self {
        let transport = Self::default();
        transport.inner.lock().unsupported = true;
        transport
    }

    /// Hold activation until [`complete_activation`](Self::complete_activation)
    /// or [`fail_activation`](Self::fail_activation) is called.
    pub fn defer_activation(&self, defer: bool) {
        self.inner.lock().defer_activation = defer;
    }

    /// Report activation success to the session.
    pub fn complete_activation(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.activation_did_complete(Ok(()));
        }
    }

    /// Report activation failure to the session.
    pub fn fail_activation(&self, error: &str) {
        if let Some(delegate) = self.delegate() {
            delegate.activation_did_complete(Err(TransportError::ActivationFailed(
                error.to_string(),
            )));
        }
    }

    /// Report that the session was deactivated.
    pub fn deactivate(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.did_deactivate();
        }
    }

    /// Push an unsolicited envelope from the peer.
    ///
    /// Returns the session's reply, or `None` if no session was created.
    pub fn push_inbound(&self, envelope: MessageEnvelope) -> Option<MessageEnvelope> {
        self.delegate()
            .map(|delegate| delegate.did_receive_message(envelope))
    }

    /// Cause the next create_session() to fail with the given error.
    pub fn fail_next_create(&self, error: &str) {
        self.inner.lock().fail_next_create = Some(error.to_string());
    }

    /// Cause the next request_activation() to be rejected outright.
    pub fn fail_next_request(&self, error: &str) {
        self.inner.lock().fail_next_request = Some(error.to_string());
    }

    /// Cause the next activation to complete with the given error.
    pub fn fail_next_activation(&self, error: &str) {
        self.inner.lock().fail_next_activation = Some(error.to_string());
    }

    /// Cause the next send_message() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner.lock().fail_next_send = Some(error.to_string());
    }

    /// Drop the next reply handler without calling it.
    pub fn drop_next_reply(&self) {
        self.inner.lock().drop_next_reply = true;
    }

    /// Keep reply handlers instead of answering them.
    pub fn hold_replies(&self, hold: bool) {
        self.inner.lock().hold_replies = hold;
    }

    /// Number of reply handlers currently held back.
    pub fn held_replies(&self) -> usize {
        self.inner.lock().held_replies.len()
    }

    /// Answer every held reply handler with a delivery receipt.
    pub fn release_replies(&self) {
        let held = std::mem::take(&mut self.inner.lock().held_replies);
        for reply in held {
            reply(Ok(MessageEnvelope::delivery_receipt()));
        }
    }

    /// Get all envelopes that were sent.
    pub fn sent_messages(&self) -> Vec<MessageEnvelope> {
        self.inner.lock().sent_messages.clone()
    }

    /// Get the last envelope that was sent.
    pub fn last_sent(&self) -> Option<MessageEnvelope> {
        self.inner.lock().sent_messages.last().cloned()
    }

    /// How many times create_session() succeeded.
    pub fn sessions_created(&self) -> usize {
        self.inner.lock().sessions_created
    }

    /// How many times request_activation() was called.
    pub fn activation_requests(&self) -> usize {
        self.inner.lock().activation_requests
    }

    /// Whether a registered delegate still points at a live session.
    pub fn has_attached_delegate(&self) -> bool {
        self.delegate().is_some_and(|d| d.is_attached())
    }

    /// Clear all state (messages, delegate, forced failures).
    pub fn reset(&self) {
        *self.inner.lock() = MockTransportInner::default();
    }

    fn delegate(&self) -> Option<SessionDelegate> {
        self.inner.lock().delegate.clone()
    }
}

impl PeerTransport for MockTransport {
    fn is_supported(&self) -> bool {
        !self.inner.lock().unsupported
    }

    fn create_session(&self, delegate: SessionDelegate) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();

        if inner.unsupported {
            return Err(TransportError::Unsupported);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_create.take() {
            return Err(TransportError::CreateFailed(error));
        }

        inner.delegate = Some(delegate);
        inner.sessions_created += 1;
        Ok(())
    }

    fn request_activation(&self) -> Result<(), TransportError> {
        let (delegate, outcome) = {
            let mut inner = self.inner.lock();
            let delegate = inner.delegate.clone().ok_or(TransportError::NoSession)?;

            // Check for forced failure
            if let Some(error) = inner.fail_next_request.take() {
                return Err(TransportError::ActivationFailed(error));
            }

            inner.activation_requests += 1;
            if inner.defer_activation {
                return Ok(());
            }
            let outcome = match inner.fail_next_activation.take() {
                Some(error) => Err(TransportError::ActivationFailed(error)),
                None => Ok(()),
            };
            (delegate, outcome)
        };

        // Lock released: the delegate runs session bookkeeping.
        delegate.activation_did_complete(outcome);
        Ok(())
    }

    fn send_message(&self, envelope: MessageEnvelope, reply: ReplyHandler) {
        let mut inner = self.inner.lock();

        if inner.delegate.is_none() {
            drop(inner);
            return reply(Err(TransportError::NoSession));
        }

        inner.sent_messages.push(envelope);

        if std::mem::take(&mut inner.drop_next_reply) {
            return;
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            drop(inner);
            return reply(Err(TransportError::SendFailed(error)));
        }

        if inner.hold_replies {
            inner.held_replies.push(reply);
            return;
        }

        drop(inner);
        reply(Ok(MessageEnvelope::delivery_receipt()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PeerSession, SyncConfig};
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (Arc<StdMutex<Vec<Result<MessageEnvelope, TransportError>>>>, ReplyHandler) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let handler: ReplyHandler = Box::new(move |outcome| sink.lock().unwrap().push(outcome));
        (log, handler)
    }

    fn attached(transport: &MockTransport) -> PeerSession<MockTransport> {
        let session = PeerSession::new(transport.clone(), &SyncConfig::default());
        session.create_session();
        session
    }

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[test]
    fn mock_transport_supports_pairing_by_default() {
        assert!(MockTransport::new().is_supported());
        assert!(!MockTransport::unsupported().is_supported());
    }

    #[test]
    fn send_without_session_fails() {
        let transport = MockTransport::new();
        let (log, handler) = recorder();

        transport.send_message(MessageEnvelope::new(), handler);

        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Err(TransportError::NoSession)]
        );
        assert!(transport.sent_messages().is_empty());
    }

    #[test]
    fn activation_without_session_fails() {
        let transport = MockTransport::new();
        assert_eq!(
            transport.request_activation(),
            Err(TransportError::NoSession)
        );
    }

    #[test]
    fn mock_transport_records_and_answers_sends() {
        let transport = MockTransport::new();
        let _session = attached(&transport);
        let (log, handler) = recorder();

        let envelope = MessageEnvelope::new().with_entry("k", vec![1]);
        transport.send_message(envelope.clone(), handler);

        assert_eq!(transport.last_sent(), Some(envelope));
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Ok(MessageEnvelope::delivery_receipt())]
        );
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[test]
    fn forced_create_failure() {
        let transport = MockTransport::new();
        transport.fail_next_create("radio off");
        let session = PeerSession::new(transport.clone(), &SyncConfig::default());

        assert!(!session.create_session());
        assert_eq!(transport.sessions_created(), 0);
    }

    #[test]
    fn held_replies_are_released_in_order() {
        let transport = MockTransport::new();
        let _session = attached(&transport);
        transport.hold_replies(true);
        let (log, handler) = recorder();

        transport.send_message(MessageEnvelope::new(), handler);
        assert_eq!(transport.held_replies(), 1);
        assert!(log.lock().unwrap().is_empty());

        transport.release_replies();
        assert_eq!(transport.held_replies(), 0);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn dropped_reply_is_never_called() {
        let transport = MockTransport::new();
        let _session = attached(&transport);
        transport.drop_next_reply();
        let (log, handler) = recorder();

        transport.send_message(MessageEnvelope::new(), handler);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(transport.sent_messages().len(), 1);
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[test]
    fn mock_transport_clone_shares_state() {
        let transport1 = MockTransport::new();
        let transport2 = transport1.clone();
        let _session = attached(&transport1);

        assert_eq!(transport2.sessions_created(), 1);
        assert!(transport2.has_attached_delegate());
    }

    #[test]
    fn mock_transport_reset_clears_all() {
        let transport = MockTransport::new();
        let _session = attached(&transport);
        transport.fail_next_send("x");

        transport.reset();

        assert_eq!(transport.sessions_created(), 0);
        assert!(!transport.has_attached_delegate());
        assert!(transport.sent_messages().is_empty());
    }
}
