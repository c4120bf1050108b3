//! PeerSession - the connection to the paired device.
//!
//! Wraps a callback-based [`PeerTransport`] into awaitable operations and
//! drives the pure [`SessionState`] machine from avatar-core.
//!
//! # Waiters
//!
//! At most one activation and one send can be outstanding. A second request
//! while one is pending is rejected with
//! [`SessionError::ActivationInProgress`] or [`SessionError::SendInProgress`]
//! rather than replacing the first caller's waiter. An activation whose
//! caller dropped its future no longer counts as pending: the next
//! `activate()` waits on the request already made instead of being refused.

use std::fmt;
use std::sync::{Arc, Weak};

use avatar_core::{Action, Event, SessionState};
use avatar_types::MessageEnvelope;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::transport::{PeerTransport, TransportError};

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The device has no pairing capability.
    #[error("pairing is not supported on this device")]
    Unsupported,

    /// `create_session` has not succeeded yet.
    #[error("no session has been created")]
    NoSession,

    /// Another activation is still pending.
    #[error("an activation is already in progress")]
    ActivationInProgress,

    /// The transport reported an activation failure.
    #[error("activation failed: {0}")]
    Activation(String),

    /// The session is not active.
    #[error("session is not active")]
    NotActive,

    /// Another send is still waiting for its reply.
    #[error("a send is already in progress")]
    SendInProgress,

    /// Refused to transmit an envelope with no entries.
    #[error("nothing to send")]
    EmptyEnvelope,

    /// The transport reported a transmission error.
    #[error("send failed: {0}")]
    Send(#[from] TransportError),

    /// The transport dropped the reply handler without calling it.
    #[error("transport dropped the reply")]
    ReplyDropped,
}

/// Identity of a created session.
///
/// UUID v4, assigned once by [`PeerSession::create_session`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

type ActivationWaiter = oneshot::Sender<Result<(), String>>;

struct SessionCore {
    state: SessionState,
    session_id: Option<SessionId>,
    activation_waiter: Option<ActivationWaiter>,
    send_in_flight: bool,
}

impl SessionCore {
    fn apply(&mut self, event: Event) -> Vec<Action> {
        let (next, actions) = self.state.clone().on_event(event);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "session state changed");
            self.state = next;
        }
        actions
    }

    /// Run the actions that only touch session bookkeeping.
    fn resolve(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::ResolveActivation(outcome) => match self.activation_waiter.take() {
                    Some(waiter) => {
                        // The waiter may have been dropped; nothing to wake then.
                        let _ = waiter.send(outcome);
                    }
                    None => debug!(?outcome, "activation resolved with no waiter"),
                },
                other => debug!(action = ?other, "action not handled by delegate"),
            }
        }
    }
}

struct SessionShared {
    core: Mutex<SessionCore>,
    inbound: broadcast::Sender<MessageEnvelope>,
}

impl SessionShared {
    fn handle(&self, event: Event) {
        let mut core = self.core.lock();
        let actions = core.apply(event);
        core.resolve(actions);
    }
}

/// Handle through which a transport reports back to its session.
///
/// Holds only a weak reference, so a transport never keeps a session alive;
/// callbacks after the session is gone are ignored.
#[derive(Clone)]
pub struct SessionDelegate {
    shared: Weak<SessionShared>,
}

impl SessionDelegate {
    /// Activation finished, successfully or not.
    pub fn activation_did_complete(&self, result: Result<(), TransportError>) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        match result {
            Ok(()) => shared.handle(Event::ActivationCompleted),
            Err(e) => {
                warn!(error = %e, "session activation failed");
                shared.handle(Event::ActivationFailed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// The session stopped being able to exchange messages.
    pub fn did_become_inactive(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle(Event::BecameInactive);
        }
    }

    /// The session was deactivated and must be activated again before use.
    pub fn did_deactivate(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle(Event::Deactivated);
        }
    }

    /// The peer pushed an envelope. Returns the reply to send back.
    pub fn did_receive_message(&self, envelope: MessageEnvelope) -> MessageEnvelope {
        if let Some(shared) = self.shared.upgrade() {
            if shared.inbound.send(envelope).is_err() {
                debug!("inbound message dropped: no subscribers");
            }
        }
        MessageEnvelope::delivery_receipt()
    }

    /// Whether the session this delegate reports to still exists.
    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for SessionDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionDelegate")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Clears the in-flight send flag even if the send future is dropped.
struct SendSlot<'a> {
    shared: &'a SessionShared,
}

impl Drop for SendSlot<'_> {
    fn drop(&mut self) {
        self.shared.core.lock().send_in_flight = false;
    }
}

/// The session with exactly one paired device.
pub struct PeerSession<T: PeerTransport> {
    transport: Arc<T>,
    shared: Arc<SessionShared>,
}

impl<T: PeerTransport> PeerSession<T> {
    /// Create a session manager over a transport. No transport calls are made.
    pub fn new(transport: T, config: &SyncConfig) -> Self {
        let (inbound, _) = broadcast::channel(config.inbound_capacity.max(1));
        Self {
            transport: Arc::new(transport),
            shared: Arc::new(SessionShared {
                core: Mutex::new(SessionCore {
                    state: SessionState::new(),
                    session_id: None,
                    activation_waiter: None,
                    send_in_flight: false,
                }),
                inbound,
            }),
        }
    }

    /// Capability probe. No side effects.
    pub fn check_support(&self) -> bool {
        self.transport.is_supported()
    }

    /// Create the session if it does not exist yet.
    ///
    /// Returns true if a session exists afterwards. Calling it again after
    /// success keeps the same session.
    pub fn create_session(&self) -> bool {
        if !self.transport.is_supported() {
            self.shared.handle(Event::SupportDenied);
            return false;
        }

        let actions = {
            let mut core = self.shared.core.lock();
            if core.state.has_session() {
                return true;
            }
            core.apply(Event::CreateRequested)
        };

        for action in actions {
            if action != Action::CreateSession {
                continue;
            }
            let delegate = SessionDelegate {
                shared: Arc::downgrade(&self.shared),
            };
            if let Err(e) = self.transport.create_session(delegate) {
                warn!(error = %e, "transport refused to create a session");
                self.shared.handle(Event::CreateFailed);
                return false;
            }
            let id = SessionId::new();
            self.shared.core.lock().session_id = Some(id);
            info!(session_id = %id, "session created");
        }
        true
    }

    /// Activate the session and wait for the transport to confirm.
    ///
    /// Returns immediately if already active.
    pub async fn activate(&self) -> Result<(), SessionError> {
        let (actions, waiter) = {
            let mut core = self.shared.core.lock();
            let state = core.state.clone();
            match state {
                SessionState::Active => return Ok(()),
                SessionState::Unsupported => return Err(SessionError::Unsupported),
                SessionState::Uninitialized => return Err(SessionError::NoSession),
                SessionState::Activating => {
                    if core
                        .activation_waiter
                        .as_ref()
                        .is_some_and(|waiter| !waiter.is_closed())
                    {
                        return Err(SessionError::ActivationInProgress);
                    }
                    // The previous caller gave up; wait on the request already sent.
                    debug!("taking over an abandoned activation");
                    let (tx, rx) = oneshot::channel();
                    core.activation_waiter = Some(tx);
                    (Vec::new(), rx)
                }
                SessionState::Created | SessionState::Inactive => {
                    let (tx, rx) = oneshot::channel();
                    core.activation_waiter = Some(tx);
                    (core.apply(Event::ActivateRequested), rx)
                }
            }
        };

        for action in actions {
            if action != Action::RequestActivation {
                continue;
            }
            // The transport may report completion before this returns.
            if let Err(e) = self.transport.request_activation() {
                warn!(error = %e, "activation request rejected by transport");
                self.shared.handle(Event::ActivationFailed {
                    error: e.to_string(),
                });
            }
        }

        match waiter.await {
            Ok(Ok(())) => {
                info!(session_id = ?self.session_id(), "session activated");
                Ok(())
            }
            Ok(Err(reason)) => Err(SessionError::Activation(reason)),
            Err(_) => Err(SessionError::Activation(
                "activation was abandoned".to_string(),
            )),
        }
    }

    /// Transmit an envelope and wait for the peer's reply.
    ///
    /// No retry is attempted on failure.
    pub async fn send(&self, envelope: MessageEnvelope) -> Result<MessageEnvelope, SessionError> {
        if envelope.is_empty() {
            return Err(SessionError::EmptyEnvelope);
        }

        let _slot = {
            let mut core = self.shared.core.lock();
            if !core.state.is_active() {
                return Err(SessionError::NotActive);
            }
            if core.send_in_flight {
                return Err(SessionError::SendInProgress);
            }
            core.send_in_flight = true;
            SendSlot {
                shared: &self.shared,
            }
        };

        let (tx, rx) = oneshot::channel();
        self.transport.send_message(
            envelope,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );

        match rx.await {
            Ok(Ok(reply)) => {
                debug!(receipt = reply.is_delivery_receipt(), "peer replied");
                Ok(reply)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "send failed");
                Err(SessionError::Send(e))
            }
            Err(_) => Err(SessionError::ReplyDropped),
        }
    }

    /// Subscribe to envelopes pushed by the peer.
    ///
    /// Each receiver sees every envelope that arrives after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageEnvelope> {
        self.shared.inbound.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.core.lock().state.clone()
    }

    /// Whether messages can be exchanged now.
    pub fn is_active(&self) -> bool {
        self.shared.core.lock().state.is_active()
    }

    /// Identity of the created session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.core.lock().session_id
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: PeerTransport> fmt::Debug for PeerSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("PeerSession")
            .field("state", &core.state)
            .field("session_id", &core.session_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use avatar_types::CHARACTER_MODEL_KEY;
    use std::time::Duration;

    fn session() -> PeerSession<MockTransport> {
        PeerSession::new(MockTransport::new(), &SyncConfig::default())
    }

    fn envelope() -> MessageEnvelope {
        MessageEnvelope::new().with_entry(CHARACTER_MODEL_KEY, b"{}".to_vec())
    }

    async fn active_session() -> PeerSession<MockTransport> {
        let session = session();
        assert!(session.create_session());
        session.activate().await.unwrap();
        session
    }

    // ===========================================
    // Support and creation
    // ===========================================

    #[test]
    fn check_support_has_no_side_effects() {
        let session = session();
        assert!(session.check_support());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.transport().sessions_created(), 0);
    }

    #[test]
    fn unsupported_device_cannot_create_session() {
        let session = PeerSession::new(MockTransport::unsupported(), &SyncConfig::default());
        assert!(!session.check_support());
        assert!(!session.create_session());
        assert_eq!(session.state(), SessionState::Unsupported);
        assert!(session.session_id().is_none());
    }

    #[test]
    fn create_session_is_idempotent() {
        let session = session();
        assert!(session.create_session());
        let first = session.session_id();
        assert!(first.is_some());

        assert!(session.create_session());
        assert_eq!(session.session_id(), first);
        assert_eq!(session.state(), SessionState::Created);
        assert_eq!(session.transport().sessions_created(), 1);
    }

    #[test]
    fn transport_create_failure_leaves_no_session() {
        let session = session();
        session.transport().fail_next_create("radio off");

        assert!(!session.create_session());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.session_id().is_none());

        // A later attempt succeeds
        assert!(session.create_session());
        assert_eq!(session.state(), SessionState::Created);
    }

    // ===========================================
    // Activation
    // ===========================================

    #[tokio::test]
    async fn activate_without_session_fails() {
        let session = session();
        assert_eq!(session.activate().await, Err(SessionError::NoSession));
    }

    #[tokio::test]
    async fn activate_unsupported_fails() {
        let session = PeerSession::new(MockTransport::unsupported(), &SyncConfig::default());
        session.create_session();
        assert_eq!(session.activate().await, Err(SessionError::Unsupported));
    }

    #[tokio::test]
    async fn activate_reaches_active() {
        let session = active_session().await;
        assert!(session.is_active());
        assert_eq!(session.transport().activation_requests(), 1);
    }

    #[tokio::test]
    async fn activate_when_active_is_a_no_op() {
        let session = active_session().await;
        session.activate().await.unwrap();
        assert_eq!(session.transport().activation_requests(), 1);
    }

    #[tokio::test]
    async fn activation_failure_is_reported() {
        let session = session();
        session.create_session();
        session.transport().fail_next_activation("watch app not installed");

        let result = session.activate().await;
        assert!(matches!(result, Err(SessionError::Activation(ref r)) if r.contains("watch app not installed")));
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[tokio::test]
    async fn rejected_activation_request_is_reported() {
        let session = session();
        session.create_session();
        session.transport().fail_next_request("busy");

        let result = session.activate().await;
        assert!(matches!(result, Err(SessionError::Activation(_))));
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[tokio::test]
    async fn second_activation_while_pending_is_rejected() {
        let session = Arc::new(session());
        session.create_session();
        session.transport().defer_activation(true);

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.activate().await })
        };
        while !session.state().is_activating() {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            session.activate().await,
            Err(SessionError::ActivationInProgress)
        );

        session.transport().complete_activation();
        assert_eq!(pending.await.unwrap(), Ok(()));
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn abandoned_activation_can_be_awaited_again() {
        let session = Arc::new(session());
        session.create_session();
        session.transport().defer_activation(true);

        let gave_up =
            tokio::time::timeout(Duration::from_millis(20), session.activate()).await;
        assert!(gave_up.is_err());
        assert!(session.state().is_activating());

        let retry = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.activate().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // The retry is a live waiter, so a third caller is still turned away
        assert_eq!(
            session.activate().await,
            Err(SessionError::ActivationInProgress)
        );

        session.transport().complete_activation();
        assert_eq!(retry.await.unwrap(), Ok(()));
        assert!(session.is_active());
        assert_eq!(session.transport().activation_requests(), 1);
    }

    #[tokio::test]
    async fn deactivation_during_activation_fails_the_waiter() {
        let session = Arc::new(session());
        session.create_session();
        session.transport().defer_activation(true);

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.activate().await })
        };
        while !session.state().is_activating() {
            tokio::task::yield_now().await;
        }

        session.transport().deactivate();

        assert!(matches!(
            pending.await.unwrap(),
            Err(SessionError::Activation(_))
        ));
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[tokio::test]
    async fn deactivated_session_can_be_reactivated() {
        let session = active_session().await;

        session.transport().deactivate();
        assert_eq!(session.state(), SessionState::Inactive);

        session.activate().await.unwrap();
        assert!(session.is_active());
        assert_eq!(session.transport().activation_requests(), 2);
    }

    // ===========================================
    // Send
    // ===========================================

    #[tokio::test]
    async fn send_requires_active_session() {
        let session = session();
        session.create_session();
        assert_eq!(session.send(envelope()).await, Err(SessionError::NotActive));
        assert!(session.transport().sent_messages().is_empty());
    }

    #[tokio::test]
    async fn send_returns_peer_reply() {
        let session = active_session().await;

        let reply = session.send(envelope()).await.unwrap();

        assert!(reply.is_delivery_receipt());
        assert_eq!(session.transport().last_sent(), Some(envelope()));
    }

    #[tokio::test]
    async fn empty_envelope_is_not_sent() {
        let session = active_session().await;
        assert_eq!(
            session.send(MessageEnvelope::new()).await,
            Err(SessionError::EmptyEnvelope)
        );
        assert!(session.transport().sent_messages().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_typed() {
        let session = active_session().await;
        session.transport().fail_next_send("peer unreachable");

        let result = session.send(envelope()).await;
        assert_eq!(
            result,
            Err(SessionError::Send(TransportError::SendFailed(
                "peer unreachable".into()
            )))
        );

        // No retry happened, and the next send goes through
        assert_eq!(session.transport().sent_messages().len(), 1);
        session.send(envelope()).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_reply_handler_does_not_hang() {
        let session = active_session().await;
        session.transport().drop_next_reply();

        assert_eq!(
            session.send(envelope()).await,
            Err(SessionError::ReplyDropped)
        );
    }

    #[tokio::test]
    async fn second_send_while_pending_is_rejected() {
        let session = Arc::new(active_session().await);
        session.transport().hold_replies(true);

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send(envelope()).await })
        };
        while session.transport().held_replies() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            session.send(envelope()).await,
            Err(SessionError::SendInProgress)
        );

        session.transport().release_replies();
        assert!(pending.await.unwrap().is_ok());

        // The slot is free again
        session.transport().hold_replies(false);
        session.send(envelope()).await.unwrap();
    }

    // ===========================================
    // Inbound
    // ===========================================

    #[tokio::test]
    async fn inbound_messages_reach_every_subscriber() {
        let session = active_session().await;
        let mut first = session.subscribe();
        let mut second = session.subscribe();

        let reply = session.transport().push_inbound(envelope());

        assert_eq!(reply.map(|r| r.is_delivery_receipt()), Some(true));
        assert_eq!(first.recv().await.unwrap(), envelope());
        assert_eq!(second.recv().await.unwrap(), envelope());
    }

    #[test]
    fn delegate_outliving_session_is_detached() {
        let transport = MockTransport::new();
        let session = PeerSession::new(transport.clone(), &SyncConfig::default());
        session.create_session();
        drop(session);

        // Callbacks after the session is gone are ignored, not panics
        let reply = transport.push_inbound(envelope());
        assert_eq!(reply.map(|r| r.is_delivery_receipt()), Some(true));
        transport.deactivate();
        assert!(!transport.has_attached_delegate());
    }

    #[test]
    fn debug_shows_state() {
        let session = session();
        session.create_session();
        let debug = format!("{:?}", session);
        assert!(debug.contains("Created"), "got: {}", debug);
    }
}
