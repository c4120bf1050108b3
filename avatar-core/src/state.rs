//! Peer session state machine.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of the session with the paired device. It takes events as input
//! and produces a new state plus a list of actions to execute.
//!
//! The actual transport calls (creating the session, requesting activation,
//! waking the caller waiting on activation) are performed by avatar-client.

/// Session lifecycle - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The device cannot pair at all. Terminal.
    Unsupported,
    /// Pairing is available but no session exists yet.
    #[default]
    Uninitialized,
    /// A session exists but was never activated.
    Created,
    /// Activation requested, waiting for the transport to report back.
    Activating,
    /// Ready to send and receive.
    Active,
    /// Peer disconnected or the session was deactivated.
    Inactive,
}

impl SessionState {
    /// Create a new state machine in the Uninitialized state.
    pub fn new() -> Self {
        Self::Uninitialized
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// Events that make no sense in the current state leave it unchanged and
    /// produce no actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Uninitialized
            (Self::Uninitialized, Event::SupportDenied) => (Self::Unsupported, vec![]),
            (Self::Uninitialized, Event::CreateRequested) => {
                (Self::Created, vec![Action::CreateSession])
            }

            // The transport refused to create the session
            (Self::Created, Event::CreateFailed) => (Self::Uninitialized, vec![]),

            // Activation may be (re)requested from any non-active session
            (Self::Created | Self::Inactive, Event::ActivateRequested) => {
                (Self::Activating, vec![Action::RequestActivation])
            }

            // From Activating
            (Self::Activating, Event::ActivationCompleted) => {
                (Self::Active, vec![Action::ResolveActivation(Ok(()))])
            }
            (Self::Activating, Event::ActivationFailed { error }) => {
                (Self::Inactive, vec![Action::ResolveActivation(Err(error))])
            }
            (Self::Activating, Event::BecameInactive | Event::Deactivated) => (
                Self::Inactive,
                vec![Action::ResolveActivation(Err(
                    "session deactivated during activation".into(),
                ))],
            ),

            // The transport may activate on its own without a waiter
            (Self::Created | Self::Inactive, Event::ActivationCompleted) => (Self::Active, vec![]),

            // From Active
            (Self::Active, Event::BecameInactive | Event::Deactivated) => {
                (Self::Inactive, vec![])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Whether a session object exists.
    pub fn has_session(&self) -> bool {
        !matches!(self, Self::Unsupported | Self::Uninitialized)
    }

    /// Whether messages can be exchanged.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether an activation is awaiting completion.
    pub fn is_activating(&self) -> bool {
        matches!(self, Self::Activating)
    }
}

/// Events that can occur in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The capability probe found no pairing support.
    SupportDenied,
    /// Caller asked for a session.
    CreateRequested,
    /// The transport could not create the session.
    CreateFailed,
    /// Caller asked for activation.
    ActivateRequested,
    /// Transport reported activation success.
    ActivationCompleted,
    /// Transport reported activation failure.
    ActivationFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Transport reported the session became inactive.
    BecameInactive,
    /// Transport reported the session was deactivated.
    Deactivated,
}

/// Actions to be executed by avatar-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create the transport session.
    CreateSession,
    /// Ask the transport to activate the session.
    RequestActivation,
    /// Wake the caller waiting on activation with this outcome.
    ResolveActivation(Result<(), String>),
}
