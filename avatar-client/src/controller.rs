//! SyncController - the authoritative character state on one device.
//!
//! The presentation layer edits fields here, triggers sends, and observes
//! the results. Inbound updates from the peer replace the whole character in
//! one published change.
//!
//! # Architecture
//!
//! ```text
//! UI edits → SyncController → encode → PeerSession → transport → peer
//!                  ↑                                      │
//!                  └──── decode ← inbound listener ←──────┘
//! ```
//!
//! State is published two ways: `watch` channels hold the latest character
//! and status for renderers, and a `broadcast` stream of [`ControllerEvent`]
//! carries every transition in order.
//!
//! Local sends and inbound updates are not reconciled: whichever writes last
//! wins the character fields, and the status only tracks outbound progress.

use std::sync::Arc;

use avatar_core::{SyncFailure, SyncStatus};
use avatar_types::{
    decode, encode, AvatarSelection, CharacterAttributes, CharacterPayload, MessageEnvelope,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::session::{PeerSession, SessionError};
use crate::transport::{PeerTransport, TransportError};

/// A published change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The outbound sync status changed.
    StatusChanged(SyncStatus),
    /// The character was replaced, locally or by the peer.
    CharacterChanged(CharacterPayload),
}

struct ControllerInner<T: PeerTransport> {
    device_name: String,
    session: PeerSession<T>,
    character: watch::Sender<CharacterPayload>,
    status: watch::Sender<SyncStatus>,
    events: broadcast::Sender<ControllerEvent>,
}

/// The character state of one device and its link to the peer.
///
/// Cheap to clone; clones share state.
pub struct SyncController<T: PeerTransport> {
    inner: Arc<ControllerInner<T>>,
}

impl<T: PeerTransport> Clone for SyncController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PeerTransport> SyncController<T> {
    /// Create a controller that starts with `initial` and status Idle.
    pub fn new(session: PeerSession<T>, initial: CharacterPayload, config: &SyncConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (character, _) = watch::channel(initial);
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            inner: Arc::new(ControllerInner {
                device_name: config.device_name.clone(),
                session,
                character,
                status,
                events,
            }),
        }
    }

    // ===========================================
    // Observation
    // ===========================================

    /// Snapshot of the current character.
    pub fn character(&self) -> CharacterPayload {
        self.inner.character.borrow().clone()
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Latest-value view of the character.
    pub fn watch_character(&self) -> watch::Receiver<CharacterPayload> {
        self.inner.character.subscribe()
    }

    /// Latest-value view of the status.
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Ordered stream of every change published after this call.
    ///
    /// Dropping the receiver ends the subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.inner.events.subscribe()
    }

    /// The session this controller sends through.
    pub fn session(&self) -> &PeerSession<T> {
        &self.inner.session
    }

    // ===========================================
    // Local edits
    // ===========================================

    /// Select an avatar.
    pub fn select_avatar(&self, avatar: AvatarSelection) -> bool {
        self.update_character(|current| current.with_avatar(avatar))
    }

    /// Set the age.
    pub fn set_age(&self, age: i64) -> bool {
        self.edit_attributes(|attrs| attrs.age = age)
    }

    /// Set the height.
    pub fn set_height(&self, height: i64) -> bool {
        self.edit_attributes(|attrs| attrs.height = height)
    }

    /// Set the weight.
    pub fn set_weight(&self, weight: i64) -> bool {
        self.edit_attributes(|attrs| attrs.weight = weight)
    }

    /// Replace the whole character.
    pub fn set_character(&self, character: CharacterPayload) -> bool {
        self.update_character(|_| character)
    }

    /// Put every attribute back to its lower bound, keeping the avatar.
    pub fn reset(&self) -> bool {
        self.update_character(|current| current.with_attributes(CharacterAttributes::default()))
    }

    fn edit_attributes(&self, edit: impl FnOnce(&mut CharacterAttributes)) -> bool {
        self.update_character(|current| {
            let mut attributes = current.attributes;
            edit(&mut attributes);
            current.with_attributes(attributes)
        })
    }

    /// Publish `edit(current)` if it differs from the current character.
    ///
    /// The edit runs under the channel's write lock, so an inbound update
    /// cannot land between reading the old value and storing the new one.
    fn update_character(
        &self,
        edit: impl FnOnce(&CharacterPayload) -> CharacterPayload,
    ) -> bool {
        let events = &self.inner.events;
        self.inner.character.send_if_modified(|current| {
            let next = edit(current);
            if *current == next {
                return false;
            }
            *current = next.clone();
            // No subscribers is fine.
            let _ = events.send(ControllerEvent::CharacterChanged(next));
            true
        })
    }

    fn set_status(&self, status: SyncStatus) {
        debug!(device = %self.inner.device_name, %status, "sync status");
        self.inner.status.send_replace(status.clone());
        let _ = self.inner.events.send(ControllerEvent::StatusChanged(status));
    }

    // ===========================================
    // Outbound
    // ===========================================

    /// Send the current character on a background task.
    ///
    /// Returns immediately; progress is published as status changes. The
    /// handle may be dropped. Overlapping sends are not queued: the second
    /// one fails while the first is outstanding.
    pub fn request_send(&self) -> JoinHandle<Result<(), SyncFailure>> {
        let controller = self.clone();
        tokio::spawn(async move { controller.send_current().await })
    }

    /// Send the current character and wait for the outcome.
    ///
    /// Publishes `EstablishingConnection`, `Sending`, then `Succeeded` or
    /// `Failed`. On a device without pairing support it publishes `Failed`
    /// immediately followed by `Idle`, and nothing is sent.
    pub async fn send_current(&self) -> Result<(), SyncFailure> {
        let session = &self.inner.session;

        if !session.check_support() {
            warn!(device = %self.inner.device_name, "pairing is not supported on this device");
            self.set_status(SyncStatus::Failed(SyncFailure::CapabilityUnsupported));
            self.set_status(SyncStatus::Idle);
            return Err(SyncFailure::CapabilityUnsupported);
        }

        self.set_status(SyncStatus::EstablishingConnection);
        if !session.create_session() {
            return self.fail(SyncFailure::Activation(
                "session could not be created".to_string(),
            ));
        }
        if let Err(e) = session.activate().await {
            return self.fail(activation_failure(e));
        }

        self.set_status(SyncStatus::Sending);
        let payload = self.character();
        let envelope = encode(&payload);
        if !envelope.has_character_payload() {
            return self.fail(SyncFailure::Send("nothing to send".to_string()));
        }

        match session.send(envelope).await {
            Ok(_reply) => {
                info!(device = %self.inner.device_name, avatar = %payload.avatar, "character sent to peer");
                self.set_status(SyncStatus::Succeeded);
                Ok(())
            }
            Err(e) => self.fail(send_failure(e)),
        }
    }

    fn fail(&self, failure: SyncFailure) -> Result<(), SyncFailure> {
        warn!(device = %self.inner.device_name, error = %failure, "sync failed");
        self.set_status(SyncStatus::Failed(failure.clone()));
        Err(failure)
    }

    // ===========================================
    // Inbound
    // ===========================================

    /// Apply one envelope from the peer.
    ///
    /// Returns true if it carried a character, which then replaces the local
    /// one in a single change. Anything else is ignored without touching
    /// the status.
    pub fn apply_inbound(&self, envelope: &MessageEnvelope) -> bool {
        match decode(envelope) {
            Some(payload) => {
                debug!(device = %self.inner.device_name, avatar = %payload.avatar, "character received from peer");
                self.set_character(payload);
                true
            }
            None => false,
        }
    }

    /// Apply every envelope the session receives from now on.
    ///
    /// The task holds only a weak reference to the controller and ends once
    /// the controller is dropped. Abort the handle to stop it earlier.
    pub fn spawn_inbound_listener(&self) -> JoinHandle<()> {
        let mut inbound = self.inner.session.subscribe();
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(envelope) => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        SyncController { inner }.apply_inbound(&envelope);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "inbound listener lagged; envelopes dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("inbound listener stopped");
        })
    }
}

fn activation_failure(error: SessionError) -> SyncFailure {
    match error {
        SessionError::Unsupported => SyncFailure::CapabilityUnsupported,
        SessionError::Activation(reason) => SyncFailure::Activation(reason),
        other => SyncFailure::Activation(other.to_string()),
    }
}

fn send_failure(error: SessionError) -> SyncFailure {
    match error {
        SessionError::Send(TransportError::SendFailed(reason)) => SyncFailure::Send(reason),
        SessionError::Send(transport) => SyncFailure::Send(transport.to_string()),
        other => SyncFailure::Send(other.to_string()),
    }
}
