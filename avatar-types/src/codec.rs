//! Conversion between [`CharacterPayload`] and [`MessageEnvelope`].
//!
//! The payload is serialized as JSON and stored under
//! [`CHARACTER_MODEL_KEY`]. Decoding is all-or-nothing: a missing key, a blob
//! that is not JSON, or a blob missing any field yields no payload at all.

use tracing::{debug, warn};

use crate::{CharacterPayload, CodecError, MessageEnvelope, CHARACTER_MODEL_KEY};

/// Serialize a payload into a single-key envelope.
pub fn try_encode(payload: &CharacterPayload) -> Result<MessageEnvelope, CodecError> {
    let blob = serde_json::to_vec(payload).map_err(CodecError::Serialization)?;
    Ok(MessageEnvelope::new().with_entry(CHARACTER_MODEL_KEY, blob))
}

/// Extract a payload from an envelope.
///
/// Keys other than [`CHARACTER_MODEL_KEY`] are ignored.
pub fn try_decode(envelope: &MessageEnvelope) -> Result<CharacterPayload, CodecError> {
    let blob = envelope
        .get(CHARACTER_MODEL_KEY)
        .ok_or(CodecError::MissingKey(CHARACTER_MODEL_KEY))?;
    serde_json::from_slice(blob).map_err(CodecError::Deserialization)
}

/// Serialize a payload into an envelope.
///
/// Returns an empty envelope if serialization fails; callers must treat an
/// envelope without the payload key as nothing to send.
pub fn encode(payload: &CharacterPayload) -> MessageEnvelope {
    match try_encode(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "character payload could not be encoded");
            MessageEnvelope::new()
        }
    }
}

/// Extract a payload from an envelope, or `None` if the envelope does not
/// carry a well-formed one.
pub fn decode(envelope: &MessageEnvelope) -> Option<CharacterPayload> {
    match try_decode(envelope) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(error = %e, "ignoring envelope without a character payload");
            None
        }
    }
}
