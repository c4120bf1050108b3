//! MessageEnvelope - the keyed wire wrapper exchanged between paired devices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::CodecError;

/// Envelope key under which a serialized character payload travels.
pub const CHARACTER_MODEL_KEY: &str = "characterModel";

/// Envelope key of the receipt a receiver returns for every inbound message.
pub const STATUS_KEY: &str = "status";

/// Receipt value stored under [`STATUS_KEY`].
pub const DELIVERED: &[u8] = b"delivered";

/// A mapping from string keys to opaque byte blobs.
///
/// This is the unit handed to the transport. It carries no version field and
/// no type discriminator beyond its keys; receivers ignore keys they do not
/// know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageEnvelope {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MessageEnvelope {
    /// Create an empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reply a receiver sends back for every inbound message.
    pub fn delivery_receipt() -> Self {
        let mut envelope = Self::new();
        envelope.insert(STATUS_KEY, DELIVERED.to_vec());
        envelope
    }

    /// Insert a blob, returning the blob previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, blob: Vec<u8>) -> Option<Vec<u8>> {
        self.entries.insert(key.into(), blob)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_entry(mut self, key: impl Into<String>, blob: Vec<u8>) -> Self {
        self.insert(key, blob);
        self
    }

    /// Look up the blob stored under `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether this envelope carries a character payload.
    ///
    /// An envelope without one is "nothing to send".
    pub fn has_character_payload(&self) -> bool {
        self.contains_key(CHARACTER_MODEL_KEY)
    }

    /// Whether the envelope has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over the keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether this envelope is a delivery receipt.
    pub fn is_delivery_receipt(&self) -> bool {
        self.get(STATUS_KEY) == Some(DELIVERED)
    }

    /// Serialize to MessagePack bytes for byte-oriented transports.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(self).map_err(CodecError::EnvelopePack)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Envelope)
    }
}
