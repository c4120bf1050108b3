//! Error types for the character codec.

use thiserror::Error;

/// Why a payload could not be moved into or out of an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The envelope carries no character payload key.
    #[error("envelope has no `{0}` entry")]
    MissingKey(&'static str),

    /// JSON serialization of the payload failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The payload blob is not a well-formed character payload
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The envelope bytes are not valid MessagePack
    #[error("envelope decoding failed: {0}")]
    Envelope(#[source] rmp_serde::decode::Error),

    /// The envelope could not be packed into MessagePack
    #[error("envelope encoding failed: {0}")]
    EnvelopePack(#[source] rmp_serde::encode::Error),
}
