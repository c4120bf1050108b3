//! # avatar-types
//!
//! Payload model and wire codec for Rooh Avatar phone/watch sync.
//!
//! This crate provides the foundational types shared by both devices:
//! - [`AvatarSelection`], [`CharacterAttributes`], [`CharacterPayload`] - the synchronized state
//! - [`AvatarCatalog`] - the selectable avatars offered by the apps
//! - [`MessageEnvelope`] - keyed wire wrapper handed to the transport
//! - [`encode`] / [`decode`] - payload <-> envelope conversion
//! - [`CodecError`] - why a conversion failed

#![warn(missing_docs)]
#![warn(clippy::all)]

mod catalog;
mod codec;
mod envelope;
mod error;
mod payload;

pub use catalog::{AvatarCatalog, BUILTIN_AVATARS};
pub use codec::{decode, encode, try_decode, try_encode};
pub use envelope::{MessageEnvelope, CHARACTER_MODEL_KEY, DELIVERED, STATUS_KEY};
pub use error::CodecError;
pub use payload::{
    AvatarSelection, CharacterAttributes, CharacterPayload, AGE_RANGE, HEIGHT_RANGE,
    WEIGHT_RANGE,
};
