//! CLI command implementations.

pub mod avatars;
pub mod decode;
pub mod demo;
pub mod encode;

use avatar_types::CharacterPayload;

/// One-line summary of a character.
pub fn describe(payload: &CharacterPayload) -> String {
    let attrs = &payload.attributes;
    format!(
        "{} (age {}, height {}, weight {})",
        payload.avatar, attrs.age, attrs.height, attrs.weight
    )
}
