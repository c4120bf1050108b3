//! The synchronized character state.
//!
//! Field names on the wire follow the companion apps' JSON shape:
//!
//! ```text
//! {"avatarModel":{"imageName":"avatar_3"},"age":30,"height":170,"weight":70}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Allowed age, in years. Enforced by the presentation layer only.
pub const AGE_RANGE: RangeInclusive<i64> = 0..=150;

/// Allowed height, in centimetres. Enforced by the presentation layer only.
pub const HEIGHT_RANGE: RangeInclusive<i64> = 50..=220;

/// Allowed weight, in kilograms. Enforced by the presentation layer only.
pub const WEIGHT_RANGE: RangeInclusive<i64> = 40..=500;

/// Which avatar asset is active.
///
/// Equality and hashing are by identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvatarSelection {
    #[serde(rename = "imageName")]
    identifier: String,
}

impl AvatarSelection {
    /// Create a selection for the given avatar identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    /// The avatar identifier.
    pub fn id(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for AvatarSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

impl fmt::Debug for AvatarSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvatarSelection({})", self.identifier)
    }
}

/// Body attributes of the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterAttributes {
    /// Age in years.
    pub age: i64,
    /// Height in centimetres.
    pub height: i64,
    /// Weight in kilograms.
    pub weight: i64,
}

impl CharacterAttributes {
    /// Create attributes without range checks.
    pub fn new(age: i64, height: i64, weight: i64) -> Self {
        Self {
            age,
            height,
            weight,
        }
    }

    /// Whether every attribute lies inside its allowed range.
    pub fn is_within_allowed_ranges(&self) -> bool {
        AGE_RANGE.contains(&self.age)
            && HEIGHT_RANGE.contains(&self.height)
            && WEIGHT_RANGE.contains(&self.weight)
    }
}

impl Default for CharacterAttributes {
    /// The lower bound of every range, where the pickers start.
    fn default() -> Self {
        Self {
            age: *AGE_RANGE.start(),
            height: *HEIGHT_RANGE.start(),
            weight: *WEIGHT_RANGE.start(),
        }
    }
}

/// The single unit of cross-device synchronization.
///
/// Built fresh for every send and replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterPayload {
    /// Selected avatar.
    #[serde(rename = "avatarModel")]
    pub avatar: AvatarSelection,
    /// Body attributes, flattened next to the avatar on the wire.
    #[serde(flatten)]
    pub attributes: CharacterAttributes,
}

impl CharacterPayload {
    /// Create a payload from its parts.
    pub fn new(avatar: AvatarSelection, attributes: CharacterAttributes) -> Self {
        Self { avatar, attributes }
    }

    /// Return a copy with a different avatar.
    pub fn with_avatar(&self, avatar: AvatarSelection) -> Self {
        Self {
            avatar,
            attributes: self.attributes,
        }
    }

    /// Return a copy with different attributes.
    pub fn with_attributes(&self, attributes: CharacterAttributes) -> Self {
        Self {
            avatar: self.avatar.clone(),
            attributes,
        }
    }
}

impl Default for CharacterPayload {
    /// First bundled avatar with every attribute at its lower bound.
    fn default() -> Self {
        Self {
            avatar: AvatarSelection::new(crate::BUILTIN_AVATARS[0]),
            attributes: CharacterAttributes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_payload_is_the_apps_initial_state() {
        let payload = CharacterPayload::default();
        assert_eq!(payload.avatar.id(), "avatar_1");
        assert_eq!(payload.attributes, CharacterAttributes::default());
    }

    #[test]
    fn avatar_equality_is_by_identifier() {
        assert_eq!(AvatarSelection::new("avatar_1"), AvatarSelection::new("avatar_1"));
        assert_ne!(AvatarSelection::new("avatar_1"), AvatarSelection::new("avatar_2"));
        assert_eq!(AvatarSelection::new("avatar_1").id(), "avatar_1");
    }

    #[test]
    fn allowed_ranges_are_contract_constants() {
        assert_eq!(AGE_RANGE, 0..=150);
        assert_eq!(HEIGHT_RANGE, 50..=220);
        assert_eq!(WEIGHT_RANGE, 40..=500);
    }

    #[test]
    fn default_attributes_start_at_lower_bounds() {
        let attrs = CharacterAttributes::default();
        assert_eq!(attrs, CharacterAttributes::new(0, 50, 40));
        assert!(attrs.is_within_allowed_ranges());
    }

    #[test]
    fn range_check_is_inclusive() {
        assert!(CharacterAttributes::new(150, 220, 500).is_within_allowed_ranges());
        assert!(!CharacterAttributes::new(151, 170, 70).is_within_allowed_ranges());
        assert!(!CharacterAttributes::new(30, 49, 70).is_within_allowed_ranges());
        assert!(!CharacterAttributes::new(30, 170, 501).is_within_allowed_ranges());
        assert!(!CharacterAttributes::new(-1, 170, 70).is_within_allowed_ranges());
    }

    #[test]
    fn json_shape_matches_companion_apps() {
        let payload = CharacterPayload::new(
            AvatarSelection::new("avatar_3"),
            CharacterAttributes::new(30, 170, 70),
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "avatarModel": { "imageName": "avatar_3" },
                "age": 30,
                "height": 170,
                "weight": 70,
            })
        );
    }

    #[test]
    fn with_helpers_replace_one_part() {
        let payload = CharacterPayload::new(
            AvatarSelection::new("avatar_1"),
            CharacterAttributes::new(10, 100, 40),
        );
        let moved = payload.with_avatar(AvatarSelection::new("avatar_2"));
        assert_eq!(moved.avatar.id(), "avatar_2");
        assert_eq!(moved.attributes, payload.attributes);

        let older = payload.with_attributes(CharacterAttributes::new(11, 100, 40));
        assert_eq!(older.avatar, payload.avatar);
        assert_eq!(older.attributes.age, 11);
    }
}
