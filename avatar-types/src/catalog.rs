//! The avatars the apps let a user pick from.

use crate::AvatarSelection;

/// Identifiers of the avatars bundled with both apps.
pub const BUILTIN_AVATARS: [&str; 5] = ["avatar_1", "avatar_2", "avatar_3", "avatar_4", "avatar_5"];

/// An ordered list of avatars with one selected entry.
///
/// Selecting an avatar that is not in the catalog leaves the selection
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarCatalog {
    avatars: Vec<AvatarSelection>,
    selected: usize,
}

impl AvatarCatalog {
    /// Create a catalog from identifiers, selecting the first one.
    ///
    /// Returns `None` for an empty list.
    pub fn new<I, S>(identifiers: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let avatars: Vec<AvatarSelection> =
            identifiers.into_iter().map(AvatarSelection::new).collect();
        if avatars.is_empty() {
            return None;
        }
        Some(Self {
            avatars,
            selected: 0,
        })
    }

    /// The catalog shipped with the apps.
    pub fn builtin() -> Self {
        Self {
            avatars: BUILTIN_AVATARS.iter().copied().map(AvatarSelection::new).collect(),
            selected: 0,
        }
    }

    /// Number of avatars.
    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    /// Always false; a catalog holds at least one avatar.
    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }

    /// The avatar at `index`.
    pub fn get(&self, index: usize) -> Option<&AvatarSelection> {
        self.avatars.get(index)
    }

    /// Iterate over the avatars in display order.
    pub fn iter(&self) -> impl Iterator<Item = &AvatarSelection> {
        self.avatars.iter()
    }

    /// The currently selected avatar.
    pub fn selected(&self) -> &AvatarSelection {
        &self.avatars[self.selected]
    }

    /// Index of the currently selected avatar.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Index of `avatar` in the catalog.
    pub fn position(&self, avatar: &AvatarSelection) -> Option<usize> {
        self.avatars.iter().position(|a| a == avatar)
    }

    /// Select by index. Returns false if `index` is out of bounds.
    pub fn select_index(&mut self, index: usize) -> bool {
        if index >= self.avatars.len() {
            return false;
        }
        self.selected = index;
        true
    }

    /// Select by avatar. Returns false if the avatar is unknown.
    pub fn select(&mut self, avatar: &AvatarSelection) -> bool {
        match self.position(avatar) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }
}

impl Default for AvatarCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_selects_first_avatar() {
        let catalog = AvatarCatalog::builtin();
        assert_eq!(catalog.len(), BUILTIN_AVATARS.len());
        assert!(!catalog.is_empty());
        assert_eq!(catalog.selected().id(), "avatar_1");
        assert_eq!(catalog.selected_index(), 0);
    }

    #[test]
    fn empty_catalog_is_refused() {
        assert!(AvatarCatalog::new(Vec::<String>::new()).is_none());
    }

    #[test]
    fn select_index_checks_bounds() {
        let mut catalog = AvatarCatalog::new(["a", "b"]).unwrap();
        assert!(catalog.select_index(1));
        assert_eq!(catalog.selected().id(), "b");
        assert!(!catalog.select_index(2));
        assert_eq!(catalog.selected().id(), "b");
    }

    #[test]
    fn select_unknown_avatar_keeps_selection() {
        let mut catalog = AvatarCatalog::builtin();
        assert!(catalog.select(&AvatarSelection::new("avatar_3")));
        assert_eq!(catalog.selected_index(), 2);

        assert!(!catalog.select(&AvatarSelection::new("missing")));
        assert_eq!(catalog.selected().id(), "avatar_3");
    }

    #[test]
    fn position_and_get_agree() {
        let catalog = AvatarCatalog::builtin();
        let fourth = catalog.get(3).unwrap();
        assert_eq!(catalog.position(fourth), Some(3));
        assert!(catalog.get(99).is_none());
        assert_eq!(catalog.iter().count(), 5);
    }
}
