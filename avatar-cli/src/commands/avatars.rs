//! List the selectable avatars.

use anyhow::Result;
use avatar_types::{AvatarCatalog, AvatarSelection};

use crate::config::CliConfig;

/// Run the avatars command.
pub fn run(config: &CliConfig) -> Result<()> {
    print!("{}", render(config));
    Ok(())
}

/// The catalog, one avatar per line, with the configured one marked.
fn render(config: &CliConfig) -> String {
    let mut catalog = AvatarCatalog::builtin();
    let configured = AvatarSelection::new(config.character.avatar.as_str());
    // An avatar outside the catalog leaves the first one selected.
    catalog.select(&configured);

    let mut out = String::new();
    for (index, avatar) in catalog.iter().enumerate() {
        let marker = if index == catalog.selected_index() {
            "*"
        } else {
            " "
        };
        out.push_str(&format!("{} {}\n", marker, avatar));
    }
    out
}
