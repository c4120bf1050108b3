//! Encode a character into a wire envelope.

use anyhow::{Context, Result};
use avatar_types::{
    try_encode, AvatarSelection, CharacterPayload, CHARACTER_MODEL_KEY,
};
use tracing::warn;

use crate::config::CliConfig;

/// Fields given on the command line; the rest come from the config.
#[derive(Debug, Default)]
pub struct Overrides {
    pub avatar: Option<String>,
    pub age: Option<i64>,
    pub height: Option<i64>,
    pub weight: Option<i64>,
}

impl Overrides {
    fn apply(self, base: CharacterPayload) -> CharacterPayload {
        let mut attributes = base.attributes;
        attributes.age = self.age.unwrap_or(attributes.age);
        attributes.height = self.height.unwrap_or(attributes.height);
        attributes.weight = self.weight.unwrap_or(attributes.weight);
        let avatar = self
            .avatar
            .map(AvatarSelection::new)
            .unwrap_or(base.avatar);
        CharacterPayload::new(avatar, attributes)
    }
}

/// Run the encode command.
pub fn run(config: &CliConfig, overrides: Overrides) -> Result<()> {
    let payload = overrides.apply(config.character());
    print!("{}", render(&payload)?);
    Ok(())
}

/// The JSON blob and the hex MessagePack envelope, one per line.
fn render(payload: &CharacterPayload) -> Result<String> {
    if !payload.attributes.is_within_allowed_ranges() {
        // The codec carries any value; only the apps' sliders are bounded.
        warn!(attributes = ?payload.attributes, "attributes outside the apps' slider ranges");
    }

    let envelope = try_encode(payload).context("Failed to encode character")?;
    let blob = envelope
        .get(CHARACTER_MODEL_KEY)
        .context("Encoded envelope has no character payload")?;
    let bytes = envelope.to_bytes().context("Failed to pack envelope")?;

    Ok(format!(
        "payload:  {}\nenvelope: {}\n",
        String::from_utf8_lossy(blob),
        hex::encode(bytes)
    ))
}
