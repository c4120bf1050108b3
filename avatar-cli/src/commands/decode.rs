//! Decode a hex envelope back into a character.

use anyhow::{Context, Result};
use avatar_types::{try_decode, CodecError, MessageEnvelope};
use tracing::debug;

use super::describe;

/// Run the decode command.
pub fn run(envelope_hex: &str) -> Result<()> {
    print!("{}", render(envelope_hex)?);
    Ok(())
}

/// Describe the envelope's character, or say there is none.
///
/// Malformed hex or bytes that are not an envelope are errors; a
/// well-formed envelope without a character is not.
fn render(envelope_hex: &str) -> Result<String> {
    let bytes = hex::decode(envelope_hex.trim()).context("Envelope is not valid hex")?;
    let envelope = MessageEnvelope::from_bytes(&bytes).context("Bytes are not an envelope")?;

    let keys: Vec<&str> = envelope.keys().collect();
    let mut out = format!("keys: {}\n", keys.join(", "));

    match try_decode(&envelope) {
        Ok(payload) => {
            out.push_str(&format!("character: {}\n", describe(&payload)));
            if !payload.attributes.is_within_allowed_ranges() {
                out.push_str("note: attributes outside the apps' slider ranges\n");
            }
        }
        Err(e @ (CodecError::MissingKey(_) | CodecError::Deserialization(_))) => {
            debug!(error = %e, "envelope carries no character");
            out.push_str("not a character payload\n");
        }
        Err(e) => return Err(e).context("Failed to decode envelope"),
    }
    Ok(out)
}
