//! Sync a character between two in-process devices.
//!
//! Pairs a phone and a watch over the loopback transport, edits on the
//! phone, sends, then lets the watch push a change back unasked.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use avatar_client::{ControllerEvent, LoopbackTransport, PeerSession, SyncController};
use avatar_core::{SyncFailure, SyncStatus};
use avatar_types::{AvatarCatalog, CharacterPayload};
use tokio::sync::{broadcast, watch};
use tracing::info;

use super::describe;
use crate::config::CliConfig;

/// How long to wait for the peer to apply a change.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

type Device = SyncController<LoopbackTransport>;

/// Run the demo command.
pub async fn run(config: &CliConfig) -> Result<()> {
    print!("{}", render(config).await?);
    Ok(())
}

async fn render(config: &CliConfig) -> Result<String> {
    let phone_name = config.device.name.clone();
    let (phone, watch) = pair(config, &phone_name, "watch");
    let _phone_listener = phone.spawn_inbound_listener();
    let _watch_listener = watch.spawn_inbound_listener();
    let mut out = String::new();

    // The watch app is open and reachable.
    if !watch.session().create_session() {
        bail!("watch could not create a session");
    }
    watch
        .session()
        .activate()
        .await
        .context("watch could not activate its session")?;

    // Phone → watch
    let mut watch_character = watch.watch_character();
    let mut phone_events = phone.subscribe();
    phone.set_character(config.character());
    let sent = phone.send_current().await;
    out.push_str(&status_report(
        &phone_name,
        sent,
        &statuses(&mut phone_events),
    )?);
    let received = wait_for(&mut watch_character, &phone.character()).await?;
    out.push_str(&format!("watch character: {}\n", describe(&received)));

    // Watch → phone, unsolicited
    let mut phone_character = phone.watch_character();
    phone_character.borrow_and_update();
    let mut catalog = AvatarCatalog::builtin();
    catalog.select(&received.avatar);
    let next = (catalog.selected_index() + 1) % catalog.len();
    catalog.select_index(next);
    watch.select_avatar(catalog.selected().clone());
    watch
        .send_current()
        .await
        .context("watch could not push its change")?;

    let pushed = wait_for(&mut phone_character, &watch.character()).await?;
    out.push_str(&format!("{} character: {}\n", phone_name, describe(&pushed)));
    info!("demo finished");

    Ok(out)
}

fn pair(config: &CliConfig, first: &str, second: &str) -> (Device, Device) {
    let (first_link, second_link) = LoopbackTransport::pair(first, second);
    let device = |link: LoopbackTransport, name: &str| {
        let sync = config.sync_config(name);
        SyncController::new(
            PeerSession::new(link, &sync),
            CharacterPayload::default(),
            &sync,
        )
    };
    (device(first_link, first), device(second_link, second))
}

/// The statuses a send went through, or an error if it failed.
fn status_report(
    device: &str,
    sent: Result<(), SyncFailure>,
    seen: &[SyncStatus],
) -> Result<String> {
    if let Err(failure) = sent {
        bail!("{} could not sync: {}", device, failure);
    }
    let mut out = format!("{} status:\n", device);
    for status in seen {
        out.push_str(&format!("  {}\n", status));
    }
    Ok(out)
}

fn statuses(events: &mut broadcast::Receiver<ControllerEvent>) -> Vec<SyncStatus> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::StatusChanged(status) = event {
            seen.push(status);
        }
    }
    seen
}

/// Wait until `rx` holds `expected`.
async fn wait_for(
    rx: &mut watch::Receiver<CharacterPayload>,
    expected: &CharacterPayload,
) -> Result<CharacterPayload> {
    let arrived = tokio::time::timeout(DELIVERY_TIMEOUT, rx.wait_for(|c| c == expected))
        .await
        .context("peer did not apply the change in time")?
        .context("peer controller went away")?
        .clone();
    Ok(arrived)
}
