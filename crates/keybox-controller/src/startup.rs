//! Startup sequence.
//!
//! Before the session loop runs, the controller needs the authorized list,
//! the control link and the reader. Each is retried at a fixed interval with
//! no upper bound: a box powered on before its peripherals simply waits.
//!
//! Order matters to the microcontroller firmware, which expects `PI_READY`
//! before `RFID_READY`:
//!
//! 1. load the ID list
//! 2. find the link, settle, send `PI_READY`
//! 3. find the reader, settle, send `RFID_READY`

use std::time::Duration;

use keybox_core::BusIdentity;
use keybox_hardware::traits::{ControlLink, DeviceLocator, KeySource};
use keybox_hardware::{AnyControlLink, AnyKeySource, DiscoveredDevice};
use keybox_protocol::Command;
use keybox_storage::{AuthorizationStore, AuthorizedSet};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::KeyboxConfig;
use crate::error::Result;
use crate::session::SessionController;

/// Load the authorized list, waiting for the file to appear.
///
/// # Errors
///
/// Returns `SessionError::Storage` for failures other than a missing file.
pub async fn load_authorized(store: &AuthorizationStore, retry: Duration) -> Result<AuthorizedSet> {
    let mut attempts: u64 = 0;

    loop {
        match store.load() {
            Ok(set) => {
                info!(path = %store.path().display(), count = set.len(), "Authorized IDs loaded");
                return Ok(set);
            }
            Err(e) if e.is_not_found() => {
                attempts += 1;
                warn!(
                    attempt = attempts,
                    "{}, retrying in {}ms",
                    e,
                    retry.as_millis()
                );
                sleep(retry).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Probe until `accept` takes a discovered device.
///
/// Probe errors and handles of the wrong kind count as not found.
async fn discover<L, T>(
    locator: &mut L,
    identity: BusIdentity,
    retry: Duration,
    role: &str,
    accept: fn(DiscoveredDevice) -> Option<T>,
) -> T
where
    L: DeviceLocator,
{
    let mut errors: u64 = 0;

    loop {
        match locator.probe(identity).await {
            Ok(Some(device)) => {
                let kind = device.kind();
                let name = device.info().name.clone();
                if let Some(found) = accept(device) {
                    info!(role, %identity, device = %name, "Device found");
                    return found;
                }
                warn!(role, %identity, kind, "Device has the wrong handle kind, ignoring");
            }
            Ok(None) => {}
            Err(e) => error!(role, %identity, "Probe failed: {}", e),
        }

        errors += 1;
        warn!(
            role,
            %identity,
            errors,
            "Device not found, retrying in {}ms",
            retry.as_millis()
        );
        sleep(retry).await;
    }
}

/// Find the microcontroller link. Only a serial-style handle is accepted.
pub async fn acquire_link<L: DeviceLocator>(
    locator: &mut L,
    identity: BusIdentity,
    retry: Duration,
) -> AnyControlLink {
    discover(
        locator,
        identity,
        retry,
        "control-link",
        DiscoveredDevice::into_control_link,
    )
    .await
}

/// Find the RFID reader. Only an input-event handle is accepted.
pub async fn acquire_reader<L: DeviceLocator>(
    locator: &mut L,
    identity: BusIdentity,
    retry: Duration,
) -> AnyKeySource {
    discover(
        locator,
        identity,
        retry,
        "reader",
        DiscoveredDevice::into_key_source,
    )
    .await
}

/// Run the full startup sequence and return a ready session.
///
/// # Errors
///
/// Returns an error if the ID list cannot be read for a reason other than
/// being missing, or if a handshake cannot be written.
pub async fn start<L: DeviceLocator>(
    config: KeyboxConfig,
    mut locator: L,
) -> Result<SessionController<L>> {
    let timing = config.timing;
    let store = config.storage.authorization_store();

    let authorized = load_authorized(&store, timing.discovery_retry()).await?;

    let mut link = acquire_link(&mut locator, config.control_link, timing.discovery_retry()).await;
    sleep(timing.link_settle()).await;
    link.send(Command::PiReady).await?;
    info!(device = %link.info().name, "Control link ready");

    let reader = acquire_reader(&mut locator, config.reader, timing.discovery_retry()).await;
    sleep(timing.reader_settle()).await;
    link.send(Command::RfidReady).await?;
    info!(device = %reader.info().name, "Reader ready");

    Ok(SessionController::new(config, locator, link, reader, authorized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keybox_hardware::mock::MockLocator;

    #[tokio::test(start_paused = true)]
    async fn test_acquire_link_skips_event_handles() {
        let (mut locator, scripted) = MockLocator::new();
        let identity = BusIdentity::control_link();

        let _wrong = scripted.push_reader(identity);
        scripted.push_error(identity, "busy");
        let _board = scripted.push_link(identity);

        let link = acquire_link(&mut locator, identity, Duration::from_secs(5)).await;

        assert_eq!(link.info().name, "Mock Control Link");
        assert_eq!(scripted.probes(identity), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_reader_waits_between_probes() {
        let (mut locator, scripted) = MockLocator::new();
        let identity = BusIdentity::reader();
        scripted.push_missing(identity, 2);
        let _reader = scripted.push_reader(identity);

        let started = tokio::time::Instant::now();
        acquire_reader(&mut locator, identity, Duration::from_secs(5)).await;

        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
        assert_eq!(scripted.probes(identity), 3);
    }
}
