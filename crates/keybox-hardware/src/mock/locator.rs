//! Scripted device locator for testing.
//!
//! Each bus identity has a queue of probe outcomes. A probe pops the next
//! outcome; an empty queue means nothing is attached.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use keybox_core::BusIdentity;

use crate::devices::{AnyControlLink, AnyKeySource, DiscoveredDevice};
use crate::mock::{MockControlLink, MockControlLinkHandle, MockKeyReader, MockKeyReaderHandle};
use crate::traits::DeviceLocator;
use crate::{HardwareError, Result};

#[derive(Debug)]
enum ProbeOutcome {
    Found(DiscoveredDevice),
    Missing,
    Error(String),
}

#[derive(Debug, Default)]
struct LocatorState {
    outcomes: HashMap<BusIdentity, VecDeque<ProbeOutcome>>,
    probes: HashMap<BusIdentity, usize>,
}

/// Mock locator returning scripted probe outcomes.
#[derive(Debug, Clone, Default)]
pub struct MockLocator {
    state: Arc<Mutex<LocatorState>>,
}

impl MockLocator {
    /// Create an empty locator and its controlling handle.
    pub fn new() -> (Self, MockLocatorHandle) {
        let locator = Self::default();
        let handle = MockLocatorHandle {
            state: Arc::clone(&locator.state),
        };
        (locator, handle)
    }
}

impl DeviceLocator for MockLocator {
    async fn probe(&mut self, identity: BusIdentity) -> Result<Option<DiscoveredDevice>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| HardwareError::discovery("locator state poisoned"))?;

        *state.probes.entry(identity).or_default() += 1;

        let outcome = state
            .outcomes
            .get_mut(&identity)
            .and_then(VecDeque::pop_front);

        match outcome {
            Some(ProbeOutcome::Found(device)) => Ok(Some(device)),
            Some(ProbeOutcome::Missing) | None => Ok(None),
            Some(ProbeOutcome::Error(message)) => Err(HardwareError::discovery(message)),
        }
    }
}

/// Handle for scripting a [`MockLocator`].
///
/// # Examples
///
/// ```
/// use keybox_core::BusIdentity;
/// use keybox_hardware::mock::MockLocator;
/// use keybox_hardware::traits::DeviceLocator;
///
/// #[tokio::main]
/// async fn main() -> keybox_hardware::Result<()> {
///     let (mut locator, handle) = MockLocator::new();
///
///     handle.push_missing(BusIdentity::control_link(), 1);
///     let _link = handle.push_link(BusIdentity::control_link());
///
///     assert!(locator.probe(BusIdentity::control_link()).await?.is_none());
///     assert!(locator.probe(BusIdentity::control_link()).await?.is_some());
///     assert_eq!(handle.probes(BusIdentity::control_link()), 2);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockLocatorHandle {
    state: Arc<Mutex<LocatorState>>,
}

impl MockLocatorHandle {
    fn push(&self, identity: BusIdentity, outcome: ProbeOutcome) {
        if let Ok(mut state) = self.state.lock() {
            state.outcomes.entry(identity).or_default().push_back(outcome);
        }
    }

    /// Queue a serial-style mock link and return its handle.
    pub fn push_link(&self, identity: BusIdentity) -> MockControlLinkHandle {
        let (link, handle) = MockControlLink::new();
        self.push(
            identity,
            ProbeOutcome::Found(DiscoveredDevice::Serial(AnyControlLink::Mock(link))),
        );
        handle
    }

    /// Queue an event-style mock reader and return its handle.
    pub fn push_reader(&self, identity: BusIdentity) -> MockKeyReaderHandle {
        let (reader, handle) = MockKeyReader::new();
        self.push(
            identity,
            ProbeOutcome::Found(DiscoveredDevice::Event(AnyKeySource::Mock(reader))),
        );
        handle
    }

    /// Queue `count` probes that find nothing.
    pub fn push_missing(&self, identity: BusIdentity, count: usize) {
        for _ in 0..count {
            self.push(identity, ProbeOutcome::Missing);
        }
    }

    /// Queue a probe that fails with a discovery error.
    pub fn push_error(&self, identity: BusIdentity, message: impl Into<String>) {
        self.push(identity, ProbeOutcome::Error(message.into()));
    }

    /// Number of probes made so far for `identity`.
    pub fn probes(&self, identity: BusIdentity) -> usize {
        self.state
            .lock()
            .map(|state| state.probes.get(&identity).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_queue_reports_not_found() {
        let (mut locator, handle) = MockLocator::new();

        assert!(locator.probe(BusIdentity::reader()).await.unwrap().is_none());
        assert!(locator.probe(BusIdentity::reader()).await.unwrap().is_none());
        assert_eq!(handle.probes(BusIdentity::reader()), 2);
        assert_eq!(handle.probes(BusIdentity::control_link()), 0);
    }

    #[tokio::test]
    async fn test_outcomes_are_per_identity() {
        let (mut locator, handle) = MockLocator::new();
        let _reader = handle.push_reader(BusIdentity::reader());

        assert!(
            locator
                .probe(BusIdentity::control_link())
                .await
                .unwrap()
                .is_none()
        );

        let device = locator.probe(BusIdentity::reader()).await.unwrap().unwrap();
        assert_eq!(device.kind(), "input-event");
    }

    #[tokio::test]
    async fn test_error_outcome() {
        let (mut locator, handle) = MockLocator::new();
        handle.push_error(BusIdentity::control_link(), "permission denied");

        let err = locator.probe(BusIdentity::control_link()).await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }
}
