//! Session controller.
//!
//! One loop multiplexes the reader and the control link. Each
//! [`step`](SessionController::step) waits for whichever is ready first,
//! preferring the reader, or for the idle tick:
//!
//! - reader key: fed to the [`ScanAssembler`]; a completed scan is enrolled
//!   or checked depending on the mode, recorded in the access log, and the
//!   log is trimmed
//! - link line: `UPDATE_MODE` enters enrollment, `DELETE_MODE` wipes the
//!   list and the log, anything else is logged and ignored
//! - link failure: close, probe once for the link, terminate if not found
//! - reader failure: terminate
//!
//! Settle delays are awaited inline, so the loop does nothing else while a
//! peer is given time to react.

use keybox_core::{AccessOutcome, AuthorizedEntry, SessionMode, TagId};
use keybox_hardware::traits::{ControlLink, DeviceLocator, KeySource};
use keybox_hardware::{AnyControlLink, AnyKeySource, HardwareError, KeyInput};
use keybox_protocol::{Command, InboundMessage};
use keybox_storage::{AccessLog, AuthorizationStore, AuthorizedSet};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::KeyboxConfig;
use crate::error::{Result, SessionError};
use crate::scan::ScanAssembler;
use crate::state_machine::ModeMachine;

/// What a single [`SessionController::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The tick elapsed with nothing to read.
    Idle,

    /// A key was consumed without completing a scan.
    Key,

    /// A scan completed and was handled.
    Scan { tag: TagId, outcome: AccessOutcome },

    /// An inbound line was handled.
    Message(InboundMessage),

    /// The link failed and was replaced.
    Reconnected,
}

enum Wake {
    Key(keybox_hardware::Result<KeyInput>),
    Line(keybox_hardware::Result<InboundMessage>),
    Tick,
}

/// Controller owning both devices, the stores and the session mode.
pub struct SessionController<L> {
    config: KeyboxConfig,
    locator: L,
    link: AnyControlLink,
    reader: AnyKeySource,
    store: AuthorizationStore,
    log: AccessLog,
    authorized: AuthorizedSet,
    modes: ModeMachine,
    scan: ScanAssembler,
    reconnects: u64,
}

impl<L: DeviceLocator> SessionController<L> {
    /// Assemble a session from already acquired devices.
    ///
    /// Normally called by [`start`](crate::startup::start) once the
    /// handshakes are done.
    pub fn new(
        config: KeyboxConfig,
        locator: L,
        link: AnyControlLink,
        reader: AnyKeySource,
        authorized: AuthorizedSet,
    ) -> Self {
        let store = config.storage.authorization_store();
        let log = config.storage.access_log();

        Self {
            config,
            locator,
            link,
            reader,
            store,
            log,
            authorized,
            modes: ModeMachine::new(),
            scan: ScanAssembler::new(),
            reconnects: 0,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.modes.current()
    }

    pub fn authorized(&self) -> &AuthorizedSet {
        &self.authorized
    }

    /// Digits typed since the last terminator.
    pub fn pending_scan(&self) -> &str {
        self.scan.pending()
    }

    /// Number of successful link reconnects.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Run until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the session: a lost link, a reader
    /// failure or a storage failure.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            link = %self.link.info().name,
            reader = %self.reader.info().name,
            authorized = self.authorized.len(),
            "Session started"
        );

        loop {
            self.step().await?;
        }
    }

    /// Wait for one event and handle it.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let tick = self.config.timing.tick();

        let wake = tokio::select! {
            biased;
            key = self.reader.next_key() => Wake::Key(key),
            line = self.link.recv() => Wake::Line(line),
            () = sleep(tick) => Wake::Tick,
        };

        match wake {
            Wake::Key(Ok(key)) => match self.scan.push(key) {
                Some(tag) => {
                    let outcome = self.handle_scan(&tag).await?;
                    Ok(StepOutcome::Scan { tag, outcome })
                }
                None => Ok(StepOutcome::Key),
            },
            Wake::Key(Err(e)) => {
                error!(device = %self.reader.info().name, "Reader failed: {}", e);
                Err(SessionError::reader(e))
            }
            Wake::Line(Ok(message)) => {
                self.handle_message(&message).await?;
                Ok(StepOutcome::Message(message))
            }
            Wake::Line(Err(e)) => {
                self.reconnect(e).await?;
                Ok(StepOutcome::Reconnected)
            }
            Wake::Tick => Ok(StepOutcome::Idle),
        }
    }

    async fn handle_scan(&mut self, tag: &TagId) -> Result<AccessOutcome> {
        info!(%tag, mode = %self.modes.current(), "Detected RFID");

        let outcome = if self.modes.is_enrolling() {
            self.enroll(tag).await?
        } else {
            self.check_access(tag).await?
        };

        self.log.record(tag, outcome)?;
        self.log.trim()?;
        Ok(outcome)
    }

    async fn enroll(&mut self, tag: &TagId) -> Result<AccessOutcome> {
        let entry = AuthorizedEntry::enroll_now(tag.clone());
        info!(%entry, "Adding ID to list");

        self.store.append(&entry)?;
        self.authorized = self.store.load()?;

        self.send(Command::ExitUpdate).await?;
        let enrolling_ms = self.modes.time_in_current_mode().as_millis() as u64;
        self.modes.transition_to(SessionMode::Normal)?;
        info!(%tag, enrolling_ms, "Enrollment complete");
        sleep(self.config.timing.enrollment_settle()).await;

        Ok(AccessOutcome::Enrolled)
    }

    async fn check_access(&mut self, tag: &TagId) -> Result<AccessOutcome> {
        if !self.authorized.contains(tag) {
            info!(%tag, "Access denied");
            self.send(Command::NoAccess).await?;
            return Ok(AccessOutcome::Denied);
        }

        info!(%tag, "Access granted");
        if self.send(Command::OpenLock).await? {
            self.await_lock_response().await?;
        }
        Ok(AccessOutcome::Granted)
    }

    /// Read the microcontroller's reply to `OPEN_LOCK`, bounded in time.
    ///
    /// The reply is logged and consumed; it is not dispatched as a command.
    async fn await_lock_response(&mut self) -> Result<()> {
        let limit = self.config.timing.lock_response_timeout();

        match timeout(limit, self.link.recv()).await {
            Ok(Ok(response)) => info!(%response, "Lock response"),
            Ok(Err(e)) => self.reconnect(e).await?,
            Err(_) => warn!(timeout_ms = limit.as_millis() as u64, "No lock response"),
        }
        Ok(())
    }

    async fn handle_message(&mut self, message: &InboundMessage) -> Result<()> {
        debug!(%message, "Control link message");

        match message {
            InboundMessage::UpdateMode => {
                info!("Entering enrollment mode");
                self.modes.transition_to(SessionMode::Enrollment)?;
                sleep(self.config.timing.update_settle()).await;
                self.send(Command::UpdateReady).await?;
            }
            InboundMessage::DeleteMode => {
                info!("Deleting all IDs and logs");
                self.store.wipe()?;
                self.log.wipe()?;
                self.send(Command::IdResetComplete).await?;
                self.authorized = self.store.load()?;
                info!("IDs and logs have been deleted");
            }
            InboundMessage::Other(line) => {
                warn!(message = %line, "Unknown message from control link");
            }
        }
        Ok(())
    }

    /// Write a command, falling back to the reconnect policy on failure.
    ///
    /// Returns `false` if the write failed and the link was replaced; the
    /// command is not re-sent on the new link.
    async fn send(&mut self, command: Command) -> Result<bool> {
        match self.link.send(command).await {
            Ok(()) => {
                debug!(%command, "Command sent");
                Ok(true)
            }
            Err(e) => {
                warn!(%command, "Command write failed: {}", e);
                self.reconnect(e).await?;
                Ok(false)
            }
        }
    }

    /// Close the failed link and probe for it exactly once.
    async fn reconnect(&mut self, cause: HardwareError) -> Result<()> {
        warn!(
            device = %self.link.info().name,
            "Control link disconnected ({}), trying to reconnect",
            cause
        );

        if let Err(e) = self.link.close().await {
            debug!("Error closing failed link: {}", e);
        }

        let identity = self.config.control_link;
        let reason = match self.locator.probe(identity).await {
            Ok(Some(device)) => match device.into_control_link() {
                Some(link) => {
                    self.link = link;
                    self.reconnects += 1;
                    info!(
                        device = %self.link.info().name,
                        reconnects = self.reconnects,
                        "Control link reconnected"
                    );
                    return Ok(());
                }
                None => format!("{identity} is not a serial device"),
            },
            Ok(None) => format!("no device {identity}"),
            Err(e) => format!("{identity}: {e}"),
        };

        error!(%reason, "Reconnecting failed");
        Err(SessionError::link_lost(reason))
    }
}
