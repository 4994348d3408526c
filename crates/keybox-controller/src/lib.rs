//! Session control for the keybox.
//!
//! Ties the reader, the control link and the flat-file stores together:
//!
//! - [`startup`]: ID list load, device discovery and handshakes, all retried
//!   until they succeed
//! - [`SessionController`]: the single-threaded loop deciding access and
//!   handling enrollment and reset requests
//! - [`ScanAssembler`] and [`ModeMachine`]: the two pieces of session state
//! - [`KeyboxConfig`]: identities, file locations and timing
//!
//! # Example
//!
//! ```no_run
//! use keybox_controller::{KeyboxConfig, start};
//! use keybox_hardware::UsbLocator;
//!
//! # async fn example() -> keybox_controller::Result<()> {
//! let config = KeyboxConfig::default().with_base_dir("/opt/keybox");
//! let locator = UsbLocator::new(config.serial, config.control_link);
//!
//! let mut session = start(config, locator).await?;
//! session.run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod scan;
pub mod session;
pub mod startup;
pub mod state_machine;

pub use config::{KeyboxConfig, StorageConfig, TimingConfig};
pub use error::{Result, SessionError};
pub use scan::ScanAssembler;
pub use session::{SessionController, StepOutcome};
pub use startup::start;
pub use state_machine::{ModeMachine, ModeTransition};
