//! Hardware device layer for the keybox controller.
//!
//! This crate abstracts the two peripherals the controller talks to and the
//! way they are found:
//!
//! - [`KeySource`]: a keyboard-wedge RFID reader surfacing key-down events
//! - [`ControlLink`]: the line-oriented serial channel to the lock
//!   microcontroller
//! - [`DeviceLocator`]: single-attempt discovery by USB vendor/product id
//!
//! Real drivers live in [`evdev_reader`], [`serial_link`] and [`locator`].
//! Channel-driven mocks for all three live in [`mock`].
//!
//! # Example
//!
//! ```
//! use keybox_core::BusIdentity;
//! use keybox_hardware::mock::MockLocator;
//! use keybox_hardware::traits::{ControlLink, DeviceLocator};
//! use keybox_protocol::Command;
//!
//! #[tokio::main]
//! async fn main() -> keybox_hardware::Result<()> {
//!     let (mut locator, scripted) = MockLocator::new();
//!     let board = scripted.push_link(BusIdentity::control_link());
//!
//!     let device = locator.probe(BusIdentity::control_link()).await?;
//!     let mut link = device.and_then(|d| d.into_control_link()).unwrap();
//!
//!     link.send(Command::PiReady).await?;
//!     assert_eq!(board.sent(), vec![Command::PiReady]);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Every operation returns [`Result<T>`] with [`HardwareError`]. The session
//! controller treats any control link error as a lost link and any reader
//! error as fatal.
//!
//! [`KeySource`]: traits::KeySource
//! [`ControlLink`]: traits::ControlLink
//! [`DeviceLocator`]: traits::DeviceLocator

pub mod devices;
pub mod error;
pub mod evdev_reader;
pub mod locator;
pub mod mock;
pub mod serial_link;
pub mod traits;
pub mod types;

pub use devices::{AnyControlLink, AnyKeySource, DiscoveredDevice};
pub use error::{HardwareError, Result};
pub use locator::UsbLocator;
pub use types::{DeviceInfo, KeyInput, SerialSettings};
