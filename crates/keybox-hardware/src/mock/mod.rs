//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be driven programmatically
//! without physical hardware. Each mock comes paired with a handle that test
//! code keeps to inject input, inject failures and inspect what was written.

pub mod link;
pub mod locator;
pub mod reader;

pub use link::{MockControlLink, MockControlLinkHandle};
pub use locator::{MockLocator, MockLocatorHandle};
pub use reader::{MockKeyReader, MockKeyReaderHandle};
