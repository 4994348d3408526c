//! USB device discovery.
//!
//! [`UsbLocator`] finds devices by USB vendor/product id. A probe first looks
//! for a serial port with the identity; if there is none it falls back to the
//! Linux input-event devices, except for the control link identity, which is
//! only ever a serial device. Each probe is a single blocking attempt: the
//! retry policy belongs to the caller.

use keybox_core::BusIdentity;
use serialport::SerialPortType;
use tracing::{debug, info, warn};

use crate::devices::{AnyControlLink, AnyKeySource, DiscoveredDevice};
use crate::evdev_reader::EvdevReader;
use crate::serial_link::SerialControlLink;
use crate::traits::DeviceLocator;
use crate::{DeviceInfo, Result, SerialSettings};

/// Check whether an enumerated serial port carries the given USB identity.
pub fn matches_serial_identity(info: &serialport::SerialPortInfo, identity: BusIdentity) -> bool {
    matches!(
        &info.port_type,
        SerialPortType::UsbPort(usb) if identity.matches(usb.vid, usb.pid)
    )
}

/// Pick the first enumerated serial port carrying the identity.
pub fn select_serial_port(
    ports: &[serialport::SerialPortInfo],
    identity: BusIdentity,
) -> Option<&serialport::SerialPortInfo> {
    ports
        .iter()
        .find(|info| matches_serial_identity(info, identity))
}

/// Locator backed by the host's USB serial ports and input devices.
#[derive(Debug, Clone)]
pub struct UsbLocator {
    serial: SerialSettings,
    control_link: BusIdentity,
}

impl UsbLocator {
    /// Create a locator that opens serial links with `serial` settings.
    ///
    /// Probes for `control_link` never open input-event devices, so a
    /// matching input node is not grabbed away from its owner.
    pub fn new(serial: SerialSettings, control_link: BusIdentity) -> Self {
        Self {
            serial,
            control_link,
        }
    }

    /// Whether a probe for `identity` may fall back to input-event devices.
    pub fn allows_event_fallback(&self, identity: BusIdentity) -> bool {
        identity != self.control_link
    }

    /// Try to open a serial-style connection matching `identity`.
    ///
    /// Enumeration and open failures are logged and reported as not found,
    /// so the caller can fall back to the input-event path.
    pub fn find_by_serial_identity(&self, identity: BusIdentity) -> Option<SerialControlLink> {
        let ports = match serialport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(%identity, "Serial port enumeration failed: {}", e);
                return None;
            }
        };

        let port = select_serial_port(&ports, identity)?;
        info!(%identity, port = %port.port_name, "Found serial device");

        match SerialControlLink::open(&port.port_name, &self.serial) {
            Ok(link) => Some(link.with_info(
                DeviceInfo::new("Serial Control Link", port.port_name.clone())
                    .with_identity(identity),
            )),
            Err(e) => {
                warn!(%identity, port = %port.port_name, "Serial open failed: {}", e);
                None
            }
        }
    }

    /// Try to open an input-event device matching `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching device exists but cannot be grabbed.
    pub fn find_by_event_identity(&self, identity: BusIdentity) -> Result<Option<EvdevReader>> {
        for (path, device) in evdev::enumerate() {
            let input_id = device.input_id();
            if !identity.matches(input_id.vendor(), input_id.product()) {
                continue;
            }

            let name = device.name().unwrap_or("RFID Reader").to_string();
            info!(%identity, path = %path.display(), device = %name, "Found input device");

            let info = DeviceInfo::new(name, path.display().to_string()).with_identity(identity);
            return EvdevReader::open(device, &path).map(|reader| Some(reader.with_info(info)));
        }

        debug!(%identity, "No input device with identity");
        Ok(None)
    }
}

impl Default for UsbLocator {
    fn default() -> Self {
        Self::new(SerialSettings::default(), BusIdentity::control_link())
    }
}

impl DeviceLocator for UsbLocator {
    async fn probe(&mut self, identity: BusIdentity) -> Result<Option<DiscoveredDevice>> {
        if let Some(link) = self.find_by_serial_identity(identity) {
            return Ok(Some(DiscoveredDevice::Serial(AnyControlLink::Serial(link))));
        }

        if !self.allows_event_fallback(identity) {
            debug!(%identity, "No serial device for control link identity");
            return Ok(None);
        }

        Ok(self
            .find_by_event_identity(identity)?
            .map(|reader| DiscoveredDevice::Event(AnyKeySource::Evdev(reader))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::{SerialPortInfo, UsbPortInfo};

    fn usb_port(name: &str, vid: u16, pid: u16) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid,
                serial_number: None,
                manufacturer: None,
                product: None,
            }),
        }
    }

    #[test]
    fn test_matches_serial_identity() {
        let port = usb_port("/dev/ttyACM0", 0x2341, 0x0043);
        assert!(matches_serial_identity(&port, BusIdentity::control_link()));
        assert!(!matches_serial_identity(&port, BusIdentity::reader()));
    }

    #[test]
    fn test_non_usb_port_never_matches() {
        let port = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        };
        assert!(!matches_serial_identity(&port, BusIdentity::control_link()));
    }

    #[test]
    fn test_control_link_probe_skips_input_devices() {
        let locator = UsbLocator::default();
        assert!(!locator.allows_event_fallback(BusIdentity::control_link()));
        assert!(locator.allows_event_fallback(BusIdentity::reader()));

        let custom = BusIdentity::new(0x1a86, 0x7523);
        let locator = UsbLocator::new(SerialSettings::default(), custom);
        assert!(!locator.allows_event_fallback(custom));
        assert!(locator.allows_event_fallback(BusIdentity::control_link()));
    }

    #[test]
    fn test_select_serial_port_picks_first_match() {
        let ports = vec![
            usb_port("/dev/ttyUSB0", 0x1a86, 0x7523),
            usb_port("/dev/ttyACM0", 0x2341, 0x0043),
            usb_port("/dev/ttyACM1", 0x2341, 0x0043),
        ];

        let selected = select_serial_port(&ports, BusIdentity::control_link()).unwrap();
        assert_eq!(selected.port_name, "/dev/ttyACM0");
        assert!(select_serial_port(&ports, BusIdentity::reader()).is_none());
    }
}
