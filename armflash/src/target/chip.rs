//! Device/target abstraction for supporting multiple ARM microcontrollers.
//!
//! This module provides a trait-based abstraction over device families,
//! so the CLI and job runner can flash any supported chip through a
//! common API.

use crate::error::{Error, Result};
use crate::port::{Port, SerialConfig};
use std::fmt;
use std::path::Path;

/// Supported device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// NXP/Philips LPC2103 (ARM7TDMI-S, 32 KiB flash, 8 KiB RAM).
    #[default]
    Lpc2103,
}

impl DeviceKind {
    /// On-chip flash size in bytes.
    #[must_use]
    pub fn rom_size(&self) -> usize {
        match self {
            Self::Lpc2103 => 32 * 1024,
        }
    }

    /// On-chip RAM size in bytes.
    #[must_use]
    pub fn ram_size(&self) -> usize {
        match self {
            Self::Lpc2103 => 8 * 1024,
        }
    }

    /// Flash sector size in bytes.
    #[must_use]
    pub fn sector_size(&self) -> usize {
        match self {
            Self::Lpc2103 => 4096,
        }
    }

    /// RAM address where sector data is staged before the copy-to-flash
    /// command. Chosen past the area the boot ROM reserves for itself.
    #[must_use]
    pub fn ram_transfer_addr(&self) -> u32 {
        match self {
            Self::Lpc2103 => 0x4000_0200,
        }
    }

    /// Get the device kind from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "lpc2103" => Some(Self::Lpc2103),
            _ => None,
        }
    }

    /// Create a flasher instance for this device kind.
    ///
    /// Opens `port_name` at `baud_rate` and returns a boxed flasher
    /// ready for [`Flasher::initialize`].
    pub fn create_flasher(
        &self,
        port_name: &str,
        baud_rate: u32,
        crystal_khz: u32,
    ) -> Result<Box<dyn Flasher>> {
        match self {
            Self::Lpc2103 => {
                let config = SerialConfig::new(port_name, baud_rate)
                    .with_timeout(super::lpc2xxx::protocol::POLL_INTERVAL);
                let port = crate::port::NativePort::open(&config)?;
                Ok(Box::new(super::lpc2xxx::flasher::Lpc2xxxFlasher::new(
                    port, *self, crystal_khz,
                )))
            },
        }
    }

    /// Create a flasher with an existing port (generic, works for any
    /// [`Port`] type). Useful for testing or custom port implementations.
    pub fn create_flasher_with_port<P: Port + 'static>(
        &self,
        port: P,
        crystal_khz: u32,
    ) -> Box<dyn Flasher> {
        match self {
            Self::Lpc2103 => Box::new(super::lpc2xxx::flasher::Lpc2xxxFlasher::new(
                port, *self, crystal_khz,
            )),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lpc2103 => write!(f, "LPC2103"),
        }
    }
}

/// Registry of device kinds this build can program.
///
/// Held by value wherever it is needed; lookups go through
/// [`DeviceRegistry::resolve`].
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    supported: Vec<DeviceKind>,
}

impl DeviceRegistry {
    /// Resolve a device name to a registered kind.
    pub fn resolve(&self, name: &str) -> Result<DeviceKind> {
        DeviceKind::from_name(name)
            .filter(|kind| self.supported.contains(kind))
            .ok_or_else(|| Error::UnsupportedDevice(name.to_string()))
    }

    /// Whether `name` maps to a registered device kind.
    pub fn is_supported(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Names of all registered devices.
    pub fn device_names(&self) -> Vec<String> {
        self.supported
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self {
            supported: vec![DeviceKind::Lpc2103],
        }
    }
}

/// Trait for flashing operations across all device families.
pub trait Flasher {
    /// Connect to the boot ROM and perform the synchronization handshake.
    fn initialize(&mut self) -> Result<()>;

    /// Decode the firmware file at `path` and program it sector by
    /// sector. Requires a prior successful [`Flasher::initialize`].
    fn flash(&mut self, path: &Path) -> Result<()>;

    /// Human-readable facts about the target device.
    fn device_info(&self) -> Vec<String>;
}
