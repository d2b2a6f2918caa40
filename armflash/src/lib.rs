//! # armflash
//!
//! A library for flashing ARM microcontrollers over their serial ISP
//! boot ROM.
//!
//! This crate provides the core functionality for programming NXP
//! LPC2000-series parts, including:
//!
//! - Intel HEX32 firmware decoding and checksum verification
//! - UU transcoding for the ROM's `W` data transfer
//! - The line-oriented ISP protocol (synchronize, prepare, erase,
//!   write, copy, go)
//! - Parallel flashing of many boards, one worker per port
//!
//! ## Supported Devices
//!
//! - LPC2103 (primary support)
//! - More devices coming in future releases
//!
//! ## Features
//!
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use armflash::{DeviceRegistry, FlashJob, run_jobs};
//! use armflash::job::BaudRate;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = DeviceRegistry::default();
//!     let jobs = vec![FlashJob {
//!         port: "/dev/ttyS0".to_string(),
//!         firmware: "firmware.hex".into(),
//!         baud: BaudRate::B38400,
//!         crystal_khz: 14_746,
//!         device: "LPC2103".to_string(),
//!     }];
//!
//!     for report in run_jobs(&registry, &jobs) {
//!         match &report.result {
//!             Ok(()) => println!("{}: flashed", report.port),
//!             Err(e) => println!("{}: failed: {e}", report.port),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod image;
pub mod job;
pub mod port;
pub mod protocol;
pub mod runner;
pub mod target;

// Re-exports for convenience
pub use {
    error::{Error, Result},
    image::{FirmwareImage, HexReader},
    job::{FlashJob, parse_jobs},
    port::{NativePort, Port, PortInfo, SerialConfig, list_ports},
    runner::{JobReport, MAX_PARALLEL_JOBS, run_jobs},
    target::{DeviceKind, DeviceRegistry, Flasher},
};
