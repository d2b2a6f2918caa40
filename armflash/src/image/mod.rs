//! Firmware image loading and in-memory representation.

pub mod firmware;
pub mod hex32;

// Re-export for convenience
pub use firmware::{FILL_BYTE, FirmwareImage};
pub use hex32::{DataRecord, HexReader};
