//! Target device abstraction and per-family ISP implementations.

pub mod chip;
pub mod lpc2xxx;

pub use chip::{DeviceKind, DeviceRegistry, Flasher};
