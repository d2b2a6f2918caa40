//! LPC2000-series ISP support.

pub(super) mod flasher;
pub mod protocol;
