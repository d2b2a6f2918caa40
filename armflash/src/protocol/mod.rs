//! Wire-format codecs shared by the ISP protocol layer.

pub mod uu;

// Re-export common entry points
pub use uu::{UU_MAX_LINE_BYTES, decode, encode};
