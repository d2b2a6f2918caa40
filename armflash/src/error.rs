//! Error types for armflash.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for armflash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for armflash operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Firmware file could not be opened.
    #[error("Firmware file not found: {0}")]
    FileNotFound(PathBuf),

    /// Firmware file has an unsupported extension.
    #[error("Unsupported firmware format: {0} (expected .hex)")]
    UnsupportedFormat(PathBuf),

    /// Structurally invalid Intel HEX record.
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord {
        /// 0-based line number within the HEX file.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// Intel HEX line checksum failure.
    #[error("Checksum error on line {line}: {record}")]
    ChecksumMismatch {
        /// 0-based line number within the HEX file.
        line: usize,
        /// The raw offending line.
        record: String,
    },

    /// Decoded image exceeds the target's ROM size.
    #[error("Flash image too large: {size} bytes exceeds {rom} bytes of ROM")]
    ImageTooLarge {
        /// Decoded image size in bytes.
        size: usize,
        /// ROM capacity of the target device.
        rom: usize,
    },

    /// Fewer bytes written to the channel than requested.
    #[error("Short write: wrote {wrote} of {expected} bytes")]
    ShortWrite {
        /// Bytes actually written.
        wrote: usize,
        /// Bytes requested.
        expected: usize,
    },

    /// Expected reply not observed within the command's budget.
    #[error("Timeout waiting for reply to {command:?}")]
    Timeout {
        /// The command line (trimmed) whose reply never arrived.
        command: String,
    },

    /// Flash attempted before the synchronization handshake.
    #[error("Device not initialized, synchronize first")]
    NotInitialized,

    /// Synchronization handshake retry cap exceeded.
    #[error("Timed out waiting for synchronization after {attempts} attempts")]
    SyncExhausted {
        /// Number of full handshake attempts made.
        attempts: u32,
    },

    /// Flash job arguments could not be parsed.
    #[error("Invalid job arguments: {0}")]
    InvalidJob(String),

    /// Device kind not present in the support registry.
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// UU-encoded input length is not 4n+1.
    #[error("UU decode length error: {0} is not 4n+1")]
    DecodeLength(usize),

    /// Decode destination buffer is too small.
    #[error("Buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall {
        /// Bytes required.
        need: usize,
        /// Bytes available.
        have: usize,
    },
}
