//! LPC2000-series ISP serial protocol.
//!
//! The boot ROM speaks a line-oriented ASCII protocol over the UART.
//! A session starts with an autobaud handshake:
//!
//! ```text
//! host:   ?
//! device: Synchronized\r\n
//! host:   Synchronized\r\n
//! device: OK\r\n
//! host:   <crystal speed>\r\n
//! device: OK\r\n
//! ```
//!
//! After that, commands are single letters with decimal arguments and
//! the ROM answers with a decimal status code line. Data for the `W`
//! command travels UU-encoded, 45 raw bytes per line, with a decimal
//! checksum line acknowledged by `OK` every 20 data lines.

use std::fmt;
use std::time::Duration;

/// Autobaud probe byte.
pub const CMD_INIT: &str = "?";

/// Handshake banner, sent by the ROM and echoed back by the host.
pub const SYNCHRONIZED: &str = "Synchronized\r\n";

/// Positive handshake/checksum acknowledgement.
pub const OK: &str = "OK\r\n";

/// Unlock command. `23130` is `0x5A5A`, the fixed unlock code.
pub const CMD_UNLOCK: &str = "U 23130\r\n";

/// Status line the ROM sends when a command succeeded.
pub const STATUS_SUCCESS: &str = "0\r\n";

/// How often the reply buffer is polled while waiting for an answer.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Whole-handshake retries before synchronization is abandoned.
pub const MAX_SYNC_ATTEMPTS: u32 = 60;

/// A checksum line is sent after this many UU data lines.
pub const CHECKSUM_EVERY_LINES: usize = 20;

/// Crystal speed line for the handshake, in kHz.
pub fn crystal(khz: u32) -> String {
    format!("{khz}\r\n")
}

/// Prepare sectors 0 through `sector` for a write operation.
///
/// The ROM re-locks sectors after every erase and copy, so this is
/// issued before each erase and again before each copy.
pub fn prepare(sector: usize) -> String {
    format!("P 0 {sector}\r\n")
}

/// Erase exactly one sector.
pub fn erase(sector: usize) -> String {
    format!("E {sector} {sector}\r\n")
}

/// Announce `count` bytes of UU data to be written to RAM at `addr`.
pub fn write_ram(addr: u32, count: usize) -> String {
    format!("W {addr} {count}\r\n")
}

/// Copy `count` bytes staged at RAM address `ram` into flash at `rom`.
pub fn copy_to_flash(rom: u32, ram: u32, count: usize) -> String {
    format!("C {rom} {ram} {count}\r\n")
}

/// Branch to address 0 in ARM mode. The ROM sends no reply.
pub fn go_arm() -> String {
    "G 0 A\r\n".to_string()
}

/// ISP status codes returned by the boot ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IspStatus {
    /// Command executed successfully.
    CmdSuccess = 0,
    /// Invalid command.
    InvalidCommand = 1,
    /// Source address is not on a word boundary.
    SrcAddrError = 2,
    /// Destination address is not on a correct boundary.
    DstAddrError = 3,
    /// Source address is not mapped in the memory map.
    SrcAddrNotMapped = 4,
    /// Destination address is not mapped in the memory map.
    DstAddrNotMapped = 5,
    /// Byte count is not multiple of 4 or is not a permitted value.
    CountError = 6,
    /// Sector number is invalid or end sector is before start sector.
    InvalidSector = 7,
    /// Sector is not blank.
    SectorNotBlank = 8,
    /// Command to prepare sector for write operation was not executed.
    SectorNotPrepared = 9,
    /// Source and destination data not equal.
    CompareError = 10,
    /// Flash programming hardware interface is busy.
    Busy = 11,
    /// Insufficient number of parameters or invalid parameter.
    ParamError = 12,
    /// Address is not on word boundary.
    AddrError = 13,
    /// Address is not mapped in the memory map.
    AddrNotMapped = 14,
    /// Command is locked.
    CmdLocked = 15,
    /// Unlock code is invalid.
    InvalidCode = 16,
    /// Invalid baud rate setting.
    InvalidBaudRate = 17,
    /// Invalid stop bit setting.
    InvalidStopBit = 18,
    /// Code read protection enabled.
    CodeReadProtectionEnabled = 19,
}

impl IspStatus {
    /// Map a numeric status code to its variant.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::CmdSuccess,
            1 => Self::InvalidCommand,
            2 => Self::SrcAddrError,
            3 => Self::DstAddrError,
            4 => Self::SrcAddrNotMapped,
            5 => Self::DstAddrNotMapped,
            6 => Self::CountError,
            7 => Self::InvalidSector,
            8 => Self::SectorNotBlank,
            9 => Self::SectorNotPrepared,
            10 => Self::CompareError,
            11 => Self::Busy,
            12 => Self::ParamError,
            13 => Self::AddrError,
            14 => Self::AddrNotMapped,
            15 => Self::CmdLocked,
            16 => Self::InvalidCode,
            17 => Self::InvalidBaudRate,
            18 => Self::InvalidStopBit,
            19 => Self::CodeReadProtectionEnabled,
            _ => return None,
        })
    }

    /// Datasheet explanation of this status code.
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::CmdSuccess => "Command executed successfully.",
            Self::InvalidCommand => "Invalid command.",
            Self::SrcAddrError => "Source address is not on a word boundary.",
            Self::DstAddrError => "Destination address is not on a correct boundary.",
            Self::SrcAddrNotMapped => {
                "Source address is not mapped in the memory map. Count value is taken in to consideration where applicable."
            },
            Self::DstAddrNotMapped => {
                "Destination address is not mapped in the memory map. Count value is taken in to consideration where applicable."
            },
            Self::CountError => "Byte count is not multiple of 4 or is not a permitted value.",
            Self::InvalidSector => {
                "Sector number is invalid or end sector number is greater than start sector number."
            },
            Self::SectorNotBlank => "Sector is not blank.",
            Self::SectorNotPrepared => {
                "Command to prepare sector for write operation was not executed."
            },
            Self::CompareError => "Source and destination data not equal.",
            Self::Busy => "Flash programming hardware interface is busy.",
            Self::ParamError => "Insufficient number of parameters or invalid parameter.",
            Self::AddrError => "Address is not on word boundary.",
            Self::AddrNotMapped => {
                "Address is not mapped in the memory map. Count value is taken in to consideration where applicable."
            },
            Self::CmdLocked => "Command is locked.",
            Self::InvalidCode => "Unlock code is invalid.",
            Self::InvalidBaudRate => "Invalid baud rate setting.",
            Self::InvalidStopBit => "Invalid stop bit setting.",
            Self::CodeReadProtectionEnabled => "Code read protection enabled.",
        }
    }
}

impl fmt::Display for IspStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", *self as u8, self.explanation())
    }
}

/// Pull a numeric status out of the tail of accumulated reply text.
///
/// Looks at the last four characters and keeps the decimal digits
/// among them, which is enough for any status line the ROM produces.
pub fn parse_status(reply: &str) -> Option<IspStatus> {
    let tail: String = reply
        .chars()
        .rev()
        .take(4)
        .filter(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    tail.parse::<u32>()
        .ok()
        .and_then(IspStatus::from_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builders_terminate_with_crlf() {
        assert_eq!(prepare(3), "P 0 3\r\n");
        assert_eq!(erase(3), "E 3 3\r\n");
        assert_eq!(write_ram(0x4000_0200, 4096), "W 1073742336 4096\r\n");
        assert_eq!(copy_to_flash(4096, 0x4000_0200, 4096), "C 4096 1073742336 4096\r\n");
        assert_eq!(go_arm(), "G 0 A\r\n");
        assert_eq!(crystal(14746), "14746\r\n");
    }

    #[test]
    fn status_codes_round_trip() {
        for code in 0..=19 {
            let status = IspStatus::from_code(code).unwrap();
            assert_eq!(status as u32, code);
        }
        assert!(IspStatus::from_code(20).is_none());
    }

    #[test]
    fn parse_status_reads_trailing_line() {
        assert_eq!(parse_status("0\r\n"), Some(IspStatus::CmdSuccess));
        assert_eq!(parse_status("8\r\n"), Some(IspStatus::SectorNotBlank));
        assert_eq!(parse_status("19\r\n"), Some(IspStatus::CodeReadProtectionEnabled));
        assert_eq!(parse_status("garbage"), None);
    }

    #[test]
    fn status_display_carries_explanation() {
        let text = IspStatus::SectorNotBlank.to_string();
        assert!(text.starts_with("8 ("));
        assert!(text.contains("not blank"));
    }
}
