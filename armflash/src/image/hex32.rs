//! Intel HEX32 firmware file decoding.
//!
//! ## Record Format
//!
//! One record per line, ASCII hex:
//!
//! ```text
//! :LLAAAATT[DD...]CC
//! ```
//!
//! `LL` data length, `AAAA` 16-bit load offset, `TT` record type,
//! `DD` data bytes, `CC` checksum (sum of all decoded bytes on the
//! line must be zero modulo 256).
//!
//! Supported record types: `00` data, `01` end of file, `04` extended
//! linear address (upper 16 address bits for subsequent data records),
//! `05` start linear address (entry point). Anything else is rejected.

use crate::error::{Error, Result};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;

/// Data record type.
const RECTYP_DATA: u8 = 0x00;
/// End-of-file record type.
const RECTYP_EOF: u8 = 0x01;
/// Extended linear address record type.
const RECTYP_EXT_LIN_ADDR: u8 = 0x04;
/// Start linear address record type.
const RECTYP_START_LIN_ADDR: u8 = 0x05;

/// Shortest possible record: `:` + length + offset + type + checksum.
const MIN_RECORD_CHARS: usize = 11;

/// One decoded data record with its resolved absolute address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    /// Absolute target address (16-bit offset | current ULBA).
    pub address: u32,
    /// Raw data bytes.
    pub data: Vec<u8>,
}

/// A parsed record before address resolution.
enum Record {
    Data { offset: u16, data: Vec<u8> },
    EndOfFile,
    ExtendedLinearAddress(u16),
    StartLinearAddress(u32),
}

/// Reader over the records of one Intel HEX32 file.
///
/// Iteration is explicit and restartable: `next_record` yields data
/// records until the end-of-file record (or end of input), after which
/// it keeps returning `Ok(None)` until [`HexReader::rewind`] is called.
pub struct HexReader {
    lines: Vec<String>,
    pos: usize,
    /// Upper linear base address, pre-shifted into the high 16 bits.
    ulba: u32,
    entry_point: Option<u32>,
}

impl HexReader {
    /// Open a HEX file and read its records into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading HEX firmware from: {}", path.display());

        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        Ok(Self::from_str(&text))
    }

    /// Build a reader from HEX text already in memory.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|l| l.trim_end().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        Self {
            lines,
            pos: 0,
            ulba: 0,
            entry_point: None,
        }
    }

    /// The entry point (EIP) seen so far, if any.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Restart decoding from the first record.
    ///
    /// Resets the address accumulator and entry point along with the
    /// cursor, so a second pass resolves identical addresses.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.ulba = 0;
        self.entry_point = None;
    }

    /// Decode the next data record.
    ///
    /// Address-metadata records are consumed internally; only data
    /// records are returned. `Ok(None)` marks exhaustion.
    pub fn next_record(&mut self) -> Result<Option<DataRecord>> {
        while self.pos < self.lines.len() {
            let line_no = self.pos;
            self.pos += 1;

            let record = parse_record(&self.lines[line_no], line_no)?;
            match record {
                Record::Data { offset, data } => {
                    return Ok(Some(DataRecord {
                        address: u32::from(offset) | self.ulba,
                        data,
                    }));
                },
                Record::EndOfFile => {
                    debug!("End-of-file record on line {line_no}");
                    self.pos = self.lines.len();
                    return Ok(None);
                },
                Record::ExtendedLinearAddress(upper) => {
                    self.ulba = u32::from(upper) << 16;
                    debug!("ULBA: 0x{:08x}", self.ulba);
                },
                Record::StartLinearAddress(eip) => {
                    self.entry_point = Some(eip);
                    debug!("EIP:  0x{eip:08x}");
                },
            }
        }

        Ok(None)
    }

    /// Verify every record line's checksum.
    ///
    /// The sum of all decoded bytes on a line (length, offset, type,
    /// data and checksum) must be zero modulo 256. The first failing
    /// line aborts verification, reporting its 0-based number and raw
    /// text. Does not touch the record cursor, so it may be run before,
    /// after or between decoding passes with identical results.
    pub fn verify_checksums(&self, verbose: bool) -> Result<()> {
        for (line_no, line) in self.lines.iter().enumerate() {
            let payload = record_payload(line, line_no)?;

            let mut sum: u8 = 0;
            for i in (0..payload.len()).step_by(2) {
                sum = sum.wrapping_add(hex_byte(payload, i, line_no, line)?);
            }

            if sum != 0 {
                return Err(Error::ChecksumMismatch {
                    line: line_no,
                    record: line.clone(),
                });
            }

            if verbose {
                info!("line {line_no}: checksum OK");
            }
        }

        Ok(())
    }
}

/// Strip the leading `:` and validate basic shape, returning the hex
/// payload of a record line.
fn record_payload<'a>(line: &'a str, line_no: usize) -> Result<&'a str> {
    let payload = line.strip_prefix(':').ok_or_else(|| Error::MalformedRecord {
        line: line_no,
        reason: "record does not start with ':'".into(),
    })?;

    if payload.len() < MIN_RECORD_CHARS - 1 || payload.len() % 2 != 0 {
        return Err(Error::MalformedRecord {
            line: line_no,
            reason: format!("record length {} is invalid", line.len()),
        });
    }

    Ok(payload)
}

/// Decode one ASCII hex pair at `index` within `payload`.
fn hex_byte(payload: &str, index: usize, line_no: usize, line: &str) -> Result<u8> {
    payload
        .get(index..index + 2)
        .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        .ok_or_else(|| Error::MalformedRecord {
            line: line_no,
            reason: format!("invalid hex digits in {line:?}"),
        })
}

fn parse_record(line: &str, line_no: usize) -> Result<Record> {
    let payload = record_payload(line, line_no)?;

    let reclen = usize::from(hex_byte(payload, 0, line_no, line)?);
    let offset = u16::from(hex_byte(payload, 2, line_no, line)?) << 8
        | u16::from(hex_byte(payload, 4, line_no, line)?);
    let rectyp = hex_byte(payload, 6, line_no, line)?;

    // length + offset + type + checksum around the declared data bytes
    if payload.len() != (5 + reclen) * 2 {
        return Err(Error::MalformedRecord {
            line: line_no,
            reason: format!(
                "declared {} data bytes, found {}",
                reclen,
                payload.len() / 2 - 5
            ),
        });
    }

    match rectyp {
        RECTYP_DATA => {
            let mut data = Vec::with_capacity(reclen);
            for i in 0..reclen {
                data.push(hex_byte(payload, 8 + i * 2, line_no, line)?);
            }
            Ok(Record::Data { offset, data })
        },
        RECTYP_EOF => Ok(Record::EndOfFile),
        RECTYP_EXT_LIN_ADDR => {
            let upper = u16::from(hex_byte(payload, 8, line_no, line)?) << 8
                | u16::from(hex_byte(payload, 10, line_no, line)?);
            Ok(Record::ExtendedLinearAddress(upper))
        },
        RECTYP_START_LIN_ADDR => {
            let mut eip = 0u32;
            for i in 0..4 {
                eip = eip << 8 | u32::from(hex_byte(payload, 8 + i * 2, line_no, line)?);
            }
            Ok(Record::StartLinearAddress(eip))
        },
        other => Err(Error::MalformedRecord {
            line: line_no,
            reason: format!("unsupported record type 0x{other:02x}"),
        }),
    }
}
