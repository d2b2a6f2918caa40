//! Flash job description and argument-group parsing.
//!
//! The CLI accepts any number of jobs, each as a group of five tokens:
//!
//! ```text
//! <port> <firmware.hex> <baud> <crystal-khz> <device>
//! ```
//!
//! All jobs are parsed up front so a typo in the last group is caught
//! before the first port is even opened.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Tokens per job group.
pub const JOB_ARITY: usize = 5;

/// Baud rates the boot ROM autobaud handshake is known to work at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaudRate {
    /// 9600 baud.
    B9600,
    /// 19200 baud.
    B19200,
    /// 38400 baud.
    B38400,
    /// 57600 baud.
    B57600,
    /// 115200 baud.
    B115200,
}

impl BaudRate {
    /// The numeric rate.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        match self {
            Self::B9600 => 9600,
            Self::B19200 => 19200,
            Self::B38400 => 38400,
            Self::B57600 => 57600,
            Self::B115200 => 115_200,
        }
    }
}

impl FromStr for BaudRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "9600" => Ok(Self::B9600),
            "19200" => Ok(Self::B19200),
            "38400" => Ok(Self::B38400),
            "57600" => Ok(Self::B57600),
            "115200" => Ok(Self::B115200),
            other => Err(Error::InvalidJob(format!("unsupported baud rate {other}"))),
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// One device to program.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashJob {
    /// Serial port path.
    pub port: String,
    /// Firmware file to flash.
    pub firmware: PathBuf,
    /// Line speed for the session.
    pub baud: BaudRate,
    /// Crystal frequency the target runs at.
    pub crystal_khz: u32,
    /// Device name, resolved against the registry before flashing.
    pub device: String,
}

/// Parse raw CLI tokens into jobs, five tokens per job.
pub fn parse_jobs(tokens: &[String]) -> Result<Vec<FlashJob>> {
    if tokens.is_empty() {
        return Err(Error::InvalidJob("no jobs given".to_string()));
    }
    if tokens.len() % JOB_ARITY != 0 {
        return Err(Error::InvalidJob(format!(
            "expected groups of {JOB_ARITY} tokens (port firmware baud crystal device), got {} tokens",
            tokens.len()
        )));
    }

    tokens
        .chunks_exact(JOB_ARITY)
        .map(|group| {
            let crystal_khz = group[3]
                .parse::<u32>()
                .map_err(|_| {
                    Error::InvalidJob(format!("bad crystal frequency {:?}", group[3]))
                })?;
            Ok(FlashJob {
                port: group[0].clone(),
                firmware: PathBuf::from(&group[1]),
                baud: group[2].parse()?,
                crystal_khz,
                device: group[4].clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn parses_two_groups() {
        let jobs = parse_jobs(&tokens(&[
            "/dev/ttyS0", "a.hex", "38400", "14746", "LPC2103",
            "/dev/ttyS1", "b.hex", "9600", "12000", "LPC2103",
        ]))
        .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].port, "/dev/ttyS0");
        assert_eq!(jobs[0].baud, BaudRate::B38400);
        assert_eq!(jobs[1].crystal_khz, 12000);
        assert_eq!(jobs[1].firmware, PathBuf::from("b.hex"));
    }

    #[test]
    fn rejects_incomplete_group() {
        let err = parse_jobs(&tokens(&["/dev/ttyS0", "a.hex", "38400"])).unwrap_err();
        assert!(matches!(err, Error::InvalidJob(_)));
    }

    #[test]
    fn rejects_unknown_baud() {
        let err = parse_jobs(&tokens(&["/dev/ttyS0", "a.hex", "250000", "14746", "LPC2103"]))
            .unwrap_err();
        assert!(
            matches!(err, Error::InvalidJob(ref reason) if reason.contains("baud"))
        );
    }

    #[test]
    fn rejects_non_numeric_crystal() {
        let err = parse_jobs(&tokens(&["/dev/ttyS0", "a.hex", "9600", "fast", "LPC2103"]))
            .unwrap_err();
        assert!(
            matches!(err, Error::InvalidJob(ref reason) if reason.contains("crystal"))
        );
    }

    #[test]
    fn rejects_empty_token_list() {
        assert!(parse_jobs(&[]).is_err());
    }
}
