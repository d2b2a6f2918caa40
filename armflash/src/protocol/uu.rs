//! UU encoding for the bootloader's text-only data channel.
//!
//! The ISP bootloader accepts flash data as printable lines: a length
//! character followed by the payload expanded from 3 bytes into 4
//! six-bit characters.
//!
//! ## Line Format
//!
//! ```text
//! +--------+----------------------------+
//! | Length |    Encoded payload         |
//! +--------+----------------------------+
//! | 1 char | 4 chars per 3 input bytes  |
//! +--------+----------------------------+
//! | 0x20+n | each char: 0x20 + 6 bits   |
//! +--------+----------------------------+
//! ```
//!
//! Two quirks inherited from classic uuencoding: a six-bit value of zero
//! is transmitted as `` ` `` (0x60) rather than space, and an empty
//! payload is a bare 0x60 length character. The CR/LF terminator is the
//! caller's responsibility, not the codec's.

use crate::error::{Error, Result};

/// Maximum payload bytes per encoded line.
pub const UU_MAX_LINE_BYTES: usize = 45;

/// Bias added to every six-bit value (and to the length prefix).
const BIAS: u8 = 0x20;

/// Substitute character for a biased value of exactly zero.
const ZERO_SUB: u8 = 0x60;

fn bias(v: u8) -> char {
    if v == 0 { ZERO_SUB as char } else { (v + BIAS) as char }
}

fn unbias(c: u8) -> u8 {
    if c == ZERO_SUB { 0 } else { c.wrapping_sub(BIAS) }
}

/// Encode up to [`UU_MAX_LINE_BYTES`] bytes into one printable line.
///
/// A trailing partial group of 1 or 2 bytes is padded with zero bytes;
/// the length prefix tells the decoder how many bytes are meaningful.
pub fn encode(data: &[u8]) -> String {
    debug_assert!(data.len() <= UU_MAX_LINE_BYTES);

    let mut line = String::with_capacity(1 + data.len().div_ceil(3) * 4);
    // Length prefix follows the same zero substitution as payload chars.
    line.push(bias(data.len() as u8));

    for group in data.chunks(3) {
        let b0 = group[0];
        let b1 = group.get(1).copied().unwrap_or(0);
        let b2 = group.get(2).copied().unwrap_or(0);

        line.push(bias(b0 >> 2));
        line.push(bias(((b0 & 0x03) << 4) | (b1 >> 4)));
        line.push(bias(((b1 & 0x0F) << 2) | ((b2 & 0xC0) >> 6)));
        line.push(bias(b2 & 0x3F));
    }

    line
}

/// Decode one printable line into `out`, returning the payload length.
///
/// The input must be a bare encoded line (no CR/LF) of length 4n+1;
/// anything else is [`Error::DecodeLength`]. `out` must hold the
/// declared payload or [`Error::BufferTooSmall`] is returned.
pub fn decode(line: &str, out: &mut [u8]) -> Result<usize> {
    let bytes = line.as_bytes();

    if bytes.len() % 4 != 1 {
        return Err(Error::DecodeLength(bytes.len()));
    }

    let declared = unbias(bytes[0]) as usize;
    if declared > out.len() {
        return Err(Error::BufferTooSmall {
            need: declared,
            have: out.len(),
        });
    }

    let mut k = 0;
    for group in bytes[1..].chunks_exact(4) {
        let c: [u8; 4] = [
            unbias(group[0]),
            unbias(group[1]),
            unbias(group[2]),
            unbias(group[3]),
        ];

        let decoded = [
            (c[0] << 2) | ((c[1] & 0x30) >> 4),
            ((c[1] & 0x0F) << 4) | ((c[2] & 0x3C) >> 2),
            ((c[2] & 0x03) << 6) | c[3],
        ];

        for b in decoded {
            if k < declared {
                out[k] = b;
                k += 1;
            }
        }
    }

    if k < declared {
        // Fewer encoded groups than the prefix promised.
        return Err(Error::DecodeLength(bytes.len()));
    }

    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty() {
        // Empty payload is a bare 0x60 length character.
        assert_eq!(encode(&[]), "`");
    }

    #[test]
    fn test_encode_full_line_length() {
        let data = [0xAB; UU_MAX_LINE_BYTES];
        let line = encode(&data);
        // 1 length char + 60 payload chars
        assert_eq!(line.len(), 61);
        assert_eq!(line.as_bytes()[0], 0x20 + 45);
    }

    #[test]
    fn test_encode_is_printable() {
        let data: Vec<u8> = (0..=255u8).collect();
        for chunk in data.chunks(UU_MAX_LINE_BYTES) {
            for &c in encode(chunk).as_bytes() {
                assert!((0x20..=0x60).contains(&c), "non-printable 0x{c:02x}");
            }
        }
    }

    #[test]
    fn test_zero_bytes_use_backtick() {
        // Three zero bytes expand to four zero six-bit values.
        assert_eq!(encode(&[0, 0, 0]), "#````");
    }

    #[test]
    fn test_round_trip_all_lengths() {
        for n in 0..=UU_MAX_LINE_BYTES {
            let data: Vec<u8> = (0..n as u8).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();
            let line = encode(&data);
            let mut out = [0u8; UU_MAX_LINE_BYTES];
            let len = decode(&line, &mut out).expect("decode should succeed");
            assert_eq!(&out[..len], &data[..], "round trip failed at n={n}");
        }
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let mut out = [0u8; 45];
        assert!(matches!(
            decode("!abc", &mut out),
            Err(Error::DecodeLength(4))
        ));
        assert!(matches!(
            decode("", &mut out),
            Err(Error::DecodeLength(0))
        ));
    }

    #[test]
    fn test_decode_rejects_small_buffer() {
        let line = encode(&[1, 2, 3, 4, 5, 6]);
        let mut out = [0u8; 4];
        assert!(matches!(
            decode(&line, &mut out),
            Err(Error::BufferTooSmall { need: 6, have: 4 })
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        // Length prefix claims 6 bytes but only one group follows.
        let mut line = encode(&[1, 2, 3, 4, 5, 6]);
        line.truncate(5);
        let mut out = [0u8; 45];
        assert!(decode(&line, &mut out).is_err());
    }

    #[test]
    fn test_partial_group_padding_ignored() {
        // 1-byte payload: padding bytes must not leak into the output.
        let line = encode(&[0xFF]);
        let mut out = [0u8; 45];
        let len = decode(&line, &mut out).unwrap();
        assert_eq!(len, 1);
        assert_eq!(out[0], 0xFF);
    }
}
