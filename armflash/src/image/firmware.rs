//! Decoded firmware image, laid out as a flat ROM byte array.
//!
//! All gaps between records are filled with `0xFF`, the erased state
//! of NOR flash, so sectors the image never touches still program to
//! the expected contents.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::image::hex32::HexReader;

/// Fill byte for address gaps (erased-flash value).
pub const FILL_BYTE: u8 = 0xFF;

/// Offset of the reserved vector that holds the boot checksum.
const BOOT_CHECKSUM_OFFSET: usize = 0x14;

/// The vector table spans eight 32-bit words.
const VECTOR_TABLE_LEN: usize = 0x20;

/// A fully decoded firmware image ready for sector-by-sector transfer.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    data: Vec<u8>,
    entry_point: Option<u32>,
}

impl FirmwareImage {
    /// Assemble an image by draining all data records from `reader`.
    ///
    /// Records are placed at their absolute addresses. The image grows
    /// to cover the highest address touched; bytes no record covers
    /// are [`FILL_BYTE`]. Fails with [`Error::ImageTooLarge`] if any
    /// record reaches past `rom_size`.
    pub fn from_hex(reader: &mut HexReader, rom_size: usize) -> Result<Self> {
        let mut data = Vec::new();
        while let Some(record) = reader.next_record()? {
            let start = record.address as usize;
            let end = start + record.data.len();
            if end > rom_size {
                return Err(Error::ImageTooLarge {
                    size: end,
                    rom: rom_size,
                });
            }
            if end > data.len() {
                data.resize(end, FILL_BYTE);
            }
            data[start..end].copy_from_slice(&record.data);
        }
        Ok(Self {
            data,
            entry_point: reader.entry_point(),
        })
    }

    /// Wrap raw bytes as an image.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            entry_point: None,
        }
    }

    /// Entry point from the start linear address record, if present.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Image length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The flat image contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Patch the reserved vector at `0x14` so that the eight words of
    /// the vector table sum to zero.
    ///
    /// The boot ROM refuses to run user code unless the 32-bit
    /// little-endian words at `0x00..0x20` sum to zero modulo 2^32.
    /// The word at `0x14` is reserved for exactly this purpose: it is
    /// overwritten with the two's complement of the sum of the other
    /// seven. Images shorter than the vector table are grown first.
    pub fn patch_boot_checksum(&mut self) {
        if self.data.len() < VECTOR_TABLE_LEN {
            self.data.resize(VECTOR_TABLE_LEN, FILL_BYTE);
        }
        let mut sum: u32 = 0;
        for offset in (0..VECTOR_TABLE_LEN).step_by(4) {
            if offset == BOOT_CHECKSUM_OFFSET {
                continue;
            }
            sum = sum.wrapping_add(LittleEndian::read_u32(&self.data[offset..offset + 4]));
        }
        LittleEndian::write_u32(
            &mut self.data[BOOT_CHECKSUM_OFFSET..BOOT_CHECKSUM_OFFSET + 4],
            sum.wrapping_neg(),
        );
    }

    /// Number of sectors needed to hold the image, `sector_size` bytes
    /// each. A partial trailing sector counts.
    pub fn sector_count(&self, sector_size: usize) -> usize {
        self.data.len().div_ceil(sector_size)
    }

    /// The contents of sector `index`, padded with [`FILL_BYTE`] to a
    /// full `sector_size` bytes.
    pub fn sector(&self, index: usize, sector_size: usize) -> Vec<u8> {
        let start = index * sector_size;
        let end = (start + sector_size).min(self.data.len());
        let mut out = Vec::with_capacity(sector_size);
        out.extend_from_slice(&self.data[start..end]);
        out.resize(sector_size, FILL_BYTE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTOR: usize = 4096;

    #[test]
    fn records_fill_gaps_with_erased_bytes() {
        let mut reader =
            HexReader::from_str(":03000000010203F7\n:020010000405E5\n:00000001FF\n");
        let image = FirmwareImage::from_hex(&mut reader, SECTOR).unwrap();
        assert_eq!(image.len(), 0x12);
        assert_eq!(&image.as_bytes()[..3], &[0x01, 0x02, 0x03]);
        assert!(image.as_bytes()[3..0x10].iter().all(|&b| b == FILL_BYTE));
        assert_eq!(&image.as_bytes()[0x10..], &[0x04, 0x05]);
    }

    #[test]
    fn rejects_image_past_rom_end() {
        // Places one byte at the last ROM address plus one.
        let mut reader = HexReader::from_str(":01100000AA45\n:00000001FF\n");
        let err = FirmwareImage::from_hex(&mut reader, 0x1000).unwrap_err();
        match err {
            Error::ImageTooLarge { size, rom } => {
                assert_eq!(size, 0x1001);
                assert_eq!(rom, 0x1000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exact_sector_needs_one_sector() {
        let image = FirmwareImage::from_bytes(vec![0xAB; SECTOR]);
        assert_eq!(image.sector_count(SECTOR), 1);
        assert_eq!(image.sector(0, SECTOR).len(), SECTOR);
    }

    #[test]
    fn one_byte_over_needs_two_padded_sectors() {
        let image = FirmwareImage::from_bytes(vec![0xAB; SECTOR + 1]);
        assert_eq!(image.sector_count(SECTOR), 2);
        let tail = image.sector(1, SECTOR);
        assert_eq!(tail.len(), SECTOR);
        assert_eq!(tail[0], 0xAB);
        assert!(tail[1..].iter().all(|&b| b == FILL_BYTE));
    }

    #[test]
    fn patch_of_all_zero_table_stays_zero() {
        let mut image = FirmwareImage::from_bytes(vec![0; VECTOR_TABLE_LEN]);
        image.patch_boot_checksum();
        assert_eq!(&image.as_bytes()[0x14..0x18], &[0, 0, 0, 0]);
    }

    #[test]
    fn patch_is_twos_complement_of_word_sum() {
        let mut data = vec![0; VECTOR_TABLE_LEN];
        data[0] = 1;
        let mut image = FirmwareImage::from_bytes(data);
        image.patch_boot_checksum();
        assert_eq!(&image.as_bytes()[0x14..0x18], &[0xFF, 0xFF, 0xFF, 0xFF]);
        // The patched table sums to zero.
        let sum: u32 = image.as_bytes()[..VECTOR_TABLE_LEN]
            .chunks_exact(4)
            .map(LittleEndian::read_u32)
            .fold(0u32, u32::wrapping_add);
        assert_eq!(sum, 0);
    }

    #[test]
    fn patch_grows_short_image_to_vector_table() {
        let mut image = FirmwareImage::from_bytes(vec![0x12; 4]);
        image.patch_boot_checksum();
        assert_eq!(image.len(), VECTOR_TABLE_LEN);
    }

    #[test]
    fn patch_ignores_previous_checksum_word() {
        let mut data = vec![0; VECTOR_TABLE_LEN];
        data[0x14] = 0x5A;
        let mut image = FirmwareImage::from_bytes(data);
        image.patch_boot_checksum();
        assert_eq!(&image.as_bytes()[0x14..0x18], &[0, 0, 0, 0]);
    }
}
