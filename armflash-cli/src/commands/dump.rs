//! Firmware dump command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use armflash::HexReader;

/// Dump command implementation: verify and print every data record.
pub(crate) fn cmd_dump(firmware: &Path) -> Result<()> {
    if !matches!(
        firmware
            .extension()
            .and_then(|e| e.to_str()),
        Some("hex" | "HEX")
    ) {
        bail!(
            "{}: extension of the file is not .hex, no other formats supported",
            firmware.display()
        );
    }

    let mut reader = HexReader::open(firmware)
        .with_context(|| format!("couldn't open {}", firmware.display()))?;

    eprintln!("Checking the firmware checksums");
    reader
        .verify_checksums(true)
        .context("CRC test failed")?;
    eprintln!("File seems to be valid! CRC test passed.");

    while let Some(record) = reader.next_record()? {
        print!("Adr: 0x{:08x} Data:", record.address);
        for byte in &record.data {
            print!(" {byte:02x}");
        }
        println!();
    }

    if let Some(entry) = reader.entry_point() {
        println!("Entry point: 0x{entry:08x}");
    }

    Ok(())
}
