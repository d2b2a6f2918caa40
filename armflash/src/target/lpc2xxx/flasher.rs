//! Sector-by-sector ISP flashing engine for LPC2000-series parts.

use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::image::{FirmwareImage, HexReader};
use crate::port::Port;
use crate::protocol::uu;
use crate::target::chip::{DeviceKind, Flasher};
use crate::target::lpc2xxx::protocol::{
    self, CHECKSUM_EVERY_LINES, CMD_INIT, CMD_UNLOCK, MAX_SYNC_ATTEMPTS, OK, POLL_INTERVAL,
    STATUS_SUCCESS, SYNCHRONIZED,
};

/// Log prefixes line up when port names are padded to this width.
const NAME_PAD: usize = 12;

/// ISP engine over any [`Port`] implementation.
///
/// Construction does not touch the wire; [`Flasher::initialize`] runs
/// the handshake and must succeed before [`Flasher::flash`].
pub struct Lpc2xxxFlasher<P: Port> {
    port: P,
    kind: DeviceKind,
    crystal_khz: u32,
    initialized: bool,
    poll_interval: Duration,
    tag: String,
}

impl<P: Port> Lpc2xxxFlasher<P> {
    /// Wrap an open port.
    pub fn new(port: P, kind: DeviceKind, crystal_khz: u32) -> Self {
        let tag = format!("{:<NAME_PAD$}", port.name());
        Self {
            port,
            kind,
            crystal_khz,
            initialized: false,
            poll_interval: POLL_INTERVAL,
            tag,
        }
    }

    /// Override the reply poll interval. Tests set this to zero so
    /// scripted ports are drained without real sleeps.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Send `cmd` and wait for `expect` to show up in the reply stream.
    ///
    /// The ROM echoes every command; the first echo of `cmd` is
    /// stripped from the accumulated reply before matching, so a
    /// command never satisfies its own expectation. An empty `expect`
    /// means fire-and-forget: the write is checked, nothing is read.
    fn send_command(&mut self, cmd: &str, expect: &str, timeout_secs: u64) -> Result<()> {
        let wrote = self
            .port
            .write(cmd.as_bytes())?;
        if wrote != cmd.len() {
            return Err(Error::ShortWrite {
                wrote,
                expected: cmd.len(),
            });
        }

        if expect.is_empty() {
            return Ok(());
        }

        let mut reps = timeout_secs * 1000 / POLL_INTERVAL.as_millis() as u64;
        let mut acc = String::new();
        let mut buf = [0u8; 256];

        loop {
            let started = Instant::now();

            match self
                .port
                .read(&mut buf)
            {
                Ok(n) if n > 0 => {
                    acc.push_str(&String::from_utf8_lossy(&buf[..n]));

                    if let Some(pos) = acc.find(cmd) {
                        acc.replace_range(pos..pos + cmd.len(), "");
                    }

                    if acc.contains(expect) {
                        return Ok(());
                    }
                },
                Ok(_) => {},
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {},
                Err(e) => return Err(Error::Io(e)),
            }

            // One poll interval per iteration. A read that blocked for
            // its timeout has already spent it; only sleep the rest.
            let elapsed = started.elapsed();
            if elapsed < self.poll_interval {
                std::thread::sleep(self.poll_interval - elapsed);
            }

            reps -= 1;
            if reps == 0 {
                if let Some(status) = protocol::parse_status(&acc) {
                    debug!("{}: last reply status was {status}", self.tag);
                }
                return Err(Error::Timeout {
                    command: cmd
                        .trim_end()
                        .to_string(),
                });
            }
        }
    }

    /// Program a decoded image sector by sector.
    ///
    /// Erase and RAM-setup failures are logged but not fatal; every
    /// other step aborts the job. The port is closed once the final
    /// `G` command has been sent.
    fn flash_image(&mut self, image: &FirmwareImage) -> Result<()> {
        let sector_size = self
            .kind
            .sector_size();
        let ram_addr = self
            .kind
            .ram_transfer_addr();
        let total_sectors = image.sector_count(sector_size);

        self.send_command(CMD_UNLOCK, STATUS_SUCCESS, 5)?;
        info!("{}: Device unlocked! Flashing starting...", self.tag);

        for cur_sector in 0..total_sectors {
            let data = image.sector(cur_sector, sector_size);

            self.port
                .clear_buffers()?;

            self.send_command(&protocol::prepare(cur_sector), STATUS_SUCCESS, 5)?;

            if let Err(e) = self.send_command(&protocol::erase(cur_sector), STATUS_SUCCESS, 5) {
                warn!("{}: Error while erasing sector {cur_sector}: {e}", self.tag);
            }

            if let Err(e) =
                self.send_command(&protocol::write_ram(ram_addr, sector_size), STATUS_SUCCESS, 5)
            {
                warn!(
                    "{}: Error while getting RAM ready for write operation: {e}",
                    self.tag
                );
            }

            self.transfer_sector(&data)?;
            info!(
                "{}: Sector {}/{total_sectors} programmed.",
                self.tag,
                cur_sector + 1
            );

            // The ROM locks sectors again after each operation.
            self.send_command(&protocol::prepare(cur_sector), STATUS_SUCCESS, 5)?;

            let rom_addr = (cur_sector * sector_size) as u32;
            self.send_command(
                &protocol::copy_to_flash(rom_addr, ram_addr, sector_size),
                STATUS_SUCCESS,
                5,
            )?;
        }

        if total_sectors > 0 {
            self.send_command(&protocol::prepare(total_sectors - 1), STATUS_SUCCESS, 5)?;
            self.send_command(&protocol::go_arm(), "", 5)?;
            info!("{}: Running in ARM mode from 0x00000000.", self.tag);
        }

        self.port
            .close()?;
        Ok(())
    }

    /// Stream one sector as UU lines with periodic checksum checkpoints.
    fn transfer_sector(&mut self, data: &[u8]) -> Result<()> {
        let chunks: Vec<&[u8]> = data
            .chunks(uu::UU_MAX_LINE_BYTES)
            .collect();
        let mut checksum: u32 = 0;
        let mut line_no = 0usize;

        for (idx, chunk) in chunks
            .iter()
            .enumerate()
        {
            line_no += 1;

            let mut line = uu::encode(chunk);
            line.push_str("\r\n");
            self.send_command(&line, "", 5)?;

            checksum += chunk
                .iter()
                .map(|&b| u32::from(b))
                .sum::<u32>();

            let is_last = idx == chunks.len() - 1;
            if line_no % CHECKSUM_EVERY_LINES == 0 || is_last {
                // Drop the echoed data lines before listening for OK.
                self.port
                    .clear_buffers()?;
                let checksum_line = format!("{checksum}\r\n");
                self.send_command(&checksum_line, OK, 5)?;
                checksum = 0;
            }
        }

        Ok(())
    }
}

impl<P: Port> Flasher for Lpc2xxxFlasher<P> {
    fn initialize(&mut self) -> Result<()> {
        self.port
            .set_timeout(POLL_INTERVAL)?;

        let crystal_line = protocol::crystal(self.crystal_khz);

        for attempt in 0..MAX_SYNC_ATTEMPTS {
            let synced = self
                .send_command(CMD_INIT, SYNCHRONIZED, 1)
                .and_then(|()| self.send_command(SYNCHRONIZED, OK, 5))
                .and_then(|()| self.send_command(&crystal_line, OK, 5));

            match synced {
                Ok(()) => {
                    self.initialized = true;
                    info!("{}: Synchronized OK.", self.tag);
                    return Ok(());
                },
                // A broken channel will not recover by retrying; hand
                // the real error back instead of a timeout label.
                Err(e @ (Error::ShortWrite { .. } | Error::Io(_) | Error::Serial(_))) => {
                    return Err(e);
                },
                Err(_) => {
                    if attempt == 0 {
                        info!(
                            "{}: Waiting to synchronize (press reset while P0.14 LOW)",
                            self.tag
                        );
                    }
                },
            }
        }

        Err(Error::SyncExhausted {
            attempts: MAX_SYNC_ATTEMPTS,
        })
    }

    fn flash(&mut self, path: &Path) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        if !matches!(
            path.extension()
                .and_then(|e| e.to_str()),
            Some("hex" | "HEX")
        ) {
            return Err(Error::UnsupportedFormat(path.to_path_buf()));
        }

        let mut reader = HexReader::open(path)?;
        reader.verify_checksums(false)?;
        info!("{}: File {} seems to be valid! CRC test passed.", self.tag, path.display());

        let mut image = FirmwareImage::from_hex(&mut reader, self.kind.rom_size())?;
        image.patch_boot_checksum();

        let result = self.flash_image(&image);
        if result.is_err() {
            self.port
                .close()
                .ok();
        }
        result
    }

    fn device_info(&self) -> Vec<String> {
        vec![
            format!("device: {}", self.kind),
            format!(
                "flash: {} KiB, {} byte sectors",
                self.kind
                    .rom_size()
                    / 1024,
                self.kind
                    .sector_size()
            ),
            format!(
                "ram: {} KiB, staging at {:#010x}",
                self.kind
                    .ram_size()
                    / 1024,
                self.kind
                    .ram_transfer_addr()
            ),
            format!("crystal: {} kHz", self.crystal_khz),
        ]
    }
}
