// SID board on an SPI bus (Linux spidev).
//
// Each register write is one 2-byte transfer: [0x80 | reg, value].
// Bit 7 of the first byte selects a write; the board latches the value
// into the chip on the falling edge of chip-select.

use std::fs::{File, OpenOptions};
use std::io::Write;

use crate::sid_device::SidDevice;

/// Write-command bit of the first frame byte.
const WRITE_CMD: u8 = 0x80;
const REG_MASK: u8 = 0x1F;

/// SPI frame for one register write.
#[inline]
pub fn frame(reg: u8, val: u8) -> [u8; 2] {
    [WRITE_CMD | (reg & REG_MASK), val]
}

pub struct SpiDevice<W: Write + Send> {
    out: W,
    label: String,
}

impl SpiDevice<File> {
    /// Open a spidev node such as `/dev/spidev0.0` for writing.
    pub fn open(path: &str) -> Result<Self, String> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| format!("Cannot open SPI device {path}: {e}"))?;
        log::debug!("[spi] opened {path}");
        Ok(Self::new(file, format!("spi:{path}")))
    }
}

impl<W: Write + Send> SpiDevice<W> {
    pub fn new(out: W, label: impl Into<String>) -> Self {
        Self {
            out,
            label: label.into(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write + Send> SidDevice for SpiDevice<W> {
    fn name(&self) -> &str {
        &self.label
    }

    fn write(&mut self, reg: u8, val: u8) -> Result<(), String> {
        // One write() per frame: spidev turns each call into one transfer.
        self.out
            .write_all(&frame(reg, val))
            .map_err(|e| format!("SPI write ${reg:02X} failed: {e}"))
    }

    fn flush(&mut self) -> Result<(), String> {
        self.out
            .flush()
            .map_err(|e| format!("SPI flush failed: {e}"))
    }

    fn close(&mut self) {
        if let Err(e) = self.mute() {
            log::warn!("[spi] mute on close failed: {e}");
        }
        if let Err(e) = self.out.flush() {
            log::warn!("[spi] flush on close failed: {e}");
        }
    }
}
