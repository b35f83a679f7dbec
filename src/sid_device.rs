// Platform-agnostic SID hardware trait.
//
// spi:  SpiDevice,    SID board behind a Linux spidev node, 2-byte frames.
// usb:  DirectDevice, USBSID-Pico through libusb (cargo feature "usb").
// null: NullDevice,   discards writes; dry runs and machines without a chip.

use std::path::Path;

use crate::c64::sid_port::{SidPort, SID_VOL_REG};
use crate::config::Config;

/// Common interface for SID hardware backends.
pub trait SidDevice: Send {
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Write one SID register (0x00..=0x1F).
    fn write(&mut self, reg: u8, val: u8) -> Result<(), String>;

    /// Push buffered writes out to the chip.
    fn flush(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Master volume to zero.
    fn mute(&mut self) -> Result<(), String> {
        self.write(SID_VOL_REG, 0)
    }

    /// Zero every writable register: voices, filter and volume.
    fn reset(&mut self) -> Result<(), String> {
        for reg in 0..=SID_VOL_REG {
            self.write(reg, 0)?;
        }
        Ok(())
    }

    fn close(&mut self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
//  Null backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct NullDevice {
    writes: u64,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register writes accepted so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl SidDevice for NullDevice {
    fn name(&self) -> &str {
        "null"
    }

    fn write(&mut self, reg: u8, val: u8) -> Result<(), String> {
        log::trace!("[null] ${reg:02X} = ${val:02X}");
        self.writes += 1;
        Ok(())
    }

    fn close(&mut self) {
        log::debug!("[null] closed after {} writes", self.writes);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Emulator-facing adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Feeds intercepted SID writes from the memory bus to a device.
///
/// Pokes cannot fail from the CPU's point of view, so the first transport
/// error is latched here and every later poke is dropped until the owner
/// collects it with [`DevicePort::take_error`].
pub struct DevicePort {
    dev: Box<dyn SidDevice>,
    error: Option<String>,
    failed: bool,
}

impl DevicePort {
    pub fn new(dev: Box<dyn SidDevice>) -> Self {
        Self {
            dev,
            error: None,
            failed: false,
        }
    }

    pub fn device_mut(&mut self) -> &mut dyn SidDevice {
        self.dev.as_mut()
    }

    /// The latched transport error, if any. Clears the latch so writes
    /// flow again.
    pub fn take_error(&mut self) -> Option<String> {
        self.failed = false;
        self.error.take()
    }
}

impl SidPort for DevicePort {
    fn poke(&mut self, reg: u8, value: u8) {
        if self.failed {
            return;
        }
        if let Err(e) = self.dev.write(reg, value) {
            log::error!("{} write failed: {e}", self.dev.name());
            self.error = Some(e);
            self.failed = true;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Backend selection
// ─────────────────────────────────────────────────────────────────────────────

/// Create the SidDevice named by `config.output_engine` and initialise it.
pub fn create_device(config: &Config) -> Result<Box<dyn SidDevice>, String> {
    let mut dev = open_engine(config)?;
    dev.init()?;
    log::info!("Output: {}", dev.name());
    Ok(dev)
}

fn open_engine(config: &Config) -> Result<Box<dyn SidDevice>, String> {
    match config.output_engine.as_str() {
        "null" => Ok(Box::new(NullDevice::new())),
        "spi" => Ok(Box::new(crate::sid_spi::SpiDevice::open(&config.spi_device)?)),
        "usb" => open_usb(),
        "auto" => {
            match open_usb() {
                Ok(dev) => return Ok(dev),
                Err(e) => log::debug!("USB unavailable: {e}"),
            }
            if Path::new(&config.spi_device).exists() {
                return Ok(Box::new(crate::sid_spi::SpiDevice::open(
                    &config.spi_device,
                )?));
            }
            log::warn!("No SID hardware found, writes will be discarded");
            Ok(Box::new(NullDevice::new()))
        }
        other => Err(format!(
            "Unknown output engine {other:?} (expected auto, spi, usb or null)"
        )),
    }
}

#[cfg(feature = "usb")]
fn open_usb() -> Result<Box<dyn SidDevice>, String> {
    log::debug!("Opening USBSID-Pico directly...");
    Ok(Box::new(crate::sid_direct::DirectDevice::open()?))
}

#[cfg(not(feature = "usb"))]
fn open_usb() -> Result<Box<dyn SidDevice>, String> {
    Err("built without USB support (enable the \"usb\" feature)".into())
}
