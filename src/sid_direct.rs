// Direct USB access to USBSID-Pico (cargo feature "usb").
// libusb works from userspace; on Linux a udev rule grants access.
//
// Unthreaded mode: every register write goes straight to USB, which keeps
// the frame's writes in the order the play routine issued them.

use crate::sid_device::SidDevice;
use usbsid_pico::{ClockSpeed, UsbSid};

pub struct DirectDevice {
    dev: UsbSid,
    open: bool,
}

impl DirectDevice {
    pub fn open() -> Result<Self, String> {
        let mut dev = UsbSid::new();
        dev.init(false, false)
            .map_err(|e| format!("USB init failed: {e}"))?;
        // PSID tunes are timed for the PAL machine.
        dev.set_clock_rate(ClockSpeed::Pal as i64, true);
        log::debug!("[sid-direct] USBSID-Pico opened (direct writes, PAL clock)");
        Ok(Self { dev, open: true })
    }
}

impl SidDevice for DirectDevice {
    fn name(&self) -> &str {
        "usbsid-pico"
    }

    fn write(&mut self, reg: u8, val: u8) -> Result<(), String> {
        let buf = [0x00, reg, val];
        self.dev
            .single_write(&buf)
            .map(|_| ())
            .map_err(|e| format!("USB write ${reg:02X} failed: {e}"))
    }

    fn mute(&mut self) -> Result<(), String> {
        self.dev.mute();
        Ok(())
    }

    fn reset(&mut self) -> Result<(), String> {
        self.dev.reset();
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.dev.mute();
            self.dev.reset();
            self.dev.close();
            self.open = false;
        }
    }
}

impl Drop for DirectDevice {
    fn drop(&mut self) {
        self.close();
    }
}
