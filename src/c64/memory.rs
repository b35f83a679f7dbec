// C64 memory bus: 64 KiB of flat RAM with SID write interception.
//
// Reads never intercept. A read from $D400-$D7FF returns whatever RAM holds
// there (normally zero), not the chip's register value. Replay code only
// writes the SID, so the asymmetry is kept as is.

use super::sid_port::{SidPort, SID_REG_COUNT};

pub const MEMORY_SIZE: usize = 0x10000;

/// Mask/match pair selecting the 1 KiB SID window $D400-$D7FF.
const SID_WINDOW_MASK: u16 = 0xFC00;
const SID_WINDOW_BASE: u16 = 0xD400;
/// The window mirrors the 32 SID registers every 32 bytes.
const SID_REG_MASK: u16 = SID_REG_COUNT as u16 - 1;

/// True if a write to `addr` goes to the SID instead of RAM.
#[inline]
pub fn is_sid_address(addr: u16) -> bool {
    addr & SID_WINDOW_MASK == SID_WINDOW_BASE
}

// ─────────────────────────────────────────────────────────────────────────────
//  Memory bus
// ─────────────────────────────────────────────────────────────────────────────

pub struct Memory<S: SidPort> {
    ram: Box<[u8; MEMORY_SIZE]>,
    sid: S,
}

impl<S: SidPort> Memory<S> {
    /// Zeroed RAM, SID writes forwarded to `sid`.
    pub fn new(sid: S) -> Self {
        Self {
            ram: Box::new([0u8; MEMORY_SIZE]),
            sid,
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        if is_sid_address(addr) {
            let reg = (addr & SID_REG_MASK) as u8;
            log::trace!("SID ${addr:04X} -> reg ${reg:02X} = ${value:02X}");
            self.sid.poke(reg, value);
        } else {
            self.ram[addr as usize] = value;
        }
    }

    /// Little-endian word at `addr`; the high byte comes from `addr + 1`
    /// with 16-bit wraparound.
    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Copy `data` to RAM at `dest`. Anything reaching $FFFF or beyond is
    /// dropped as a whole: no partial copy, no error. SID interception does
    /// not apply.
    pub fn bulk_copy(&mut self, dest: u16, data: &[u8]) {
        let start = dest as usize;
        if !fits(start, data.len()) {
            log::debug!(
                "bulk copy of {} bytes to ${dest:04X} dropped (past end of memory)",
                data.len()
            );
            return;
        }
        self.ram[start..start + data.len()].copy_from_slice(data);
    }

    /// Fill `len` bytes at `dest` with `value`, under the same drop rule
    /// as [`Memory::bulk_copy`].
    pub fn bulk_fill(&mut self, dest: u16, value: u8, len: usize) {
        let start = dest as usize;
        if !fits(start, len) {
            log::debug!("bulk fill of {len} bytes at ${dest:04X} dropped (past end of memory)");
            return;
        }
        self.ram[start..start + len].fill(value);
    }

    /// Zero all of RAM.
    pub fn clear(&mut self) {
        self.ram.fill(0);
    }

    /// Raw view of RAM.
    pub fn ram(&self) -> &[u8] {
        &self.ram[..]
    }

    pub fn sid(&self) -> &S {
        &self.sid
    }

    pub fn sid_mut(&mut self) -> &mut S {
        &mut self.sid
    }

    pub fn into_sid(self) -> S {
        self.sid
    }
}

/// Bulk transfers must end strictly below $10000.
#[inline]
fn fits(start: usize, len: usize) -> bool {
    start + len < MEMORY_SIZE
}
