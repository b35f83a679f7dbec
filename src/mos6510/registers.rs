// Register file and processor status flags.

use std::fmt;

/// Processor status register.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    pub const NEGATIVE: u8 = 0x80;
    pub const OVERFLOW: u8 = 0x40;
    pub const BREAK: u8 = 0x10;
    pub const DECIMAL: u8 = 0x08;
    pub const IRQ_DISABLE: u8 = 0x04;
    pub const ZERO: u8 = 0x02;
    pub const CARRY: u8 = 0x01;

    #[inline]
    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set `flag` if `cond` holds, clear it otherwise.
    #[inline]
    pub fn set(&mut self, flag: u8, cond: bool) {
        if cond {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    /// Carry as 0 or 1, for add/rotate arithmetic.
    #[inline]
    pub fn carry_bit(self) -> u8 {
        self.0 & Self::CARRY
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::NEGATIVE, 'N'),
            (Self::OVERFLOW, 'V'),
            (0x20, '-'),
            (Self::BREAK, 'B'),
            (Self::DECIMAL, 'D'),
            (Self::IRQ_DISABLE, 'I'),
            (Self::ZERO, 'Z'),
            (Self::CARRY, 'C'),
        ];
        let s: String = names
            .iter()
            .map(|&(bit, c)| if self.0 & bit != 0 { c } else { '.' })
            .collect();
        f.write_str(&s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Stack pointer; the stack lives at $0100 + s.
    pub s: u8,
    pub p: Status,
    pub pc: u16,
}

impl Registers {
    /// Power-on state: everything clear, empty stack, PC at the reset vector address.
    pub fn new() -> Self {
        Self::with_entry(0xFFFC, 0)
    }

    /// Cleared registers with the given entry point and accumulator.
    pub fn with_entry(pc: u16, a: u8) -> Self {
        Self {
            a,
            x: 0,
            y: 0,
            s: 0xFF,
            p: Status(0),
            pc,
        }
    }

    /// Update Z and N from an 8-bit result.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.p.set(Status::ZERO, value == 0);
        self.p.set(Status::NEGATIVE, value & 0x80 != 0);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} S=${:02X} P={:?}",
            self.pc, self.a, self.x, self.y, self.s, self.p
        )
    }
}
