// Operand resolution for the thirteen addressing modes.
//
// Three entry points, one per way an instruction touches its operand:
//
// - `Cpu::fetch_operand` reads it, consuming the operand bytes at PC and
//   returning an `Operand` that remembers where the value came from.
// - `Cpu::write_back` stores a read-modify-write result through that
//   operand. PC is not touched again.
// - `Cpu::store_fresh` resolves its own address and stores (STA/STX/STY).
//
// Indexing follows the 6502: absolute modes add the index with 16-bit
// wraparound, zero-page modes wrap within page zero, and the indirect
// pointer's high byte is fetched from page zero as well.

use super::opcodes::Mode;
use super::Cpu;
use crate::c64::SidPort;

/// Where an operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Immediate or implied: nothing to write back to.
    None,
    Accumulator,
    Address(u16),
}

/// A fetched operand value plus its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub value: u8,
    pub target: Target,
}

impl Operand {
    const NONE: Operand = Operand {
        value: 0,
        target: Target::None,
    };
}

impl<S: SidPort> Cpu<S> {
    /// Next instruction-stream byte.
    #[inline]
    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let v = self.memory.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        v
    }

    /// Next little-endian word (low, then high).
    #[inline]
    pub(crate) fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    /// Resolve a memory addressing mode, consuming its operand bytes.
    /// Returns `None` without consuming anything for register, immediate,
    /// indirect and relative modes.
    fn effective_address(&mut self, mode: Mode) -> Option<u16> {
        let addr = match mode {
            Mode::Abs => self.fetch_word(),
            Mode::AbsX => self.fetch_word().wrapping_add(self.regs.x as u16),
            Mode::AbsY => self.fetch_word().wrapping_add(self.regs.y as u16),
            Mode::Zp => self.fetch_byte() as u16,
            Mode::ZpX => self.fetch_byte().wrapping_add(self.regs.x) as u16,
            Mode::ZpY => self.fetch_byte().wrapping_add(self.regs.y) as u16,
            Mode::IndX => {
                let zp = self.fetch_byte().wrapping_add(self.regs.x);
                self.zero_page_pointer(zp)
            }
            Mode::IndY => {
                let zp = self.fetch_byte();
                self.zero_page_pointer(zp)
                    .wrapping_add(self.regs.y as u16)
            }
            Mode::Imp | Mode::Imm | Mode::Acc | Mode::Ind | Mode::Rel => return None,
        };
        Some(addr)
    }

    /// Pointer stored in page zero; the high byte wraps to $00 after $FF.
    fn zero_page_pointer(&self, zp: u8) -> u16 {
        let lo = self.memory.read(zp as u16) as u16;
        let hi = self.memory.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    /// Read the operand of `mode`.
    pub fn fetch_operand(&mut self, mode: Mode) -> Operand {
        match mode {
            Mode::Imm => Operand {
                value: self.fetch_byte(),
                target: Target::None,
            },
            Mode::Acc => Operand {
                value: self.regs.a,
                target: Target::Accumulator,
            },
            Mode::Imp | Mode::Ind | Mode::Rel => Operand::NONE,
            _ => match self.effective_address(mode) {
                Some(addr) => Operand {
                    value: self.memory.read(addr),
                    target: Target::Address(addr),
                },
                None => Operand::NONE,
            },
        }
    }

    /// Store a read-modify-write result where `operand` was fetched from.
    ///
    /// Only the modes the shift/rotate/increment instructions use are
    /// honoured (absolute, absolute-X, zero-page, zero-page-X, accumulator);
    /// anything else is a no-op.
    pub fn write_back(&mut self, mode: Mode, operand: Operand, value: u8) {
        match (mode, operand.target) {
            (Mode::Acc, _) => self.regs.a = value,
            (Mode::Abs | Mode::AbsX | Mode::Zp | Mode::ZpX, Target::Address(addr)) => {
                self.memory.write(addr, value)
            }
            _ => {}
        }
    }

    /// Resolve `mode`'s address from the instruction stream and store `value`.
    /// Immediate, implied, indirect and relative stores are no-ops.
    pub fn store_fresh(&mut self, mode: Mode, value: u8) {
        if mode == Mode::Acc {
            self.regs.a = value;
            return;
        }
        if let Some(addr) = self.effective_address(mode) {
            self.memory.write(addr, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c64::{NullSid, SidWrite};

    fn cpu_at(pc: u16, bytes: &[u8]) -> Cpu<NullSid> {
        let mut cpu = Cpu::new(NullSid);
        cpu.bulk_copy(pc, bytes);
        cpu.reset_to(pc, 0);
        cpu
    }

    #[test]
    fn test_immediate_consumes_one_byte() {
        let mut cpu = cpu_at(0x1000, &[0x42]);
        let op = cpu.fetch_operand(Mode::Imm);
        assert_eq!(op.value, 0x42);
        assert_eq!(op.target, Target::None);
        assert_eq!(cpu.regs.pc, 0x1001);
    }

    #[test]
    fn test_implied_and_accumulator_consume_nothing() {
        let mut cpu = cpu_at(0x1000, &[0x42]);
        cpu.regs.a = 0x99;
        assert_eq!(cpu.fetch_operand(Mode::Imp).value, 0);
        let op = cpu.fetch_operand(Mode::Acc);
        assert_eq!(op.value, 0x99);
        assert_eq!(op.target, Target::Accumulator);
        assert_eq!(cpu.regs.pc, 0x1000);
    }

    #[test]
    fn test_absolute_indexed_wraps_16_bit() {
        let mut cpu = cpu_at(0x1000, &[0xFF, 0xFF]);
        cpu.regs.x = 0x02;
        cpu.write_byte(0x0001, 0x77);
        let op = cpu.fetch_operand(Mode::AbsX);
        assert_eq!(op.target, Target::Address(0x0001));
        assert_eq!(op.value, 0x77);
        assert_eq!(cpu.regs.pc, 0x1002);

        let mut cpu = cpu_at(0x1000, &[0x00, 0x20]);
        cpu.regs.y = 0x10;
        assert_eq!(cpu.fetch_operand(Mode::AbsY).target, Target::Address(0x2010));
    }

    #[test]
    fn test_zero_page_indexed_wraps_8_bit() {
        let mut cpu = cpu_at(0x1000, &[0xF0]);
        cpu.regs.x = 0x20;
        assert_eq!(cpu.fetch_operand(Mode::ZpX).target, Target::Address(0x0010));

        let mut cpu = cpu_at(0x1000, &[0xFF]);
        cpu.regs.y = 0x01;
        assert_eq!(cpu.fetch_operand(Mode::ZpY).target, Target::Address(0x0000));
    }

    #[test]
    fn test_indexed_indirect() {
        let mut cpu = cpu_at(0x1000, &[0xFE]);
        cpu.regs.x = 0x01;
        // Pointer at $FF/$00 (high byte wraps within page zero).
        cpu.write_byte(0x00FF, 0x34);
        cpu.write_byte(0x0000, 0x12);
        cpu.write_byte(0x1234, 0xAB);
        let op = cpu.fetch_operand(Mode::IndX);
        assert_eq!(op.target, Target::Address(0x1234));
        assert_eq!(op.value, 0xAB);
        assert_eq!(cpu.regs.pc, 0x1001);
    }

    #[test]
    fn test_indirect_indexed() {
        let mut cpu = cpu_at(0x1000, &[0x80]);
        cpu.regs.y = 0x05;
        cpu.write_byte(0x0080, 0xFE);
        cpu.write_byte(0x0081, 0x20);
        cpu.write_byte(0x2103, 0xCD);
        let op = cpu.fetch_operand(Mode::IndY);
        assert_eq!(op.target, Target::Address(0x2103));
        assert_eq!(op.value, 0xCD);
    }

    #[test]
    fn test_write_back_reuses_address_without_moving_pc() {
        let mut cpu = cpu_at(0x1000, &[0x00, 0x30]);
        cpu.regs.x = 0x04;
        let op = cpu.fetch_operand(Mode::AbsX);
        cpu.regs.x = 0x00; // must not affect the write-back
        cpu.write_back(Mode::AbsX, op, 0x5E);
        assert_eq!(cpu.read_byte(0x3004), 0x5E);
        assert_eq!(cpu.regs.pc, 0x1002);
    }

    #[test]
    fn test_write_back_unsupported_modes_are_noops() {
        let mut cpu = cpu_at(0x1000, &[0x10]);
        cpu.regs.y = 0x01;
        let op = cpu.fetch_operand(Mode::ZpY);
        cpu.write_back(Mode::ZpY, op, 0xEE);
        assert_eq!(cpu.read_byte(0x0011), 0);

        let mut cpu = cpu_at(0x1000, &[0x10]);
        let op = cpu.fetch_operand(Mode::Imm);
        cpu.write_back(Mode::Imm, op, 0xEE);
        assert!(cpu.memory.ram().iter().filter(|&&b| b == 0xEE).count() == 0);
    }

    #[test]
    fn test_write_back_accumulator() {
        let mut cpu = cpu_at(0x1000, &[]);
        cpu.regs.a = 0x01;
        let op = cpu.fetch_operand(Mode::Acc);
        cpu.write_back(Mode::Acc, op, 0x02);
        assert_eq!(cpu.regs.a, 0x02);
    }

    #[test]
    fn test_store_fresh_all_modes() {
        let mut cpu = cpu_at(0x1000, &[0x00, 0x40, 0x10, 0x20, 0x30, 0x40, 0x50]);
        cpu.regs.x = 0x01;
        cpu.regs.y = 0x02;
        cpu.write_byte(0x0040, 0x00);
        cpu.write_byte(0x0041, 0x60);

        cpu.store_fresh(Mode::Abs, 1);
        assert_eq!(cpu.read_byte(0x4000), 1);
        assert_eq!(cpu.regs.pc, 0x1002);

        cpu.store_fresh(Mode::ZpX, 2);
        assert_eq!(cpu.read_byte(0x0011), 2);
        cpu.store_fresh(Mode::ZpY, 3);
        assert_eq!(cpu.read_byte(0x0022), 3);
        cpu.store_fresh(Mode::Zp, 4);
        assert_eq!(cpu.read_byte(0x0030), 4);
        // ($3F,X) → pointer at $40 → $6000
        cpu.write_byte(0x1006, 0x3F);
        cpu.regs.pc = 0x1006;
        cpu.store_fresh(Mode::IndX, 5);
        assert_eq!(cpu.read_byte(0x6000), 5);
        // ($40),Y → $6000 + 2
        cpu.write_byte(0x1007, 0x40);
        cpu.store_fresh(Mode::IndY, 6);
        assert_eq!(cpu.read_byte(0x6002), 6);
        assert_eq!(cpu.regs.pc, 0x1008);
    }

    #[test]
    fn test_store_fresh_into_sid_window_forwards() {
        let mut cpu = Cpu::new(Vec::<SidWrite>::new());
        cpu.bulk_copy(0x1000, &[0x18, 0xD4]);
        cpu.reset_to(0x1000, 0);
        cpu.store_fresh(Mode::Abs, 0x0F);
        assert_eq!(cpu.memory.sid().as_slice(), &[(0x18, 0x0F)]);
        assert_eq!(cpu.read_byte(0xD418), 0);
    }
}
