// MOS6510 interpreter tuned for running SID replay routines.
//
// This is not a cycle-accurate 6502. It executes the documented
// instruction set against a flat `Memory` and follows the conventions
// SID players were written against:
//
// - ADC/SBC set V to C xor N instead of detecting signed overflow.
// - There is no decimal mode; D is only a flag.
// - The stack pointer clamps at $00 and $FF instead of wrapping.
// - RTI behaves exactly like RTS.
// - BRK sets PC to 0, which ends `Cpu::run_subroutine`.
// - Undocumented opcodes only skip their operand bytes.
//
// A subroutine call pushes a zero return address, so the final RTS lands
// on PC 1. The driver loop stops as soon as PC drops to 1 or 0.

pub mod addressing;
pub mod opcodes;
pub mod registers;

use crate::c64::{Memory, SidPort};
use opcodes::{Kind, Mode};
pub use registers::{Registers, Status};

pub struct Cpu<S: SidPort> {
    pub regs: Registers,
    pub memory: Memory<S>,
}

impl<S: SidPort> Cpu<S> {
    /// CPU with zeroed memory, SID writes forwarded to `sid`.
    pub fn new(sid: S) -> Self {
        Self {
            regs: Registers::new(),
            memory: Memory::new(sid),
        }
    }

    pub fn into_sid(self) -> S {
        self.memory.into_sid()
    }

    // ─────────────────────────────────────────────────────────────────────────
    //  Caller interface
    // ─────────────────────────────────────────────────────────────────────────

    /// Clear all registers, S = $FF, PC = $FFFC.
    pub fn reset(&mut self) {
        self.regs = Registers::new();
    }

    /// Clear all registers, S = $FF, then set PC and A.
    pub fn reset_to(&mut self, pc: u16, a: u8) {
        self.regs = Registers::with_entry(pc, a);
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory.write(addr, value);
    }

    pub fn bulk_copy(&mut self, dest: u16, data: &[u8]) {
        self.memory.bulk_copy(dest, data);
    }

    pub fn bulk_fill(&mut self, dest: u16, value: u8, len: usize) {
        self.memory.bulk_fill(dest, value, len);
    }

    /// Set up a call frame for `entry` without running it: registers
    /// cleared, A = `a`, and a zero return address on the stack.
    pub fn enter_subroutine(&mut self, entry: u16, a: u8) {
        self.reset_to(entry, a);
        self.push(0);
        self.push(0);
    }

    /// True until the routine entered with [`Cpu::enter_subroutine`] has
    /// returned (PC 1) or hit BRK (PC 0).
    #[inline]
    pub fn in_subroutine(&self) -> bool {
        self.regs.pc > 1
    }

    /// Call `entry` with A = `a` and run until it returns.
    ///
    /// There is no step limit: a routine that never returns hangs the
    /// caller. Use [`Cpu::enter_subroutine`] and [`Cpu::step`] directly to
    /// bound execution. Returns the number of instructions executed.
    pub fn run_subroutine(&mut self, entry: u16, a: u8) -> u64 {
        self.enter_subroutine(entry, a);
        let mut steps = 0u64;
        while self.in_subroutine() {
            self.step();
            steps += 1;
        }
        steps
    }

    // ─────────────────────────────────────────────────────────────────────────
    //  Stack
    // ─────────────────────────────────────────────────────────────────────────

    /// Push `value`; S stops decrementing at $00.
    pub fn push(&mut self, value: u8) {
        self.memory.write(0x0100 + self.regs.s as u16, value);
        if self.regs.s != 0 {
            self.regs.s -= 1;
        }
    }

    /// Pop a byte; S stops incrementing at $FF.
    pub fn pop(&mut self) -> u8 {
        if self.regs.s != 0xFF {
            self.regs.s += 1;
        }
        self.memory.read(0x0100 + self.regs.s as u16)
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    // ─────────────────────────────────────────────────────────────────────────
    //  Execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute one instruction.
    pub fn step(&mut self) {
        let pc = self.regs.pc;
        let opcode = opcodes::decode(self.fetch_byte());
        let mode = opcode.mode;
        log::trace!("${pc:04X}  {} {:?}  {}", opcode.kind, mode, self.regs);

        match opcode.kind {
            // ── Arithmetic ──────────────────────────────────────────────────
            Kind::Adc => {
                let m = self.fetch_operand(mode).value;
                self.add_with_carry(m);
            }
            Kind::Sbc => {
                let m = self.fetch_operand(mode).value;
                self.add_with_carry(m ^ 0xFF);
            }

            // ── Logical ─────────────────────────────────────────────────────
            Kind::And => {
                self.regs.a &= self.fetch_operand(mode).value;
                self.regs.set_zn(self.regs.a);
            }
            Kind::Ora => {
                self.regs.a |= self.fetch_operand(mode).value;
                self.regs.set_zn(self.regs.a);
            }
            Kind::Eor => {
                self.regs.a ^= self.fetch_operand(mode).value;
                self.regs.set_zn(self.regs.a);
            }
            Kind::Bit => {
                let m = self.fetch_operand(mode).value;
                let p = &mut self.regs.p;
                p.set(Status::ZERO, self.regs.a & m == 0);
                p.set(Status::NEGATIVE, m & 0x80 != 0);
                p.set(Status::OVERFLOW, m & 0x40 != 0);
            }

            // ── Shifts and rotates ──────────────────────────────────────────
            Kind::Asl => {
                let op = self.fetch_operand(mode);
                let w = (op.value as u16) << 1;
                self.write_back(mode, op, w as u8);
                // Z comes from the 9-bit intermediate.
                self.regs.p.set(Status::ZERO, w == 0);
                self.regs.p.set(Status::NEGATIVE, w & 0x80 != 0);
                self.regs.p.set(Status::CARRY, w & 0x100 != 0);
            }
            Kind::Lsr => {
                let op = self.fetch_operand(mode);
                let r = op.value >> 1;
                self.write_back(mode, op, r);
                self.regs.set_zn(r);
                self.regs.p.set(Status::CARRY, op.value & 0x01 != 0);
            }
            Kind::Rol => {
                let op = self.fetch_operand(mode);
                let carry_in = self.regs.p.carry_bit();
                self.regs.p.set(Status::CARRY, op.value & 0x80 != 0);
                let r = (op.value << 1) | carry_in;
                self.write_back(mode, op, r);
                self.regs.set_zn(r);
            }
            Kind::Ror => {
                let op = self.fetch_operand(mode);
                let carry_in = self.regs.p.carry_bit();
                self.regs.p.set(Status::CARRY, op.value & 0x01 != 0);
                let r = (op.value >> 1) | (carry_in << 7);
                self.write_back(mode, op, r);
                self.regs.set_zn(r);
            }

            // ── Compare ─────────────────────────────────────────────────────
            Kind::Cmp => self.compare(self.regs.a, mode),
            Kind::Cpx => self.compare(self.regs.x, mode),
            Kind::Cpy => self.compare(self.regs.y, mode),

            // ── Increment / decrement ───────────────────────────────────────
            Kind::Inc => {
                let op = self.fetch_operand(mode);
                let r = op.value.wrapping_add(1);
                self.write_back(mode, op, r);
                self.regs.set_zn(r);
            }
            Kind::Dec => {
                let op = self.fetch_operand(mode);
                let r = op.value.wrapping_sub(1);
                self.write_back(mode, op, r);
                self.regs.set_zn(r);
            }
            Kind::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.set_zn(self.regs.x);
            }
            Kind::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.set_zn(self.regs.y);
            }
            Kind::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.set_zn(self.regs.x);
            }
            Kind::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.set_zn(self.regs.y);
            }

            // ── Branches ────────────────────────────────────────────────────
            Kind::Bcc => self.branch(!self.regs.p.contains(Status::CARRY)),
            Kind::Bcs => self.branch(self.regs.p.contains(Status::CARRY)),
            Kind::Bne => self.branch(!self.regs.p.contains(Status::ZERO)),
            Kind::Beq => self.branch(self.regs.p.contains(Status::ZERO)),
            Kind::Bpl => self.branch(!self.regs.p.contains(Status::NEGATIVE)),
            Kind::Bmi => self.branch(self.regs.p.contains(Status::NEGATIVE)),
            Kind::Bvc => self.branch(!self.regs.p.contains(Status::OVERFLOW)),
            Kind::Bvs => self.branch(self.regs.p.contains(Status::OVERFLOW)),

            // ── Jumps and returns ───────────────────────────────────────────
            Kind::Jmp => {
                let target = self.fetch_word();
                match mode {
                    Mode::Abs => self.regs.pc = target,
                    Mode::Ind => self.regs.pc = self.memory.read_word(target),
                    _ => {}
                }
            }
            Kind::Jsr => {
                // Return address - 1, i.e. the last byte of this instruction.
                let ret = self.regs.pc.wrapping_add(1);
                self.push((ret >> 8) as u8);
                self.push(ret as u8);
                self.regs.pc = self.fetch_word();
            }
            Kind::Rts | Kind::Rti => {
                self.regs.pc = self.pop_word().wrapping_add(1);
            }
            Kind::Brk => self.regs.pc = 0,

            // ── Loads and stores ────────────────────────────────────────────
            Kind::Lda => {
                self.regs.a = self.fetch_operand(mode).value;
                self.regs.set_zn(self.regs.a);
            }
            Kind::Ldx => {
                self.regs.x = self.fetch_operand(mode).value;
                self.regs.set_zn(self.regs.x);
            }
            Kind::Ldy => {
                self.regs.y = self.fetch_operand(mode).value;
                self.regs.set_zn(self.regs.y);
            }
            Kind::Sta => self.store_fresh(mode, self.regs.a),
            Kind::Stx => self.store_fresh(mode, self.regs.x),
            Kind::Sty => self.store_fresh(mode, self.regs.y),

            // ── Stack ───────────────────────────────────────────────────────
            Kind::Pha => self.push(self.regs.a),
            Kind::Php => self.push(self.regs.p.bits()),
            Kind::Pla => {
                self.regs.a = self.pop();
                self.regs.set_zn(self.regs.a);
            }
            Kind::Plp => self.regs.p = Status(self.pop()),

            // ── Transfers ───────────────────────────────────────────────────
            Kind::Tax => {
                self.regs.x = self.regs.a;
                self.regs.set_zn(self.regs.x);
            }
            Kind::Tay => {
                self.regs.y = self.regs.a;
                self.regs.set_zn(self.regs.y);
            }
            Kind::Txa => {
                self.regs.a = self.regs.x;
                self.regs.set_zn(self.regs.a);
            }
            Kind::Tya => {
                self.regs.a = self.regs.y;
                self.regs.set_zn(self.regs.a);
            }
            Kind::Tsx => {
                self.regs.x = self.regs.s;
                self.regs.set_zn(self.regs.x);
            }
            Kind::Txs => self.regs.s = self.regs.x,

            // ── Flags ───────────────────────────────────────────────────────
            Kind::Clc => self.regs.p.set(Status::CARRY, false),
            Kind::Sec => self.regs.p.set(Status::CARRY, true),
            Kind::Cld => self.regs.p.set(Status::DECIMAL, false),
            Kind::Sed => self.regs.p.set(Status::DECIMAL, true),
            Kind::Cli => self.regs.p.set(Status::IRQ_DISABLE, false),
            Kind::Sei => self.regs.p.set(Status::IRQ_DISABLE, true),
            Kind::Clv => self.regs.p.set(Status::OVERFLOW, false),

            // ── NOP and undocumented opcodes ────────────────────────────────
            Kind::Nop
            | Kind::Xxx
            | Kind::Slo
            | Kind::Anc
            | Kind::Rla
            | Kind::Sre
            | Kind::Alr
            | Kind::Rra
            | Kind::Arr
            | Kind::Sax
            | Kind::Xaa
            | Kind::Ahx
            | Kind::Tas
            | Kind::Shy
            | Kind::Shx
            | Kind::Lax
            | Kind::Las
            | Kind::Dcp
            | Kind::Axs
            | Kind::Isc => {
                self.regs.pc = self.regs.pc.wrapping_add(mode.operand_len());
            }
        }
    }

    /// ADC core, also used by SBC with a complemented operand.
    fn add_with_carry(&mut self, m: u8) {
        let sum = self.regs.a as u16 + m as u16 + self.regs.p.carry_bit() as u16;
        self.regs.p.set(Status::CARRY, sum & 0x100 != 0);
        self.regs.a = sum as u8;
        self.regs.set_zn(self.regs.a);
        let v = self.regs.p.contains(Status::CARRY) ^ self.regs.p.contains(Status::NEGATIVE);
        self.regs.p.set(Status::OVERFLOW, v);
    }

    fn compare(&mut self, reg: u8, mode: Mode) {
        let m = self.fetch_operand(mode).value;
        let diff = (reg as u16).wrapping_sub(m as u16);
        self.regs.p.set(Status::ZERO, diff == 0);
        self.regs.p.set(Status::NEGATIVE, diff & 0x80 != 0);
        self.regs.p.set(Status::CARRY, reg >= m);
    }

    /// The displacement is always consumed; the jump happens only if `taken`.
    fn branch(&mut self, taken: bool) {
        let offset = self.fetch_operand(Mode::Imm).value as i8;
        let target = self.regs.pc.wrapping_add(offset as i16 as u16);
        if taken {
            self.regs.pc = target;
        }
    }
}
