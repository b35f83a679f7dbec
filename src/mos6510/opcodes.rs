// Opcode decode table: raw opcode byte → (instruction kind, addressing mode).
//
// Undocumented opcodes decode to their customary names so traces read
// sensibly, but the CPU only consumes their operand bytes. Opcodes that
// jam a real 6502 decode to `Kind::Xxx`, and so does `$EB`, the
// undocumented copy of `SBC #imm`, which is skipped like the rest.

use std::fmt;

/// Instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    /// Placeholder for opcodes that halt a real CPU, plus the `$EB` SBC alias.
    Xxx,
    // Undocumented
    Slo,
    Anc,
    Rla,
    Sre,
    Alr,
    Rra,
    Arr,
    Sax,
    Xaa,
    Ahx,
    Tas,
    Shy,
    Shx,
    Lax,
    Las,
    Dcp,
    Axs,
    Isc,
}

impl Kind {
    /// True for opcodes outside the documented instruction set.
    pub fn is_undocumented(self) -> bool {
        matches!(
            self,
            Kind::Xxx
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
                | Kind::Isc
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{self:?}");
        f.write_str(&name.to_ascii_uppercase())
    }
}

/// Addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Imp,
    Imm,
    Abs,
    AbsX,
    AbsY,
    Zp,
    ZpX,
    ZpY,
    Ind,
    IndX,
    IndY,
    Acc,
    Rel,
}

impl Mode {
    /// Operand bytes following the opcode.
    pub fn operand_len(self) -> u16 {
        match self {
            Mode::Imp | Mode::Acc => 0,
            Mode::Imm | Mode::Zp | Mode::ZpX | Mode::ZpY | Mode::IndX | Mode::IndY | Mode::Rel => 1,
            Mode::Abs | Mode::AbsX | Mode::AbsY | Mode::Ind => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub kind: Kind,
    pub mode: Mode,
}

const fn op(kind: Kind, mode: Mode) -> Opcode {
    Opcode { kind, mode }
}

/// Decode one opcode byte.
#[inline]
pub fn decode(opcode: u8) -> Opcode {
    OPCODE_TABLE[opcode as usize]
}

use Kind::*;
use Mode::*;

#[rustfmt::skip]
pub static OPCODE_TABLE: [Opcode; 256] = [
    // 0x00
    op(Brk, Imp), op(Ora, IndX), op(Xxx, Imp), op(Slo, IndX),
    op(Nop, Zp),  op(Ora, Zp),   op(Asl, Zp),  op(Slo, Zp),
    op(Php, Imp), op(Ora, Imm),  op(Asl, Acc), op(Anc, Imm),
    op(Nop, Abs), op(Ora, Abs),  op(Asl, Abs), op(Slo, Abs),
    // 0x10
    op(Bpl, Rel),  op(Ora, IndY), op(Xxx, Imp),  op(Slo, IndY),
    op(Nop, ZpX),  op(Ora, ZpX),  op(Asl, ZpX),  op(Slo, ZpX),
    op(Clc, Imp),  op(Ora, AbsY), op(Nop, Imp),  op(Slo, AbsY),
    op(Nop, AbsX), op(Ora, AbsX), op(Asl, AbsX), op(Slo, AbsX),
    // 0x20
    op(Jsr, Abs), op(And, IndX), op(Xxx, Imp), op(Rla, IndX),
    op(Bit, Zp),  op(And, Zp),   op(Rol, Zp),  op(Rla, Zp),
    op(Plp, Imp), op(And, Imm),  op(Rol, Acc), op(Anc, Imm),
    op(Bit, Abs), op(And, Abs),  op(Rol, Abs), op(Rla, Abs),
    // 0x30
    op(Bmi, Rel),  op(And, IndY), op(Xxx, Imp),  op(Rla, IndY),
    op(Nop, ZpX),  op(And, ZpX),  op(Rol, ZpX),  op(Rla, ZpX),
    op(Sec, Imp),  op(And, AbsY), op(Nop, Imp),  op(Rla, AbsY),
    op(Nop, AbsX), op(And, AbsX), op(Rol, AbsX), op(Rla, AbsX),
    // 0x40
    op(Rti, Imp), op(Eor, IndX), op(Xxx, Imp), op(Sre, IndX),
    op(Nop, Zp),  op(Eor, Zp),   op(Lsr, Zp),  op(Sre, Zp),
    op(Pha, Imp), op(Eor, Imm),  op(Lsr, Acc), op(Alr, Imm),
    op(Jmp, Abs), op(Eor, Abs),  op(Lsr, Abs), op(Sre, Abs),
    // 0x50
    op(Bvc, Rel),  op(Eor, IndY), op(Xxx, Imp),  op(Sre, IndY),
    op(Nop, ZpX),  op(Eor, ZpX),  op(Lsr, ZpX),  op(Sre, ZpX),
    op(Cli, Imp),  op(Eor, AbsY), op(Nop, Imp),  op(Sre, AbsY),
    op(Nop, AbsX), op(Eor, AbsX), op(Lsr, AbsX), op(Sre, AbsX),
    // 0x60
    op(Rts, Imp), op(Adc, IndX), op(Xxx, Imp), op(Rra, IndX),
    op(Nop, Zp),  op(Adc, Zp),   op(Ror, Zp),  op(Rra, Zp),
    op(Pla, Imp), op(Adc, Imm),  op(Ror, Acc), op(Arr, Imm),
    op(Jmp, Ind), op(Adc, Abs),  op(Ror, Abs), op(Rra, Abs),
    // 0x70
    op(Bvs, Rel),  op(Adc, IndY), op(Xxx, Imp),  op(Rra, IndY),
    op(Nop, ZpX),  op(Adc, ZpX),  op(Ror, ZpX),  op(Rra, ZpX),
    op(Sei, Imp),  op(Adc, AbsY), op(Nop, Imp),  op(Rra, AbsY),
    op(Nop, AbsX), op(Adc, AbsX), op(Ror, AbsX), op(Rra, AbsX),
    // 0x80
    op(Nop, Imm), op(Sta, IndX), op(Nop, Imm), op(Sax, IndX),
    op(Sty, Zp),  op(Sta, Zp),   op(Stx, Zp),  op(Sax, Zp),
    op(Dey, Imp), op(Nop, Imm),  op(Txa, Imp), op(Xaa, Imm),
    op(Sty, Abs), op(Sta, Abs),  op(Stx, Abs), op(Sax, Abs),
    // 0x90
    op(Bcc, Rel),  op(Sta, IndY), op(Xxx, Imp),  op(Ahx, IndY),
    op(Sty, ZpX),  op(Sta, ZpX),  op(Stx, ZpY),  op(Sax, ZpY),
    op(Tya, Imp),  op(Sta, AbsY), op(Txs, Imp),  op(Tas, AbsY),
    op(Shy, AbsX), op(Sta, AbsX), op(Shx, AbsY), op(Ahx, AbsY),
    // 0xA0
    op(Ldy, Imm), op(Lda, IndX), op(Ldx, Imm), op(Lax, IndX),
    op(Ldy, Zp),  op(Lda, Zp),   op(Ldx, Zp),  op(Lax, Zp),
    op(Tay, Imp), op(Lda, Imm),  op(Tax, Imp), op(Lax, Imm),
    op(Ldy, Abs), op(Lda, Abs),  op(Ldx, Abs), op(Lax, Abs),
    // 0xB0
    op(Bcs, Rel),  op(Lda, IndY), op(Xxx, Imp),  op(Lax, IndY),
    op(Ldy, ZpX),  op(Lda, ZpX),  op(Ldx, ZpY),  op(Lax, ZpY),
    op(Clv, Imp),  op(Lda, AbsY), op(Tsx, Imp),  op(Las, AbsY),
    op(Ldy, AbsX), op(Lda, AbsX), op(Ldx, AbsY), op(Lax, AbsY),
    // 0xC0
    op(Cpy, Imm), op(Cmp, IndX), op(Nop, Imm), op(Dcp, IndX),
    op(Cpy, Zp),  op(Cmp, Zp),   op(Dec, Zp),  op(Dcp, Zp),
    op(Iny, Imp), op(Cmp, Imm),  op(Dex, Imp), op(Axs, Imm),
    op(Cpy, Abs), op(Cmp, Abs),  op(Dec, Abs), op(Dcp, Abs),
    // 0xD0
    op(Bne, Rel),  op(Cmp, IndY), op(Xxx, Imp),  op(Dcp, IndY),
    op(Nop, ZpX),  op(Cmp, ZpX),  op(Dec, ZpX),  op(Dcp, ZpX),
    op(Cld, Imp),  op(Cmp, AbsY), op(Nop, Imp),  op(Dcp, AbsY),
    op(Nop, AbsX), op(Cmp, AbsX), op(Dec, AbsX), op(Dcp, AbsX),
    // 0xE0
    op(Cpx, Imm), op(Sbc, IndX), op(Nop, Imm), op(Isc, IndX),
    op(Cpx, Zp),  op(Sbc, Zp),   op(Inc, Zp),  op(Isc, Zp),
    op(Inx, Imp), op(Sbc, Imm),  op(Nop, Imp), op(Xxx, Imm),
    op(Cpx, Abs), op(Sbc, Abs),  op(Inc, Abs), op(Isc, Abs),
    // 0xF0
    op(Beq, Rel),  op(Sbc, IndY), op(Xxx, Imp),  op(Isc, IndY),
    op(Nop, ZpX),  op(Sbc, ZpX),  op(Inc, ZpX),  op(Isc, ZpX),
    op(Sed, Imp),  op(Sbc, AbsY), op(Nop, Imp),  op(Isc, AbsY),
    op(Nop, AbsX), op(Sbc, AbsX), op(Inc, AbsX), op(Isc, AbsX),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_spot_checks() {
        assert_eq!(decode(0xA9), op(Lda, Imm));
        assert_eq!(decode(0x8D), op(Sta, Abs));
        assert_eq!(decode(0x20), op(Jsr, Abs));
        assert_eq!(decode(0x6C), op(Jmp, Ind));
        assert_eq!(decode(0xB1), op(Lda, IndY));
        assert_eq!(decode(0x81), op(Sta, IndX));
        assert_eq!(decode(0x96), op(Stx, ZpY));
        assert_eq!(decode(0xBE), op(Ldx, AbsY));
        assert_eq!(decode(0x0A), op(Asl, Acc));
        assert_eq!(decode(0xD0), op(Bne, Rel));
        assert_eq!(decode(0x40), op(Rti, Imp));
        assert_eq!(decode(0xEA), op(Nop, Imp));
    }

    #[test]
    fn test_documented_opcode_count() {
        // 151 documented opcodes; NOP 0xEA is the only documented NOP.
        let documented = (0..=255u8)
            .filter(|&b| {
                let o = decode(b);
                !o.kind.is_undocumented() && (o.kind != Nop || b == 0xEA)
            })
            .count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn test_jam_opcodes_are_placeholders() {
        for b in [0x02u8, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
            assert_eq!(decode(b).kind, Xxx, "opcode ${b:02X}");
            assert_eq!(decode(b).mode, Imp, "opcode ${b:02X}");
        }
        // The SBC alias keeps its immediate operand so the stream stays aligned.
        assert_eq!(decode(0xEB).kind, Xxx);
        assert_eq!(decode(0xEB).mode, Imm);
    }

    #[test]
    fn test_branches_are_relative() {
        for b in [0x10u8, 0x30, 0x50, 0x70, 0x90, 0xB0, 0xD0, 0xF0] {
            assert_eq!(decode(b).mode, Rel);
        }
    }

    #[test]
    fn test_read_modify_write_modes() {
        // Write-back only supports these modes; the table must never ask for more.
        for b in 0..=255u8 {
            let o = decode(b);
            if matches!(o.kind, Asl | Lsr | Rol | Ror | Inc | Dec) {
                assert!(
                    matches!(o.mode, Acc | Zp | ZpX | Abs | AbsX),
                    "opcode ${b:02X} uses {:?}",
                    o.mode
                );
            }
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Lda.to_string(), "LDA");
        assert_eq!(Xxx.to_string(), "XXX");
    }
}
