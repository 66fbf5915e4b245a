// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Opcode metadata shared by the disassembler and the trace buffer. The
// table covers all 256 opcodes including the undocumented ones; illegal
// mnemonics are lowercase with a star in listings.

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    pub fn length(self) -> usize {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY
            | AddressingMode::Relative => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        }
    }
}

#[derive(Copy, Clone)]
pub struct OpMeta {
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub illegal: bool,
}

const fn op(mnemonic: &'static str, mode: AddressingMode) -> OpMeta {
    OpMeta {
        mnemonic,
        mode,
        illegal: false,
    }
}

const fn ill(mnemonic: &'static str, mode: AddressingMode) -> OpMeta {
    OpMeta {
        mnemonic,
        mode,
        illegal: true,
    }
}

use self::AddressingMode::*;

#[cfg_attr(rustfmt, rustfmt_skip)]
pub static OPCODE_TABLE: [OpMeta; 256] = [
    op("brk", Implied),    op("ora", IndirectX), ill("jam", Implied),   ill("slo", IndirectX),
    ill("nop", ZeroPage),  op("ora", ZeroPage),  op("asl", ZeroPage),   ill("slo", ZeroPage),
    op("php", Implied),    op("ora", Immediate), op("asl", Accumulator),ill("anc", Immediate),
    ill("nop", Absolute),  op("ora", Absolute),  op("asl", Absolute),   ill("slo", Absolute),
    op("bpl", Relative),   op("ora", IndirectY), ill("jam", Implied),   ill("slo", IndirectY),
    ill("nop", ZeroPageX), op("ora", ZeroPageX), op("asl", ZeroPageX),  ill("slo", ZeroPageX),
    op("clc", Implied),    op("ora", AbsoluteY), ill("nop", Implied),   ill("slo", AbsoluteY),
    ill("nop", AbsoluteX), op("ora", AbsoluteX), op("asl", AbsoluteX),  ill("slo", AbsoluteX),
    op("jsr", Absolute),   op("and", IndirectX), ill("jam", Implied),   ill("rla", IndirectX),
    op("bit", ZeroPage),   op("and", ZeroPage),  op("rol", ZeroPage),   ill("rla", ZeroPage),
    op("plp", Implied),    op("and", Immediate), op("rol", Accumulator),ill("anc", Immediate),
    op("bit", Absolute),   op("and", Absolute),  op("rol", Absolute),   ill("rla", Absolute),
    op("bmi", Relative),   op("and", IndirectY), ill("jam", Implied),   ill("rla", IndirectY),
    ill("nop", ZeroPageX), op("and", ZeroPageX), op("rol", ZeroPageX),  ill("rla", ZeroPageX),
    op("sec", Implied),    op("and", AbsoluteY), ill("nop", Implied),   ill("rla", AbsoluteY),
    ill("nop", AbsoluteX), op("and", AbsoluteX), op("rol", AbsoluteX),  ill("rla", AbsoluteX),
    op("rti", Implied),    op("eor", IndirectX), ill("jam", Implied),   ill("sre", IndirectX),
    ill("nop", ZeroPage),  op("eor", ZeroPage),  op("lsr", ZeroPage),   ill("sre", ZeroPage),
    op("pha", Implied),    op("eor", Immediate), op("lsr", Accumulator),ill("alr", Immediate),
    op("jmp", Absolute),   op("eor", Absolute),  op("lsr", Absolute),   ill("sre", Absolute),
    op("bvc", Relative),   op("eor", IndirectY), ill("jam", Implied),   ill("sre", IndirectY),
    ill("nop", ZeroPageX), op("eor", ZeroPageX), op("lsr", ZeroPageX),  ill("sre", ZeroPageX),
    op("cli", Implied),    op("eor", AbsoluteY), ill("nop", Implied),   ill("sre", AbsoluteY),
    ill("nop", AbsoluteX), op("eor", AbsoluteX), op("lsr", AbsoluteX),  ill("sre", AbsoluteX),
    op("rts", Implied),    op("adc", IndirectX), ill("jam", Implied),   ill("rra", IndirectX),
    ill("nop", ZeroPage),  op("adc", ZeroPage),  op("ror", ZeroPage),   ill("rra", ZeroPage),
    op("pla", Implied),    op("adc", Immediate), op("ror", Accumulator),ill("arr", Immediate),
    op("jmp", Indirect),   op("adc", Absolute),  op("ror", Absolute),   ill("rra", Absolute),
    op("bvs", Relative),   op("adc", IndirectY), ill("jam", Implied),   ill("rra", IndirectY),
    ill("nop", ZeroPageX), op("adc", ZeroPageX), op("ror", ZeroPageX),  ill("rra", ZeroPageX),
    op("sei", Implied),    op("adc", AbsoluteY), ill("nop", Implied),   ill("rra", AbsoluteY),
    ill("nop", AbsoluteX), op("adc", AbsoluteX), op("ror", AbsoluteX),  ill("rra", AbsoluteX),
    ill("nop", Immediate), op("sta", IndirectX), ill("nop", Immediate), ill("sax", IndirectX),
    op("sty", ZeroPage),   op("sta", ZeroPage),  op("stx", ZeroPage),   ill("sax", ZeroPage),
    op("dey", Implied),    ill("nop", Immediate),op("txa", Implied),    ill("ane", Immediate),
    op("sty", Absolute),   op("sta", Absolute),  op("stx", Absolute),   ill("sax", Absolute),
    op("bcc", Relative),   op("sta", IndirectY), ill("jam", Implied),   ill("sha", IndirectY),
    op("sty", ZeroPageX),  op("sta", ZeroPageX), op("stx", ZeroPageY),  ill("sax", ZeroPageY),
    op("tya", Implied),    op("sta", AbsoluteY), op("txs", Implied),    ill("tas", AbsoluteY),
    ill("shy", AbsoluteX), op("sta", AbsoluteX), ill("shx", AbsoluteY), ill("sha", AbsoluteY),
    op("ldy", Immediate),  op("lda", IndirectX), op("ldx", Immediate),  ill("lax", IndirectX),
    op("ldy", ZeroPage),   op("lda", ZeroPage),  op("ldx", ZeroPage),   ill("lax", ZeroPage),
    op("tay", Implied),    op("lda", Immediate), op("tax", Implied),    ill("lxa", Immediate),
    op("ldy", Absolute),   op("lda", Absolute),  op("ldx", Absolute),   ill("lax", Absolute),
    op("bcs", Relative),   op("lda", IndirectY), ill("jam", Implied),   ill("lax", IndirectY),
    op("ldy", ZeroPageX),  op("lda", ZeroPageX), op("ldx", ZeroPageY),  ill("lax", ZeroPageY),
    op("clv", Implied),    op("lda", AbsoluteY), op("tsx", Implied),    ill("las", AbsoluteY),
    op("ldy", AbsoluteX),  op("lda", AbsoluteX), op("ldx", AbsoluteY),  ill("lax", AbsoluteY),
    op("cpy", Immediate),  op("cmp", IndirectX), ill("nop", Immediate), ill("dcp", IndirectX),
    op("cpy", ZeroPage),   op("cmp", ZeroPage),  op("dec", ZeroPage),   ill("dcp", ZeroPage),
    op("iny", Implied),    op("cmp", Immediate), op("dex", Implied),    ill("axs", Immediate),
    op("cpy", Absolute),   op("cmp", Absolute),  op("dec", Absolute),   ill("dcp", Absolute),
    op("bne", Relative),   op("cmp", IndirectY), ill("jam", Implied),   ill("dcp", IndirectY),
    ill("nop", ZeroPageX), op("cmp", ZeroPageX), op("dec", ZeroPageX),  ill("dcp", ZeroPageX),
    op("cld", Implied),    op("cmp", AbsoluteY), ill("nop", Implied),   ill("dcp", AbsoluteY),
    ill("nop", AbsoluteX), op("cmp", AbsoluteX), op("dec", AbsoluteX),  ill("dcp", AbsoluteX),
    op("cpx", Immediate),  op("sbc", IndirectX), ill("nop", Immediate), ill("isc", IndirectX),
    op("cpx", ZeroPage),   op("sbc", ZeroPage),  op("inc", ZeroPage),   ill("isc", ZeroPage),
    op("inx", Implied),    op("sbc", Immediate), op("nop", Implied),    ill("sbc", Immediate),
    op("cpx", Absolute),   op("sbc", Absolute),  op("inc", Absolute),   ill("isc", Absolute),
    op("beq", Relative),   op("sbc", IndirectY), ill("jam", Implied),   ill("isc", IndirectY),
    ill("nop", ZeroPageX), op("sbc", ZeroPageX), op("inc", ZeroPageX),  ill("isc", ZeroPageX),
    op("sed", Implied),    op("sbc", AbsoluteY), ill("nop", Implied),   ill("isc", AbsoluteY),
    ill("nop", AbsoluteX), op("sbc", AbsoluteX), op("inc", AbsoluteX),  ill("isc", AbsoluteX),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_all_opcodes() {
        assert_eq!(256, OPCODE_TABLE.len());
        assert_eq!("brk", OPCODE_TABLE[0x00].mnemonic);
        assert_eq!("lda", OPCODE_TABLE[0xa9].mnemonic);
        assert_eq!(AddressingMode::Immediate, OPCODE_TABLE[0xa9].mode);
        assert_eq!("isc", OPCODE_TABLE[0xff].mnemonic);
        assert_eq!(true, OPCODE_TABLE[0xff].illegal);
    }

    #[test]
    fn lengths_follow_addressing_mode() {
        assert_eq!(1, OPCODE_TABLE[0xea].mode.length());
        assert_eq!(2, OPCODE_TABLE[0xa9].mode.length());
        assert_eq!(3, OPCODE_TABLE[0xad].mode.length());
    }
}
