// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use oxide64_system::C64;

use super::instruction::{AddressingMode, OPCODE_TABLE};

pub struct Disassembler;

impl Disassembler {
    /// Disassemble one instruction through the side-effect free memory
    /// view; returns the listing text and the instruction length.
    pub fn disassemble(c64: &C64, address: u16) -> (String, usize) {
        let opcode = c64.spy_peek(address);
        let meta = &OPCODE_TABLE[opcode as usize];
        let length = meta.mode.length();
        let operand8 = c64.spy_peek(address.wrapping_add(1));
        let operand16 = u16::from(operand8)
            | (u16::from(c64.spy_peek(address.wrapping_add(2))) << 8);
        let marker = if meta.illegal { "*" } else { " " };
        let text = match meta.mode {
            AddressingMode::Implied => format!("{}{}", marker, meta.mnemonic),
            AddressingMode::Accumulator => format!("{}{} a", marker, meta.mnemonic),
            AddressingMode::Immediate => {
                format!("{}{} #${:02x}", marker, meta.mnemonic, operand8)
            }
            AddressingMode::ZeroPage => format!("{}{} ${:02x}", marker, meta.mnemonic, operand8),
            AddressingMode::ZeroPageX => {
                format!("{}{} ${:02x},x", marker, meta.mnemonic, operand8)
            }
            AddressingMode::ZeroPageY => {
                format!("{}{} ${:02x},y", marker, meta.mnemonic, operand8)
            }
            AddressingMode::Absolute => format!("{}{} ${:04x}", marker, meta.mnemonic, operand16),
            AddressingMode::AbsoluteX => {
                format!("{}{} ${:04x},x", marker, meta.mnemonic, operand16)
            }
            AddressingMode::AbsoluteY => {
                format!("{}{} ${:04x},y", marker, meta.mnemonic, operand16)
            }
            AddressingMode::Indirect => {
                format!("{}{} (${:04x})", marker, meta.mnemonic, operand16)
            }
            AddressingMode::IndirectX => {
                format!("{}{} (${:02x},x)", marker, meta.mnemonic, operand8)
            }
            AddressingMode::IndirectY => {
                format!("{}{} (${:02x}),y", marker, meta.mnemonic, operand8)
            }
            AddressingMode::Relative => {
                let target = address
                    .wrapping_add(2)
                    .wrapping_add(i16::from(operand8 as i8) as u16);
                format!("{}{} ${:04x}", marker, meta.mnemonic, target)
            }
        };
        (text, length)
    }

    /// Disassemble a range of instructions starting at `address`.
    pub fn disassemble_range(c64: &C64, address: u16, count: usize) -> Vec<(u16, String)> {
        let mut result = Vec::with_capacity(count);
        let mut pc = address;
        for _ in 0..count {
            let (text, length) = Self::disassemble(c64, pc);
            result.push((pc, text));
            pc = pc.wrapping_add(length as u16);
        }
        result
    }
}
