// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::cell::Cell;
use std::rc::Rc;

use oxide64_core::cpu::Cpu6510;
use oxide64_core::factory::{Addressable, Cpu, TickFn};
use oxide64_core::util::{new_shared, IrqLine, Pin, Ram};

struct MockMemory {
    ram: Ram,
}

impl MockMemory {
    pub fn new(ram: Ram) -> Self {
        MockMemory { ram }
    }
}

impl Addressable for MockMemory {
    fn read(&self, address: u16) -> u8 {
        self.ram.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram.write(address, value);
    }
}

fn setup_cpu() -> Cpu6510 {
    let ba_line = new_shared(Pin::new_high());
    let cpu_irq = new_shared(IrqLine::new("irq"));
    let cpu_nmi = new_shared(IrqLine::new("nmi"));
    let mem = new_shared(MockMemory::new(Ram::new(0x10000)));
    Cpu6510::new(mem, ba_line, cpu_irq, cpu_nmi)
}

// Based on 65xx Processor Data from http://www.romhacking.net/documents/318/
// with undocumented opcodes filled in. Entries with 0 halt the CPU and are
// skipped. Timings assume no page crossing.

#[cfg_attr(rustfmt, rustfmt_skip)]
const OPCODE_TIMING: [u8; 256] = [
    7, // 00 BRK
    6, // 01 ORA ($ab,X)
    0, // 02 JAM*
    8, // 03 SLO* ($ab,X)
    3, // 04 NOP* $ab
    3, // 05 ORA $ab
    5, // 06 ASL $ab
    5, // 07 SLO* $ab
    3, // 08 PHP
    2, // 09 ORA #$ab
    2, // 0A ASL A
    2, // 0B ANC* #$ab
    4, // 0C NOP* $abcd
    4, // 0D ORA $abcd
    6, // 0E ASL $abcd
    6, // 0F SLO* $abcd
    3, // 10 BPL nearlabel (taken)
    5, // 11 ORA ($ab),Y
    0, // 12 JAM*
    8, // 13 SLO* ($ab),Y
    4, // 14 NOP* $ab,X
    4, // 15 ORA $ab,X
    6, // 16 ASL $ab,X
    6, // 17 SLO* $ab,X
    2, // 18 CLC
    4, // 19 ORA $abcd,Y
    2, // 1A NOP*
    7, // 1B SLO* $abcd,Y
    4, // 1C NOP* $abcd,X
    4, // 1D ORA $abcd,X
    7, // 1E ASL $abcd,X
    7, // 1F SLO* $abcd,X
    6, // 20 JSR $abcd
    6, // 21 AND ($ab,X)
    0, // 22 JAM*
    8, // 23 RLA* ($ab,X)
    3, // 24 BIT $ab
    3, // 25 AND $ab
    5, // 26 ROL $ab
    5, // 27 RLA* $ab
    4, // 28 PLP
    2, // 29 AND #$ab
    2, // 2A ROL A
    2, // 2B ANC* #$ab
    4, // 2C BIT $abcd
    4, // 2D AND $abcd
    6, // 2E ROL $abcd
    6, // 2F RLA* $abcd
    2, // 30 BMI nearlabel (not taken)
    5, // 31 AND ($ab),Y
    0, // 32 JAM*
    8, // 33 RLA* ($ab),Y
    4, // 34 NOP* $ab,X
    4, // 35 AND $ab,X
    6, // 36 ROL $ab,X
    6, // 37 RLA* $ab,X
    2, // 38 SEC
    4, // 39 AND $abcd,Y
    2, // 3A NOP*
    7, // 3B RLA* $abcd,Y
    4, // 3C NOP* $abcd,X
    4, // 3D AND $abcd,X
    7, // 3E ROL $abcd,X
    7, // 3F RLA* $abcd,X
    6, // 40 RTI
    6, // 41 EOR ($ab,X)
    0, // 42 JAM*
    8, // 43 SRE* ($ab,X)
    3, // 44 NOP* $ab
    3, // 45 EOR $ab
    5, // 46 LSR $ab
    5, // 47 SRE* $ab
    3, // 48 PHA
    2, // 49 EOR #$ab
    2, // 4A LSR A
    2, // 4B ALR* #$ab
    3, // 4C JMP $abcd
    4, // 4D EOR $abcd
    6, // 4E LSR $abcd
    6, // 4F SRE* $abcd
    3, // 50 BVC nearlabel (taken)
    5, // 51 EOR ($ab),Y
    0, // 52 JAM*
    8, // 53 SRE* ($ab),Y
    4, // 54 NOP* $ab,X
    4, // 55 EOR $ab,X
    6, // 56 LSR $ab,X
    6, // 57 SRE* $ab,X
    2, // 58 CLI
    4, // 59 EOR $abcd,Y
    2, // 5A NOP*
    7, // 5B SRE* $abcd,Y
    4, // 5C NOP* $abcd,X
    4, // 5D EOR $abcd,X
    7, // 5E LSR $abcd,X
    7, // 5F SRE* $abcd,X
    6, // 60 RTS
    6, // 61 ADC ($ab,X)
    0, // 62 JAM*
    8, // 63 RRA* ($ab,X)
    3, // 64 NOP* $ab
    3, // 65 ADC $ab
    5, // 66 ROR $ab
    5, // 67 RRA* $ab
    4, // 68 PLA
    2, // 69 ADC #$ab
    2, // 6A ROR A
    2, // 6B ARR* #$ab
    5, // 6C JMP ($abcd)
    4, // 6D ADC $abcd
    6, // 6E ROR $abcd
    6, // 6F RRA* $abcd
    2, // 70 BVS nearlabel (not taken)
    5, // 71 ADC ($ab),Y
    0, // 72 JAM*
    8, // 73 RRA* ($ab),Y
    4, // 74 NOP* $ab,X
    4, // 75 ADC $ab,X
    6, // 76 ROR $ab,X
    6, // 77 RRA* $ab,X
    2, // 78 SEI
    4, // 79 ADC $abcd,Y
    2, // 7A NOP*
    7, // 7B RRA* $abcd,Y
    4, // 7C NOP* $abcd,X
    4, // 7D ADC $abcd,X
    7, // 7E ROR $abcd,X
    7, // 7F RRA* $abcd,X
    2, // 80 NOP* #$ab
    6, // 81 STA ($ab,X)
    2, // 82 NOP* #$ab
    6, // 83 SAX* ($ab,X)
    3, // 84 STY $ab
    3, // 85 STA $ab
    3, // 86 STX $ab
    3, // 87 SAX* $ab
    2, // 88 DEY
    2, // 89 NOP* #$ab
    2, // 8A TXA
    2, // 8B ANE* #$ab
    4, // 8C STY $abcd
    4, // 8D STA $abcd
    4, // 8E STX $abcd
    4, // 8F SAX* $abcd
    3, // 90 BCC nearlabel (taken)
    6, // 91 STA ($ab),Y
    0, // 92 JAM*
    6, // 93 SHA* ($ab),Y
    4, // 94 STY $ab,X
    4, // 95 STA $ab,X
    4, // 96 STX $ab,Y
    4, // 97 SAX* $ab,Y
    2, // 98 TYA
    5, // 99 STA $abcd,Y
    2, // 9A TXS
    5, // 9B TAS* $abcd,Y
    5, // 9C SHY* $abcd,X
    5, // 9D STA $abcd,X
    5, // 9E SHX* $abcd,Y
    5, // 9F SHA* $abcd,Y
    2, // A0 LDY #$ab
    6, // A1 LDA ($ab,X)
    2, // A2 LDX #$ab
    6, // A3 LAX* ($ab,X)
    3, // A4 LDY $ab
    3, // A5 LDA $ab
    3, // A6 LDX $ab
    3, // A7 LAX* $ab
    2, // A8 TAY
    2, // A9 LDA #$ab
    2, // AA TAX
    2, // AB LXA* #$ab
    4, // AC LDY $abcd
    4, // AD LDA $abcd
    4, // AE LDX $abcd
    4, // AF LAX* $abcd
    2, // B0 BCS nearlabel (not taken)
    5, // B1 LDA ($ab),Y
    0, // B2 JAM*
    5, // B3 LAX* ($ab),Y
    4, // B4 LDY $ab,X
    4, // B5 LDA $ab,X
    4, // B6 LDX $ab,Y
    4, // B7 LAX* $ab,Y
    2, // B8 CLV
    4, // B9 LDA $abcd,Y
    2, // BA TSX
    4, // BB LAS* $abcd,Y
    4, // BC LDY $abcd,X
    4, // BD LDA $abcd,X
    4, // BE LDX $abcd,Y
    4, // BF LAX* $abcd,Y
    2, // C0 CPY #$ab
    6, // C1 CMP ($ab,X)
    2, // C2 NOP* #$ab
    8, // C3 DCP* ($ab,X)
    3, // C4 CPY $ab
    3, // C5 CMP $ab
    5, // C6 DEC $ab
    5, // C7 DCP* $ab
    2, // C8 INY
    2, // C9 CMP #$ab
    2, // CA DEX
    2, // CB AXS* #$ab
    4, // CC CPY $abcd
    4, // CD CMP $abcd
    6, // CE DEC $abcd
    6, // CF DCP* $abcd
    3, // D0 BNE nearlabel (taken)
    5, // D1 CMP ($ab),Y
    0, // D2 JAM*
    8, // D3 DCP* ($ab),Y
    4, // D4 NOP* $ab,X
    4, // D5 CMP $ab,X
    6, // D6 DEC $ab,X
    6, // D7 DCP* $ab,X
    2, // D8 CLD
    4, // D9 CMP $abcd,Y
    2, // DA NOP*
    7, // DB DCP* $abcd,Y
    4, // DC NOP* $abcd,X
    4, // DD CMP $abcd,X
    7, // DE DEC $abcd,X
    7, // DF DCP* $abcd,X
    2, // E0 CPX #$ab
    6, // E1 SBC ($ab,X)
    2, // E2 NOP* #$ab
    8, // E3 ISC* ($ab,X)
    3, // E4 CPX $ab
    3, // E5 SBC $ab
    5, // E6 INC $ab
    5, // E7 ISC* $ab
    2, // E8 INX
    2, // E9 SBC #$ab
    2, // EA NOP
    2, // EB SBC* #$ab
    4, // EC CPX $abcd
    4, // ED SBC $abcd
    6, // EE INC $abcd
    6, // EF ISC* $abcd
    2, // F0 BEQ nearlabel (not taken)
    5, // F1 SBC ($ab),Y
    0, // F2 JAM*
    8, // F3 ISC* ($ab),Y
    4, // F4 NOP* $ab,X
    4, // F5 SBC $ab,X
    6, // F6 INC $ab,X
    6, // F7 ISC* $ab,X
    2, // F8 SED
    4, // F9 SBC $abcd,Y
    2, // FA NOP*
    7, // FB ISC* $abcd,Y
    4, // FC NOP* $abcd,X
    4, // FD SBC $abcd,X
    7, // FE INC $abcd,X
    7, // FF ISC* $abcd,X
];

#[test]
fn opcode_timing() {
    let mut cpu = setup_cpu();
    for opcode in 0..256 {
        let expected = OPCODE_TIMING[opcode];
        if expected > 0 {
            cpu.reset();
            cpu.write(0x1000, opcode as u8);
            cpu.write(0x1001, 0x00);
            cpu.write(0x1002, 0x10);
            cpu.set_pc(0x1000);
            // Prime the sequencer with the opcode fetch
            let noop: TickFn = Rc::new(|| {});
            cpu.step(&noop);
            let elapsed = Rc::new(Cell::new(0u8));
            let elapsed_clone = elapsed.clone();
            let tick_fn: TickFn = Rc::new(move || {
                elapsed_clone.set(elapsed_clone.get() + 1);
            });
            cpu.step(&tick_fn);
            assert_eq!(
                expected,
                elapsed.get(),
                "opcode 0x{:02x} timing failed",
                opcode
            );
        }
    }
}
