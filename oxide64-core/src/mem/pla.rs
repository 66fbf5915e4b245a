// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// SPEC: https://www.c64-wiki.com/index.php/Bank_Switching

use log::LogLevel;

use crate::factory::{MemSource, Mmu};

// Per-mode bank layout. The five input lines (LORAM, HIRAM, CHAREN, GAME,
// EXROM) select one of 32 configurations; each configuration resolves the
// sixteen 4K banks of the address space to a memory source. Bank 0 always
// routes through the processor port.

#[derive(Clone, Copy)]
struct Mode {
    banks: [MemSource; 0x10],
}

impl Mode {
    pub fn new(config: [MemSource; 6]) -> Self {
        let mut banks = [MemSource::OpenBus; 0x10];
        for (i, bank) in banks.iter_mut().enumerate().take(0x10) {
            *bank = match i {
                0x00 => MemSource::ProcPort,
                0x01..=0x07 => config[0],
                0x08..=0x09 => config[1],
                0x0a..=0x0b => config[2],
                0x0c => config[3],
                0x0d => config[4],
                0x0e..=0x0f => config[5],
                _ => panic!("invalid bank {}", i),
            };
        }
        Mode { banks }
    }

    pub fn get(&self, zone: u8) -> MemSource {
        self.banks[zone as usize]
    }
}

pub struct Pla {
    map: MemoryMap,
    peek_src: [MemSource; 0x10],
    poke_dst: [MemSource; 0x10],
}

impl Pla {
    pub fn new() -> Self {
        let map = MemoryMap::default();
        let mut pla = Pla {
            map,
            peek_src: [MemSource::Ram; 0x10],
            poke_dst: [MemSource::Ram; 0x10],
        };
        pla.switch_banks(31);
        pla
    }

    pub fn peek_src(&self, zone: u8) -> MemSource {
        self.peek_src[zone as usize]
    }

    pub fn poke_dst(&self, zone: u8) -> MemSource {
        self.poke_dst[zone as usize]
    }

    fn write_target(source: MemSource) -> MemSource {
        // Writes never reach ROM; they fall through to the RAM underneath.
        match source {
            MemSource::BasicRom | MemSource::CharRom | MemSource::KernalRom => MemSource::Ram,
            MemSource::CartLo | MemSource::CartHi => source,
            other => other,
        }
    }
}

impl Mmu for Pla {
    fn map_read(&self, address: u16) -> MemSource {
        self.peek_src[(address >> 12) as usize]
    }

    fn map_write(&self, address: u16) -> MemSource {
        self.poke_dst[(address >> 12) as usize]
    }

    fn switch_banks(&mut self, mode: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "mem::banks", "Switching to {}", mode);
        }
        let configuration = self.map.get(mode);
        for zone in 0..0x10 {
            let source = configuration.get(zone);
            self.peek_src[zone as usize] = source;
            self.poke_dst[zone as usize] = Pla::write_target(source);
        }
    }
}

impl Default for Pla {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryMap {
    modes: [Mode; 32],
}

impl Default for MemoryMap {
    fn default() -> Self {
        use self::MemSource::*;
        let m31 = [Ram, Ram, BasicRom, Ram, Io, KernalRom];
        let m30_14 = [Ram, Ram, Ram, Ram, Io, KernalRom];
        let m29_13 = [Ram, Ram, Ram, Ram, Io, Ram];
        let m28_24 = [Ram, Ram, Ram, Ram, Ram, Ram];
        let m27 = [Ram, Ram, BasicRom, Ram, CharRom, KernalRom];
        let m26_10 = [Ram, Ram, Ram, Ram, CharRom, KernalRom];
        let m25_9 = [Ram, Ram, Ram, Ram, CharRom, Ram];
        let m23_16 = [OpenBus, CartLo, OpenBus, OpenBus, Io, CartHi];
        let m15 = [Ram, CartLo, BasicRom, Ram, Io, KernalRom];
        let m12_8_4_0 = [Ram, Ram, Ram, Ram, Ram, Ram];
        let m11 = [Ram, CartLo, BasicRom, Ram, CharRom, KernalRom];
        let m7 = [Ram, CartLo, CartHi, Ram, Io, KernalRom];
        let m6 = [Ram, Ram, CartHi, Ram, Io, KernalRom];
        let m5 = [Ram, Ram, Ram, Ram, Io, Ram];
        let m3 = [Ram, CartLo, CartHi, Ram, CharRom, KernalRom];
        let m2 = [Ram, Ram, CartHi, Ram, CharRom, KernalRom];
        MemoryMap {
            modes: [
                Mode::new(m12_8_4_0),
                Mode::new(m12_8_4_0),
                Mode::new(m2),
                Mode::new(m3),
                Mode::new(m12_8_4_0),
                Mode::new(m5),
                Mode::new(m6),
                Mode::new(m7),
                Mode::new(m12_8_4_0),
                Mode::new(m25_9),
                Mode::new(m26_10),
                Mode::new(m11),
                Mode::new(m12_8_4_0),
                Mode::new(m29_13),
                Mode::new(m30_14),
                Mode::new(m15),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m28_24),
                Mode::new(m25_9),
                Mode::new(m26_10),
                Mode::new(m27),
                Mode::new(m28_24),
                Mode::new(m29_13),
                Mode::new(m30_14),
                Mode::new(m31),
            ],
        }
    }
}

impl MemoryMap {
    pub fn get(&self, mode: u8) -> Mode {
        match mode {
            0..=31 => self.modes[mode as usize],
            _ => panic!("invalid mode {}", mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_port_pinned_to_bank_0() {
        let mut pla = Pla::new();
        for mode in 0..32 {
            pla.switch_banks(mode);
            assert_eq!(MemSource::ProcPort, pla.peek_src(0));
            assert_eq!(MemSource::ProcPort, pla.poke_dst(0));
        }
    }

    #[test]
    fn default_mode_maps_roms() {
        let pla = Pla::new();
        assert_eq!(MemSource::BasicRom, pla.map_read(0xa000));
        assert_eq!(MemSource::Io, pla.map_read(0xd000));
        assert_eq!(MemSource::KernalRom, pla.map_read(0xe000));
        assert_eq!(MemSource::Ram, pla.map_write(0xa000));
        assert_eq!(MemSource::Ram, pla.map_write(0xe000));
    }

    #[test]
    fn ultimax_mode_opens_bus() {
        let mut pla = Pla::new();
        pla.switch_banks(16);
        assert_eq!(MemSource::OpenBus, pla.map_read(0x1000));
        assert_eq!(MemSource::CartLo, pla.map_read(0x8000));
        assert_eq!(MemSource::CartHi, pla.map_read(0xe000));
        assert_eq!(MemSource::Io, pla.map_read(0xd000));
    }

    #[test]
    fn switch_banks_is_idempotent() {
        let mut pla = Pla::new();
        pla.switch_banks(27);
        let first: Vec<_> = (0..16).map(|z| pla.peek_src(z)).collect();
        pla.switch_banks(27);
        let second: Vec<_> = (0..16).map(|z| pla.peek_src(z)).collect();
        assert_eq!(first, second);
    }
}
