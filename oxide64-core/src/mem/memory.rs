// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Spec: COMMODORE 64 MEMORY MAPS p. 263
// Design:
//   The memory controller resolves every access through the bank switcher
//   and owns the processor port at $0000/$0001. The CPU forwards all its
//   bus traffic here so the two views of the port can never diverge.

use log::LogLevel;

use crate::factory::{Addressable, AddressableFaded, MemSource, Mmu};
use crate::util::{IoPort, Ram, Rom, Shared};

use super::Mmio;

// Vector values returned while the kernal is banked out. Fast loaders rely
// on these when they flip HIRAM around an interrupt window.
const NMI_PATCH: u16 = 0xfe43;
const RESET_PATCH: u16 = 0xfce2;
const IRQ_PATCH: u16 = 0xff48;

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub struct Memory {
    // Dependencies
    mmu: Shared<dyn Mmu>,
    // Addressable
    basic: Shared<Rom>,
    charset: Shared<Rom>,
    expansion_port: Shared<dyn AddressableFaded>,
    io: Mmio,
    kernal: Shared<Rom>,
    ram: Shared<Ram>,
    // I/O
    cpu_io_port: Shared<IoPort>,
}

impl Memory {
    pub fn new(
        mmu: Shared<dyn Mmu>,
        cpu_io_port: Shared<IoPort>,
        io: Mmio,
        expansion_port: Shared<dyn AddressableFaded>,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
    ) -> Self {
        Memory {
            mmu,
            basic: rom_basic,
            charset: rom_charset,
            expansion_port,
            io,
            kernal: rom_kernal,
            ram,
            cpu_io_port,
        }
    }

    /// Read without side effects, for debugger use.
    pub fn spy_read(&self, address: u16) -> u8 {
        match self.mmu.borrow().map_read(address) {
            MemSource::ProcPort => match address {
                0x0000 => self.cpu_io_port.borrow().get_direction(),
                0x0001 => self.cpu_io_port.borrow().get_value(),
                _ => self.ram.borrow().read(address),
            },
            MemSource::Ram => self.ram.borrow().read(address),
            MemSource::BasicRom => self.basic.borrow().read(address),
            MemSource::CharRom => self.charset.borrow().read(address - BaseAddr::Charset.addr()),
            MemSource::KernalRom => self.read_kernal(address),
            MemSource::CartLo | MemSource::CartHi => self.ram.borrow().read(address),
            MemSource::Io => self.io.spy_read(address),
            MemSource::OpenBus => 0,
        }
    }

    fn read_kernal(&self, address: u16) -> u8 {
        self.kernal.borrow().read(address)
    }

    fn read_vector_patch(&self, address: u16) -> u8 {
        let vector = match address & 0xfffe {
            0xfffa => NMI_PATCH,
            0xfffc => RESET_PATCH,
            _ => IRQ_PATCH,
        };
        if address & 0x0001 == 0 {
            vector as u8
        } else {
            (vector >> 8) as u8
        }
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        let source = self.mmu.borrow().map_read(address);
        match source {
            MemSource::ProcPort => match address {
                0x0000 => self.cpu_io_port.borrow().get_direction(),
                0x0001 => self.cpu_io_port.borrow().get_value(),
                _ => self.ram.borrow().read(address),
            },
            MemSource::Ram => {
                if address >= 0xfffa {
                    // Kernal banked out: interrupt vectors read as fixed
                    // kernal entry points.
                    self.read_vector_patch(address)
                } else {
                    self.ram.borrow().read(address)
                }
            }
            MemSource::BasicRom => self.basic.borrow().read(address),
            MemSource::CharRom => self.charset.borrow().read(address - BaseAddr::Charset.addr()),
            MemSource::KernalRom => self.read_kernal(address),
            MemSource::CartLo | MemSource::CartHi => self
                .expansion_port
                .borrow_mut()
                .read(address)
                .unwrap_or_else(|| self.ram.borrow().read(address)),
            MemSource::Io => self.io.read(address),
            MemSource::OpenBus => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        let target = self.mmu.borrow().map_write(address);
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "mem::write", "0x{:04x} = 0x{:02x} ({:?})", address, value, target);
        }
        match target {
            MemSource::ProcPort => match address {
                0x0000 => self.cpu_io_port.borrow_mut().set_direction(value),
                0x0001 => self.cpu_io_port.borrow_mut().set_value(value),
                _ => self.ram.borrow_mut().write(address, value),
            },
            MemSource::Ram => self.ram.borrow_mut().write(address, value),
            MemSource::CartLo | MemSource::CartHi => {
                self.expansion_port.borrow_mut().write(address, value);
                self.ram.borrow_mut().write(address, value);
            }
            MemSource::Io => self.io.write(address, value),
            MemSource::OpenBus => {}
            // Never reached: the bank switcher rewrites ROM targets to RAM
            _ => self.ram.borrow_mut().write(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Pla;
    use super::*;
    use crate::factory::{Chip, Mmu};
    use crate::util::{new_shared, new_shared_cell};

    struct NullChip;

    impl Chip for NullChip {
        fn clock(&mut self) {}
        fn clock_delta(&mut self, _delta: u32) {}
        fn process_vsync(&mut self) {}
        fn reset(&mut self) {}
        fn read(&mut self, _reg: u8) -> u8 {
            0
        }
        fn spy_read(&self, _reg: u8) -> u8 {
            0
        }
        fn write(&mut self, _reg: u8, _value: u8) {}
    }

    struct NullExpansion;

    impl AddressableFaded for NullExpansion {
        fn read(&mut self, _address: u16) -> Option<u8> {
            None
        }
        fn write(&mut self, _address: u16, _value: u8) {}
    }

    fn setup_memory() -> Memory {
        let mmu = new_shared(Pla::new());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let ram = new_shared(Ram::new(0x10000));
        let color_ram = new_shared(Ram::new(1024));
        let basic = new_shared(Rom::new(vec![0x10; 0x2000], BaseAddr::Basic.addr()));
        let charset = new_shared(Rom::new(vec![0x11; 0x1000], 0));
        let kernal = new_shared(Rom::new(vec![0x12; 0x2000], BaseAddr::Kernal.addr()));
        let expansion_port = new_shared(NullExpansion {});
        let io = Mmio::new(
            new_shared(NullChip {}),
            new_shared(NullChip {}),
            color_ram,
            expansion_port.clone(),
            new_shared(NullChip {}),
            new_shared(NullChip {}),
            new_shared_cell(0u8),
        );
        Memory::new(
            mmu,
            cpu_io_port,
            io,
            expansion_port,
            ram,
            basic,
            charset,
            kernal,
        )
    }

    #[test]
    fn read_basic_rom() {
        let mem = setup_memory();
        assert_eq!(0x10, mem.read(0xa000));
    }

    #[test]
    fn read_kernal_rom() {
        let mem = setup_memory();
        assert_eq!(0x12, mem.read(0xe000));
    }

    #[test]
    fn write_to_rom_falls_through_to_ram() {
        let mut mem = setup_memory();
        mem.write(0xa000, 0x55);
        assert_eq!(0x10, mem.read(0xa000));
        assert_eq!(0x55, mem.ram.borrow().read(0xa000));
    }

    #[test]
    fn ram_roundtrip_with_spy() {
        let mut mem = setup_memory();
        for address in [0x0002u16, 0x0100, 0x4000, 0x7fff].iter() {
            mem.write(*address, 0x5a);
            assert_eq!(0x5a, mem.spy_read(*address));
        }
    }

    #[test]
    fn proc_port_never_ram() {
        let mut mem = setup_memory();
        mem.write(0x0000, 0x2f);
        mem.write(0x0001, 0x37);
        assert_eq!(0x2f, mem.read(0x0000));
        // Output bits mix with the pulled-up input lines
        assert_eq!((0x37 & 0x2f) | (0xff & !0x2f), mem.read(0x0001));
        assert_eq!(0x00, mem.ram.borrow().read(0x0000));
        assert_eq!(0x00, mem.ram.borrow().read(0x0001));
    }

    #[test]
    fn vector_patch_when_kernal_unmapped() {
        let mut mem = setup_memory();
        {
            let mmu = mem.mmu.clone();
            mmu.borrow_mut().switch_banks(28);
        }
        assert_eq!(0x43, mem.read(0xfffa));
        assert_eq!(0xfe, mem.read(0xfffb));
        assert_eq!(0xe2, mem.read(0xfffc));
        assert_eq!(0xfc, mem.read(0xfffd));
        assert_eq!(0x48, mem.read(0xfffe));
        assert_eq!(0xff, mem.read(0xffff));
    }

    #[test]
    fn vectors_from_kernal_when_mapped() {
        let mem = setup_memory();
        assert_eq!(0x12, mem.read(0xfffa));
        assert_eq!(0x12, mem.read(0xffff));
    }
}
