// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::factory::Addressable;
use crate::util::{Ram, Rom, Shared};

use super::via::Via6522;

// 1541 address map: 2K RAM at $0000, VIA 1 at $1800, VIA 2 at $1C00 and
// 16K ROM at $C000 mirrored down to $8000. The drive shares no memory with
// the host.

pub struct DriveMemory {
    ram: Ram,
    rom: Option<Shared<Rom>>,
    via1: Shared<Via6522>,
    via2: Shared<Via6522>,
}

impl DriveMemory {
    pub fn new(via1: Shared<Via6522>, via2: Shared<Via6522>) -> Self {
        Self {
            ram: Ram::new(0x0800),
            rom: None,
            via1,
            via2,
        }
    }

    pub fn set_rom(&mut self, rom: Shared<Rom>) {
        self.rom = Some(rom);
    }

    pub fn has_rom(&self) -> bool {
        self.rom.is_some()
    }

    pub fn reset(&mut self) {
        self.ram.fill(0x00);
    }

    pub fn spy_read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x07ff => self.ram.read(address),
            0x1800..=0x180f => self.via1.borrow().spy_read((address & 0x0f) as u8),
            0x1c00..=0x1c0f => self.via2.borrow().spy_read((address & 0x0f) as u8),
            0x8000..=0xffff => self
                .rom
                .as_ref()
                .map_or(0, |rom| rom.borrow().read(0xc000 | (address & 0x3fff))),
            _ => 0,
        }
    }
}

impl Addressable for DriveMemory {
    fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x07ff => self.ram.read(address),
            0x1800..=0x180f => self.via1.borrow_mut().read((address & 0x0f) as u8),
            0x1c00..=0x1c0f => self.via2.borrow_mut().read((address & 0x0f) as u8),
            0x8000..=0xffff => self
                .rom
                .as_ref()
                .map_or(0, |rom| rom.borrow().read(0xc000 | (address & 0x3fff))),
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x07ff => self.ram.write(address, value),
            0x1800..=0x180f => self.via1.borrow_mut().write((address & 0x0f) as u8, value),
            0x1c00..=0x1c0f => self.via2.borrow_mut().write((address & 0x0f) as u8, value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, IoPort, IrqLine};

    fn setup_memory() -> DriveMemory {
        let irq_line = new_shared(IrqLine::new("drive irq"));
        let via1 = new_shared(Via6522::new(
            "via1",
            0,
            new_shared(IoPort::new(0x00, 0xff)),
            new_shared(IoPort::new(0x00, 0xff)),
            irq_line.clone(),
        ));
        let via2 = new_shared(Via6522::new(
            "via2",
            1,
            new_shared(IoPort::new(0x00, 0xff)),
            new_shared(IoPort::new(0x00, 0xff)),
            irq_line,
        ));
        DriveMemory::new(via1, via2)
    }

    #[test]
    fn ram_readback() {
        let mut mem = setup_memory();
        mem.write(0x0042, 0x13);
        assert_eq!(0x13, mem.read(0x0042));
    }

    #[test]
    fn rom_mirrored_at_0x8000() {
        let mut mem = setup_memory();
        let mut data = vec![0x00; 0x4000];
        data[0] = 0x77;
        mem.set_rom(new_shared(Rom::new(data, 0xc000)));
        assert_eq!(0x77, mem.read(0xc000));
        assert_eq!(0x77, mem.read(0x8000));
    }

    #[test]
    fn via_registers_reachable() {
        let mut mem = setup_memory();
        mem.write(0x1800 + 0x03, 0xff);
        assert_eq!(0xff, mem.read(0x1803));
    }
}
