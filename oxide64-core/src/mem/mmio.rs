// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::factory::{AddressableFaded, Chip};
use crate::util::{Ram, Shared, SharedCell};

// I/O page dispatch for $D000-$DFFF. Color RAM stores only the lower nibble;
// the upper nibble of a read comes from the value the VIC last left on the
// data bus.

pub struct Mmio {
    cia_1: Shared<dyn Chip>,
    cia_2: Shared<dyn Chip>,
    color_ram: Shared<Ram>,
    expansion_port: Shared<dyn AddressableFaded>,
    sid: Shared<dyn Chip>,
    vic: Shared<dyn Chip>,
    vic_data_bus: SharedCell<u8>,
}

impl Mmio {
    pub fn new(
        cia_1: Shared<dyn Chip>,
        cia_2: Shared<dyn Chip>,
        color_ram: Shared<Ram>,
        expansion_port: Shared<dyn AddressableFaded>,
        sid: Shared<dyn Chip>,
        vic: Shared<dyn Chip>,
        vic_data_bus: SharedCell<u8>,
    ) -> Self {
        Self {
            cia_1,
            cia_2,
            color_ram,
            expansion_port,
            sid,
            vic,
            vic_data_bus,
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            0xd000..=0xd3ff => self.vic.borrow_mut().read((address & 0x003f) as u8),
            0xd400..=0xd7ff => self.sid.borrow_mut().read((address & 0x001f) as u8),
            0xd800..=0xdbff => {
                let color = self.color_ram.borrow().read(address - 0xd800) & 0x0f;
                (self.vic_data_bus.get() & 0xf0) | color
            }
            0xdc00..=0xdcff => self.cia_1.borrow_mut().read((address & 0x000f) as u8),
            0xdd00..=0xddff => self.cia_2.borrow_mut().read((address & 0x000f) as u8),
            0xde00..=0xdfff => self.expansion_port.borrow_mut().read(address).unwrap_or(0),
            _ => panic!("invalid address 0x{:x}", address),
        }
    }

    pub fn spy_read(&self, address: u16) -> u8 {
        match address {
            0xd000..=0xd3ff => self.vic.borrow().spy_read((address & 0x003f) as u8),
            0xd400..=0xd7ff => self.sid.borrow().spy_read((address & 0x001f) as u8),
            0xd800..=0xdbff => {
                let color = self.color_ram.borrow().read(address - 0xd800) & 0x0f;
                (self.vic_data_bus.get() & 0xf0) | color
            }
            0xdc00..=0xdcff => self.cia_1.borrow().spy_read((address & 0x000f) as u8),
            0xdd00..=0xddff => self.cia_2.borrow().spy_read((address & 0x000f) as u8),
            0xde00..=0xdfff => 0,
            _ => panic!("invalid address 0x{:x}", address),
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0xd000..=0xd3ff => self.vic.borrow_mut().write((address & 0x003f) as u8, value),
            0xd400..=0xd7ff => self.sid.borrow_mut().write((address & 0x001f) as u8, value),
            0xd800..=0xdbff => self
                .color_ram
                .borrow_mut()
                .write(address - 0xd800, value & 0x0f),
            0xdc00..=0xdcff => self
                .cia_1
                .borrow_mut()
                .write((address & 0x000f) as u8, value),
            0xdd00..=0xddff => self
                .cia_2
                .borrow_mut()
                .write((address & 0x000f) as u8, value),
            0xde00..=0xdfff => self.expansion_port.borrow_mut().write(address, value),
            _ => panic!("invalid address 0x{:x}", address),
        }
    }
}
