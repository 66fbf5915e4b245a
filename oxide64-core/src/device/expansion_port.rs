// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::factory::AddressableFaded;
use crate::util::{IoPort, Shared, SharedCell};

use super::cartridge::Cartridge;

// The expansion port relays the GAME and EXROM lines into the bank switcher
// input byte and tracks the resulting cartridge mode. Both lines are open
// collector: high (true) means released.

#[derive(Copy, Clone)]
enum IoLine {
    Game = 3,
    Exrom = 4,
}

impl IoLine {
    pub fn value(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CartridgeMode {
    Off,
    Normal8k,
    Normal16k,
    Ultimax,
}

pub struct ExpansionPort {
    cartridge: Option<Cartridge>,
    // I/O
    io_line: Shared<IoPort>,
    ultimax: SharedCell<bool>,
}

impl ExpansionPort {
    pub fn new(io_line: Shared<IoPort>, ultimax: SharedCell<bool>) -> Self {
        Self {
            cartridge: None,
            io_line,
            ultimax,
        }
    }

    pub fn get_mode(&self) -> CartridgeMode {
        let io_value = self.io_line.borrow().get_value();
        let game = io_value.get_bit(IoLine::Game.value());
        let exrom = io_value.get_bit(IoLine::Exrom.value());
        match (exrom, game) {
            (false, false) => CartridgeMode::Normal16k,
            (false, true) => CartridgeMode::Normal8k,
            (true, false) => CartridgeMode::Ultimax,
            (true, true) => CartridgeMode::Off,
        }
    }

    pub fn has_cartridge(&self) -> bool {
        self.cartridge.is_some()
    }

    pub fn attach(&mut self, mut cartridge: Cartridge) {
        let io_line_clone = self.io_line.clone();
        let ultimax_clone = self.ultimax.clone();
        cartridge.set_io_observer(Some(Box::new(move |config| {
            let mut io_value = 0u8;
            io_value.set_bit(IoLine::Game.value(), config.game);
            io_value.set_bit(IoLine::Exrom.value(), config.exrom);
            ultimax_clone.set(config.exrom && !config.game);
            io_line_clone.borrow_mut().set_value(io_value);
        })));
        self.cartridge = Some(cartridge);
    }

    pub fn detach(&mut self) -> Option<Cartridge> {
        let mut cartridge = self.cartridge.take();
        if let Some(ref mut cartridge) = cartridge {
            cartridge.set_io_observer(None);
        }
        self.reset();
        cartridge
    }

    pub fn clock(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.clock();
        }
    }

    /// Forwarded by the system when the CPU is about to acknowledge an NMI.
    pub fn nmi_will_trigger(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.nmi_will_trigger();
        }
    }

    pub fn reset(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.reset();
        } else {
            let mut io_value = 0u8;
            io_value.set_bit(IoLine::Game.value(), true);
            io_value.set_bit(IoLine::Exrom.value(), true);
            self.ultimax.set(false);
            self.io_line.borrow_mut().set_value(io_value);
        }
    }
}

impl AddressableFaded for ExpansionPort {
    fn read(&mut self, address: u16) -> Option<u8> {
        self.cartridge.as_mut().and_then(|crt| crt.read(address))
    }

    fn write(&mut self, address: u16, value: u8) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.write(address, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::cartridge::{Chip, ChipType, HwType};
    use super::*;
    use crate::util::{new_shared, new_shared_cell};

    fn setup_port() -> (ExpansionPort, Shared<IoPort>, SharedCell<bool>) {
        let io_line = new_shared(IoPort::new(0xff, 0xff));
        let ultimax = new_shared_cell(false);
        let port = ExpansionPort::new(io_line.clone(), ultimax.clone());
        (port, io_line, ultimax)
    }

    #[test]
    fn no_cartridge_reads_as_off() {
        let (mut port, _io_line, ultimax) = setup_port();
        port.reset();
        assert_eq!(CartridgeMode::Off, port.get_mode());
        assert_eq!(false, ultimax.get());
        assert_eq!(None, port.read(0x8000));
    }

    #[test]
    fn cartridge_lines_select_mode() {
        let (mut port, _io_line, ultimax) = setup_port();
        let mut cartridge = Cartridge::new(HwType::Normal, false, true);
        cartridge.add(Chip {
            chip_type: ChipType::Rom,
            bank_number: 0,
            offset: 0x8000,
            size: 0x2000,
            data: vec![0x42; 0x2000],
        });
        port.attach(cartridge);
        port.reset();
        assert_eq!(CartridgeMode::Normal8k, port.get_mode());
        assert_eq!(false, ultimax.get());
        assert_eq!(Some(0x42), port.read(0x8000));
    }

    #[test]
    fn ultimax_cartridge_raises_flag() {
        let (mut port, _io_line, ultimax) = setup_port();
        let cartridge = Cartridge::new(HwType::Normal, true, false);
        port.attach(cartridge);
        port.reset();
        assert_eq!(CartridgeMode::Ultimax, port.get_mode());
        assert_eq!(true, ultimax.get());
    }
}
