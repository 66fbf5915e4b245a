// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::LogLevel;

// SPEC: http://ist.uwaterloo.ca/~schepers/formats/CRT.TXT
// Design:
//   All cartridge variants share one operation set: ROML/ROMH reads and
//   writes, IO1/IO2 access, a reset hook for the startup GAME/EXROM
//   configuration, an NMI hook for freezer buttons and a per-cycle hook
//   for the Epyx capacitor. Variant behavior is dispatched on the hardware
//   type; per-variant state lives in the shared fields it needs.

const EPYX_CHARGE_CYCLES: u32 = 512;

pub enum ChipType {
    Rom,
    Ram,
    FlashRom,
}

impl ChipType {
    pub fn from(chip_type: u16) -> ChipType {
        match chip_type {
            0x00 => ChipType::Rom,
            0x01 => ChipType::Ram,
            0x02 => ChipType::FlashRom,
            _ => panic!("invalid chip type {}", chip_type),
        }
    }
}

pub struct Chip {
    pub chip_type: ChipType,
    pub bank_number: u8,
    pub offset: u16,
    pub size: u16,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HwType {
    Normal,
    ActionReplay,
    Final3,
    SimonsBasic,
    OceanType1,
    EpyxFastload,
    GameSystem,
    MagicDesk,
    EasyFlash,
}

impl HwType {
    pub fn from(value: u8) -> HwType {
        match value {
            0 => HwType::Normal,
            1 => HwType::ActionReplay,
            3 => HwType::Final3,
            4 => HwType::SimonsBasic,
            5 => HwType::OceanType1,
            10 => HwType::EpyxFastload,
            15 => HwType::GameSystem,
            19 => HwType::MagicDesk,
            32 => HwType::EasyFlash,
            _ => panic!("invalid hardware type {}", value),
        }
    }

    pub fn is_mirrored(self) -> bool {
        match self {
            HwType::OceanType1 | HwType::MagicDesk | HwType::Normal => true,
            _ => false,
        }
    }

    fn ram_capacity(self) -> usize {
        match self {
            HwType::EasyFlash => 0x100,
            HwType::ActionReplay => 0x2000,
            _ => 0,
        }
    }
}

pub struct CrtConfig {
    pub exrom: bool,
    pub game: bool,
}

impl CrtConfig {
    pub fn new() -> Self {
        CrtConfig {
            exrom: true,
            game: true,
        }
    }
}

type BankArray = Vec<Option<Chip>>;

pub struct Cartridge {
    hw_type: HwType,
    exrom: bool,
    game: bool,
    banks_lo: BankArray,
    banks_hi: BankArray,
    ram: Vec<u8>,
    // Observers
    io_observer: Option<Box<dyn Fn(&CrtConfig)>>,
    led_observer: Option<Box<dyn Fn(bool)>>,
    // Runtime state
    bank_lo: usize,
    bank_hi: usize,
    io_config: CrtConfig,
    reg_value: u8,
    mode_reg: u8,
    ram_at_rom_lo: bool,
    epyx_counter: u32,
    frozen: bool,
}

impl Cartridge {
    pub fn new(hw_type: HwType, exrom: bool, game: bool) -> Self {
        let mut banks_lo = Vec::with_capacity(64);
        let mut banks_hi = Vec::with_capacity(64);
        for _ in 0..64 {
            banks_lo.push(None);
            banks_hi.push(None);
        }
        Cartridge {
            hw_type,
            exrom,
            game,
            banks_lo,
            banks_hi,
            ram: vec![0; hw_type.ram_capacity()],
            io_observer: None,
            led_observer: None,
            bank_lo: 0,
            bank_hi: 0,
            io_config: CrtConfig::new(),
            reg_value: 0,
            mode_reg: 0,
            ram_at_rom_lo: false,
            epyx_counter: EPYX_CHARGE_CYCLES,
            frozen: false,
        }
    }

    pub fn get_hw_type(&self) -> HwType {
        self.hw_type
    }

    pub fn set_io_observer(&mut self, observer: Option<Box<dyn Fn(&CrtConfig)>>) {
        self.io_observer = observer;
    }

    pub fn set_led_observer(&mut self, observer: Option<Box<dyn Fn(bool)>>) {
        self.led_observer = observer;
    }

    pub fn add(&mut self, chip: Chip) {
        let bank_num = chip.bank_number as usize;
        if chip.offset == 0x8000 {
            self.banks_lo[bank_num] = Some(chip);
        } else {
            self.banks_hi[bank_num] = Some(chip);
        }
    }

    /// Startup GAME/EXROM configuration.
    pub fn reset(&mut self) {
        self.bank_lo = 0;
        self.bank_hi = 0;
        self.reg_value = 0;
        self.mode_reg = 0;
        self.ram_at_rom_lo = false;
        self.epyx_counter = EPYX_CHARGE_CYCLES;
        self.frozen = false;
        self.io_config = match self.hw_type {
            // EasyFlash boots in ultimax to run its menu
            HwType::EasyFlash => CrtConfig {
                exrom: true,
                game: false,
            },
            _ => CrtConfig {
                exrom: self.exrom,
                game: self.game,
            },
        };
        self.notify_io_changed();
    }

    /// Per-cycle hook; only the Epyx capacitor needs it.
    pub fn clock(&mut self) {
        if self.hw_type == HwType::EpyxFastload && self.epyx_counter > 0 {
            self.epyx_counter -= 1;
            if self.epyx_counter == 0 {
                self.io_config = CrtConfig {
                    exrom: true,
                    game: true,
                };
                self.notify_io_changed();
            }
        }
    }

    /// Freezer carts hijack the NMI acknowledge to force ultimax.
    pub fn nmi_will_trigger(&mut self) {
        match self.hw_type {
            HwType::ActionReplay | HwType::Final3 => {
                self.frozen = true;
                self.io_config = CrtConfig {
                    exrom: true,
                    game: false,
                };
                self.notify_io_changed();
            }
            _ => {}
        }
    }

    fn notify_io_changed(&self) {
        if let Some(ref observer) = self.io_observer {
            observer(&self.io_config);
        }
    }

    fn set_led(&mut self, on: bool) {
        if let Some(ref observer) = self.led_observer {
            observer(on);
        }
    }

    fn epyx_charge(&mut self) {
        if self.epyx_counter == 0 {
            self.io_config = CrtConfig {
                exrom: false,
                game: true,
            };
            self.notify_io_changed();
        }
        self.epyx_counter = EPYX_CHARGE_CYCLES;
    }

    fn switch_bank(&mut self, bank_number: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "cart::banks", "Switching to bank {}", bank_number);
        }
        let bank = bank_number as usize & 0x3f;
        self.bank_lo = bank;
        self.bank_hi = bank;
    }

    fn read_rom_lo(&self, address: u16) -> Option<u8> {
        if self.ram_at_rom_lo {
            return Some(self.ram[(address as usize - 0x8000) & (self.ram.len() - 1)]);
        }
        self.banks_lo[self.bank_lo]
            .as_ref()
            .map(|bank| bank.data[(address - 0x8000) as usize])
    }

    fn read_rom_hi(&self, address: u16) -> Option<u8> {
        let offset = (address & 0x1fff) as usize;
        if let Some(ref bank) = self.banks_hi[self.bank_hi] {
            Some(bank.data[offset])
        } else if self.hw_type.is_mirrored() {
            self.banks_lo[self.bank_lo]
                .as_ref()
                .map(|bank| bank.data[offset])
        } else {
            None
        }
    }

    // -- IO1/IO2

    fn read_io1(&mut self, address: u16) -> u8 {
        match self.hw_type {
            HwType::GameSystem => {
                self.switch_bank((address & 0x3f) as u8);
                self.reg_value
            }
            HwType::EpyxFastload => {
                self.epyx_charge();
                self.banks_lo[0]
                    .as_ref()
                    .map_or(0, |bank| bank.data[(address & 0x1fff) as usize])
            }
            HwType::EasyFlash => {
                if address & 0x02 == 0 {
                    self.reg_value
                } else {
                    self.mode_reg & 0x87
                }
            }
            _ => self.reg_value,
        }
    }

    fn read_io2(&mut self, address: u16) -> u8 {
        match self.hw_type {
            HwType::EasyFlash => self.ram[(address & 0xff) as usize],
            HwType::EpyxFastload => {
                // IO2 mirrors the last ROM page
                self.banks_lo[0]
                    .as_ref()
                    .map_or(0, |bank| bank.data[0x1f00 + (address & 0xff) as usize])
            }
            _ => self.reg_value,
        }
    }

    fn write_io1(&mut self, address: u16, value: u8) {
        self.reg_value = value;
        match self.hw_type {
            HwType::Normal => {
                self.switch_bank(value & 0x3f);
            }
            HwType::EasyFlash => {
                if address & 0x02 == 0 {
                    self.switch_bank(value & 0x3f);
                } else {
                    self.write_easyflash_mode(value);
                }
            }
            HwType::ActionReplay => {
                self.write_action_replay_control(value);
            }
            HwType::Final3 => {
                if address == 0xde00 {
                    self.switch_bank(value.wrapping_sub(0x40));
                }
            }
            HwType::MagicDesk => {
                if address == 0xde00 {
                    if !value.get_bit(7) {
                        self.switch_bank(value & 0x3f);
                        self.io_config = CrtConfig {
                            exrom: self.exrom,
                            game: self.game,
                        };
                    } else {
                        self.io_config = CrtConfig {
                            exrom: true,
                            game: true,
                        };
                    }
                    self.notify_io_changed();
                }
            }
            HwType::OceanType1 => {
                if address == 0xde00 && value.get_bit(7) {
                    self.switch_bank(value & 0x3f);
                }
            }
            HwType::SimonsBasic => {
                if address == 0xde00 {
                    self.io_config.game = value != 0x01;
                    self.notify_io_changed();
                }
            }
            _ => {}
        }
    }

    fn write_io2(&mut self, address: u16, value: u8) {
        match self.hw_type {
            HwType::EasyFlash => {
                self.ram[(address & 0xff) as usize] = value;
            }
            HwType::Final3 => {
                // Writes to IO2 end a freeze
                if self.frozen {
                    self.frozen = false;
                    self.io_config = CrtConfig {
                        exrom: self.exrom,
                        game: self.game,
                    };
                    self.notify_io_changed();
                }
                self.reg_value = value;
            }
            _ => {
                self.reg_value = value;
            }
        }
    }

    fn write_easyflash_mode(&mut self, value: u8) {
        self.mode_reg = value;
        self.set_led(value.get_bit(7));
        /*
         * MXG
         * 0 (000) : GAME from jumper, EXROM high (Ultimax or Off)
         * 2 (010) : GAME from jumper, EXROM low (16K or 8K)
         * 4 (100) : Cartridge ROM off (RAM at $DF00 still available)
         * 5 (101) : Ultimax
         * 6 (110) : 8K cartridge
         * 7 (111) : 16K cartridge
         */
        let (game, exrom) = match value & 0x07 {
            0b000 | 0b001 => (false, true),
            0b010 | 0b011 => (false, false),
            0b100 => (true, true),
            0b101 => (false, true),
            0b110 => (true, false),
            _ => (false, false),
        };
        self.io_config = CrtConfig { exrom, game };
        self.notify_io_changed();
    }

    fn write_action_replay_control(&mut self, value: u8) {
        /*
        Bit 0: GAME line (0 = asserted)
        Bit 1: EXROM line (1 = asserted)
        Bit 2: disable cartridge
        Bits 3-4: ROM bank
        Bit 5: RAM at $8000
        Bit 6: reset freeze
        */
        self.switch_bank((value >> 3) & 0x03);
        self.ram_at_rom_lo = value.get_bit(5);
        if value.get_bit(6) {
            self.frozen = false;
        }
        if value.get_bit(2) && !self.frozen {
            self.io_config = CrtConfig {
                exrom: true,
                game: true,
            };
        } else {
            self.io_config = CrtConfig {
                exrom: value.get_bit(1),
                game: !value.get_bit(0),
            };
        }
        self.notify_io_changed();
    }

    // -- Device I/O

    pub fn read(&mut self, address: u16) -> Option<u8> {
        match address {
            0x8000..=0x9fff => {
                if self.hw_type == HwType::EpyxFastload {
                    self.epyx_charge();
                }
                self.read_rom_lo(address)
            }
            0xa000..=0xbfff => self.read_rom_hi(address),
            0xe000..=0xffff => self.read_rom_hi(address),
            0xde00..=0xdeff => Some(self.read_io1(address)),
            0xdf00..=0xdfff => Some(self.read_io2(address)),
            _ => panic!("invalid address {:04x}", address),
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0x8000..=0x9fff => {
                if self.ram_at_rom_lo {
                    let len = self.ram.len();
                    self.ram[(address as usize - 0x8000) & (len - 1)] = value;
                }
            }
            0xa000..=0xbfff | 0xe000..=0xffff => {}
            0xde00..=0xdeff => self.write_io1(address, value),
            0xdf00..=0xdfff => self.write_io2(address, value),
            _ => panic!("invalid address {:04x}", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_chip(bank: u8, offset: u16, fill: u8) -> Chip {
        Chip {
            chip_type: ChipType::Rom,
            bank_number: bank,
            offset,
            size: 0x2000,
            data: vec![fill; 0x2000],
        }
    }

    fn setup_easyflash() -> Cartridge {
        let mut cart = Cartridge::new(HwType::EasyFlash, false, false);
        for bank in 0..4 {
            cart.add(rom_chip(bank, 0x8000, 0x10 + bank));
            cart.add(rom_chip(bank, 0xa000, 0x20 + bank));
        }
        cart.reset();
        cart
    }

    #[test]
    fn easyflash_bank_switch() {
        let mut cart = setup_easyflash();
        cart.write(0xde00, 0x03);
        cart.write(0xde02, 0x87);
        assert_eq!(Some(0x13), cart.read(0x8000));
        assert_eq!(Some(0x23), cart.read(0xa000));
        assert_eq!(false, cart.io_config.exrom);
        assert_eq!(false, cart.io_config.game);
    }

    #[test]
    fn easyflash_registers_read_back() {
        let mut cart = setup_easyflash();
        cart.write(0xde00, 0x2a);
        cart.write(0xde02, 0x85);
        assert_eq!(Some(0x2a), cart.read(0xde00));
        assert_eq!(Some(0x85), cart.read(0xde02));
    }

    #[test]
    fn easyflash_io2_ram() {
        let mut cart = setup_easyflash();
        cart.write(0xdf42, 0x5a);
        assert_eq!(Some(0x5a), cart.read(0xdf42));
    }

    #[test]
    fn normal_cartridge_mirrors_rom_hi() {
        let mut cart = Cartridge::new(HwType::Normal, false, true);
        cart.add(rom_chip(0, 0x8000, 0x42));
        cart.reset();
        assert_eq!(Some(0x42), cart.read(0x8000));
        assert_eq!(Some(0x42), cart.read(0xa000));
    }

    #[test]
    fn epyx_capacitor_discharges() {
        let mut cart = Cartridge::new(HwType::EpyxFastload, false, true);
        cart.add(rom_chip(0, 0x8000, 0x11));
        cart.reset();
        for _ in 0..EPYX_CHARGE_CYCLES {
            cart.clock();
        }
        assert_eq!(true, cart.io_config.exrom);
        assert_eq!(true, cart.io_config.game);
        // Touching IO1 recharges and maps the ROM back in
        let _ = cart.read(0xde00);
        assert_eq!(false, cart.io_config.exrom);
    }

    #[test]
    fn action_replay_freeze_forces_ultimax() {
        let mut cart = Cartridge::new(HwType::ActionReplay, false, true);
        cart.add(rom_chip(0, 0x8000, 0x11));
        cart.reset();
        cart.nmi_will_trigger();
        assert_eq!(true, cart.io_config.exrom);
        assert_eq!(false, cart.io_config.game);
    }
}
