// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

pub mod cartridge;
pub mod control_port;
mod expansion_port;
pub mod joystick;
mod keyboard;

pub use self::cartridge::{Cartridge, Chip, ChipType, CrtConfig, HwType};
pub use self::control_port::ControlPort;
pub use self::expansion_port::{CartridgeMode, ExpansionPort};
pub use self::joystick::Joystick;
pub use self::keyboard::{Key, KeyEvent, Keyboard, TypeEvent, NMI_SOURCE_RESTORE};
