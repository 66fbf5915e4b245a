// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![cfg_attr(feature = "cargo-clippy", allow(clippy::too_many_arguments))]

use std::rc::Rc;
use std::sync::Arc;

use crate::factory::models::{SidModel, VicModel};
use crate::factory::types::*;
use crate::util::{Clock, IoPort, IrqLine, Pin, Ram, Rom, Shared, SharedCell};

/// ChipFactory provides an interface to construct each chip/component within
/// the system. It allows for each component to be swapped out and replaced by
/// a different implementation. To accomplish this, interactions between chips
/// are modeled without coupling them together: all interactions go through
/// separate I/O state provided as input to each of the chip constructors
/// (`IrqLine`, `Pin`, `IoPort`).
pub trait ChipFactory {
    /// Constructs CPU.
    ///
    /// The three least significant bits of the processor port drive the
    /// bank-switching input lines. The port itself lives in the memory
    /// controller; the CPU forwards $0000/$0001 accesses to it.
    fn new_cpu(
        &self,
        mem: Shared<dyn Addressable>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Box<dyn Cpu>;

    // -- Chipset

    /// Constructs CIA 1 chip.
    ///
    /// CIA 1 is wired to the two control ports and the keyboard matrix.
    /// The factory configures the TOD divider for the power grid it was
    /// built with.
    fn new_cia_1(
        &self,
        joystick_1: SharedCell<u8>,
        joystick_2: SharedCell<u8>,
        keyboard_matrix: Shared<[u8; 16]>,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    /// Constructs CIA 2 chip.
    ///
    /// CIA 2 port A drives the VIC bank select and the IEC output lines.
    fn new_cia_2(
        &self,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        nmi_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    /// Constructs SID chip.
    ///
    /// Since SID processing may be invoked only during v-sync, the system
    /// clock is provided to allow SID to sync up sound generation to the
    /// current cycle when a register read or write is performed. Paddle
    /// positions are read back through registers $19/$1A.
    fn new_sid(
        &self,
        chip_model: SidModel,
        system_clock: Rc<Clock>,
        pot_x: SharedCell<u8>,
        pot_y: SharedCell<u8>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> Shared<dyn Chip>;

    /// Constructs VIC chip.
    ///
    /// Since VIC relies on CIA 2 port A for its memory address generation,
    /// the memory base address is provided through `vic_base_address` and is
    /// updated only when CIA 2 port A changes. The `ultimax` flag is driven
    /// by the expansion port and reroutes g-accesses at $3000-$3FFF.
    fn new_vic(
        &self,
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        ram: Shared<Ram>,
        rom_charset: Shared<Rom>,
        vic_base_address: SharedCell<u16>,
        ultimax: SharedCell<bool>,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        vic_data_bus: SharedCell<u8>,
    ) -> Shared<dyn Chip>;

    // -- Memory

    /// Constructs the memory controller.
    ///
    /// Bank switching is controlled through the 5 input lines (LORAM, HIRAM,
    /// CHAREN, GAME, EXROM) feeding the bank switcher which resolves every
    /// address to a memory source tag.
    fn new_memory(
        &self,
        mmu: Shared<dyn Mmu>,
        cpu_io_port: Shared<IoPort>,
        cia_1: Shared<dyn Chip>,
        cia_2: Shared<dyn Chip>,
        color_ram: Shared<Ram>,
        expansion_port: Shared<dyn AddressableFaded>,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
        sid: Shared<dyn Chip>,
        vic: Shared<dyn Chip>,
        vic_data_bus: SharedCell<u8>,
    ) -> Shared<crate::mem::Memory>;

    /// Constructs RAM with the specified `capacity`.
    fn new_ram(&self, capacity: usize) -> Shared<Ram>;

    /// Constructs ROM from the specified image bytes.
    fn new_rom(&self, data: &[u8], offset: u16) -> Shared<Rom>;
}
