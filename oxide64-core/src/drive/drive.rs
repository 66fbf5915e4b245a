// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::collections::VecDeque;

use bit_field::BitField;

use crate::cpu::Cpu6510;
use crate::factory::Cpu;
use crate::util::{new_shared, IoPort, IrqLine, Pin, Rom, Shared};

use super::disk::{self, Disk};
use super::memory::DriveMemory;
use super::via::Via6522;

// Design:
//   The drive is a second computer: a 6502, two VIAs and the read/write
//   electronics, running on its own clock. Both the CPU clock and the
//   bit-cell carry clock are kept as deadlines in tenths of nanoseconds;
//   execute() advances whichever deadline is behind, so drive time and
//   host time converge without either moving backward.

const CPU_CYCLE_DURATION_DEFAULT: u64 = 10_000;

// Bit-cell carry delays per speed zone, in tenths of nanoseconds for a
// group of four carry cycles.
static DELAY_BETWEEN_CARRIES: [u64; 4] = [40_000 / 4, 37_500 / 4, 35_000 / 4, 32_500 / 4];

// Frames a disk spends in a transitional insertion state.
const INSERTION_DELAY_FRAMES: u8 = 17;

const IRQ_SOURCE_VIA1: usize = 0;
const IRQ_SOURCE_VIA2: usize = 1;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InsertionStatus {
    FullyEjected,
    PartiallyInserted,
    FullyInserted,
    PartiallyEjected,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DriveEvent {
    LedOn,
    LedOff,
    MotorOn,
    MotorOff,
    DiskInserted,
    DiskEjected,
}

pub struct Drive {
    // Configuration
    device_nr: u8,
    connected: bool,
    switched_on: bool,
    // Sub-components
    cpu: Box<dyn Cpu>,
    via1: Shared<Via6522>,
    via2: Shared<Via6522>,
    mem: Shared<DriveMemory>,
    disk: Option<Disk>,
    // Clock convergence, in tenths of nanoseconds
    elapsed_time: u64,
    next_clock: u64,
    next_carry: u64,
    cpu_cycle_duration: u64,
    // Head
    halftrack: u8,
    offset: u32,
    zone: u8,
    // Read/write electronics
    read_shiftreg: u16,
    write_shiftreg: u8,
    counter_uf4: u8,
    carry_counter: u64,
    byte_ready_counter: u8,
    sync: bool,
    byte_ready: bool,
    // State
    spinning: bool,
    red_led: bool,
    insertion_status: InsertionStatus,
    insertion_counter: u8,
    last_via2_pb: u8,
    last_stepper_phase: Option<u8>,
    events: VecDeque<DriveEvent>,
}

impl Drive {
    pub fn new(device_nr: u8) -> Self {
        let irq_line = new_shared(IrqLine::new("drive irq"));
        let nmi_line = new_shared(IrqLine::new("drive nmi"));
        let ba_line = new_shared(Pin::new_high());
        let via1 = new_shared(Via6522::new(
            "via1",
            IRQ_SOURCE_VIA1,
            new_shared(IoPort::new(0x00, 0xff)),
            new_shared(IoPort::new(0x1a, 0xff)),
            irq_line.clone(),
        ));
        let via2 = new_shared(Via6522::new(
            "via2",
            IRQ_SOURCE_VIA2,
            new_shared(IoPort::new(0xff, 0xff)),
            new_shared(IoPort::new(0x6f, 0xff)),
            irq_line.clone(),
        ));
        let mem = new_shared(DriveMemory::new(via1.clone(), via2.clone()));
        let cpu = Box::new(Cpu6510::new(mem.clone(), ba_line, irq_line, nmi_line));
        Drive {
            device_nr,
            connected: false,
            switched_on: true,
            cpu,
            via1,
            via2,
            mem,
            disk: None,
            elapsed_time: 0,
            next_clock: 0,
            next_carry: 0,
            cpu_cycle_duration: CPU_CYCLE_DURATION_DEFAULT,
            halftrack: 41,
            offset: 0,
            zone: 0,
            read_shiftreg: 0,
            write_shiftreg: 0,
            counter_uf4: 0,
            carry_counter: 0,
            byte_ready_counter: 0,
            sync: true,
            byte_ready: true,
            spinning: false,
            red_led: false,
            insertion_status: InsertionStatus::FullyEjected,
            insertion_counter: 0,
            last_via2_pb: 0xff,
            last_stepper_phase: None,
            events: VecDeque::new(),
        }
    }

    pub fn get_device_nr(&self) -> u8 {
        self.device_nr
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &*self.cpu
    }

    pub fn get_cpu_mut(&mut self) -> &mut dyn Cpu {
        &mut *self.cpu
    }

    pub fn get_disk(&self) -> Option<&Disk> {
        self.disk.as_ref()
    }

    pub fn get_disk_mut(&mut self) -> Option<&mut Disk> {
        self.disk.as_mut()
    }

    pub fn get_halftrack(&self) -> u8 {
        self.halftrack
    }

    pub fn get_head_offset(&self) -> u32 {
        self.offset
    }

    pub fn get_insertion_status(&self) -> InsertionStatus {
        self.insertion_status
    }

    pub fn get_via1_port_b(&self) -> Shared<IoPort> {
        self.via1.borrow().get_port_b()
    }

    pub fn is_active(&self) -> bool {
        self.connected && self.switched_on
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_red_led_on(&self) -> bool {
        self.red_led
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    pub fn poll_event(&mut self) -> Option<DriveEvent> {
        self.events.pop_front()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn set_switched_on(&mut self, switched_on: bool) {
        self.switched_on = switched_on;
    }

    pub fn set_clock_frequency(&mut self, host_freq: u32) {
        self.cpu_cycle_duration = 10_000_000_000 / u64::from(host_freq);
    }

    pub fn set_rom(&mut self, rom: Shared<Rom>) {
        self.mem.borrow_mut().set_rom(rom);
    }

    pub fn has_rom(&self) -> bool {
        self.mem.borrow().has_rom()
    }

    // -- Disk Ops

    pub fn insert_disk(&mut self, disk: Disk) {
        self.disk = Some(disk);
        self.insertion_status = InsertionStatus::PartiallyInserted;
        self.insertion_counter = 0;
    }

    pub fn eject_disk(&mut self) {
        if self.disk.is_some() {
            self.insertion_status = InsertionStatus::PartiallyEjected;
            self.insertion_counter = 0;
        }
    }

    /// Advance the insertion state machine; called once per frame.
    pub fn process_vsync(&mut self) {
        match self.insertion_status {
            InsertionStatus::PartiallyInserted => {
                self.insertion_counter += 1;
                if self.insertion_counter >= INSERTION_DELAY_FRAMES {
                    self.insertion_status = InsertionStatus::FullyInserted;
                    self.events.push_back(DriveEvent::DiskInserted);
                }
            }
            InsertionStatus::PartiallyEjected => {
                self.insertion_counter += 1;
                if self.insertion_counter >= INSERTION_DELAY_FRAMES {
                    self.insertion_status = InsertionStatus::FullyEjected;
                    self.disk = None;
                    self.events.push_back(DriveEvent::DiskEjected);
                }
            }
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
        self.via1.borrow_mut().reset();
        self.via2.borrow_mut().reset();
        self.mem.borrow_mut().reset();
        // Firmware idle loop entry, matching the hardware reset behavior
        self.cpu.set_pc(0xeaa0);
        self.elapsed_time = 0;
        self.next_clock = 0;
        self.next_carry = 0;
        self.halftrack = 41;
        self.offset = 0;
        self.zone = 0;
        self.read_shiftreg = 0;
        self.write_shiftreg = 0;
        self.counter_uf4 = 0;
        self.carry_counter = 0;
        self.byte_ready_counter = 0;
        self.sync = true;
        self.byte_ready = true;
        self.spinning = false;
        self.red_led = false;
        self.last_via2_pb = 0xff;
        self.last_stepper_phase = None;
    }

    // -- Execution

    /// Run the drive for `duration` tenths of nanoseconds.
    pub fn execute(&mut self, duration: u64) {
        self.elapsed_time += duration;
        if !self.is_active() {
            self.next_clock = self.elapsed_time;
            self.next_carry = self.elapsed_time;
            return;
        }
        while self.next_clock < self.elapsed_time || self.next_carry < self.elapsed_time {
            if self.next_clock <= self.next_carry {
                self.execute_cpu_cycle();
                self.next_clock += self.cpu_cycle_duration;
            } else {
                if self.spinning {
                    self.execute_uf4();
                }
                self.next_carry += DELAY_BETWEEN_CARRIES[self.zone as usize];
            }
        }
    }

    fn execute_cpu_cycle(&mut self) {
        self.cpu.clock();
        self.via1.borrow_mut().clock();
        self.via2.borrow_mut().clock();
        self.apply_via2_port_b();
        self.update_byte_ready();
    }

    fn apply_via2_port_b(&mut self) {
        let port_b = self.via2.borrow().get_port_b();
        let value = port_b.borrow().get_value();
        let direction = port_b.borrow().get_direction();
        if value == self.last_via2_pb {
            return;
        }
        self.last_via2_pb = value;

        // Bits 0-1 step the head by half tracks, once the firmware drives
        // the stepper lines as outputs
        if direction & 0x03 == 0x03 {
            let new_phase = value & 0x03;
            if let Some(old_phase) = self.last_stepper_phase {
                if new_phase == (old_phase + 1) & 0x03 {
                    self.move_head_up();
                } else if new_phase == old_phase.wrapping_sub(1) & 0x03 {
                    self.move_head_down();
                }
            }
            self.last_stepper_phase = Some(new_phase);
        }
        // Bit 2 motor
        let motor = value.get_bit(2);
        if motor != self.spinning {
            self.spinning = motor;
            self.events.push_back(if motor {
                DriveEvent::MotorOn
            } else {
                DriveEvent::MotorOff
            });
        }
        // Bit 3 red LED
        let led = value.get_bit(3);
        if led != self.red_led {
            self.red_led = led;
            self.events.push_back(if led {
                DriveEvent::LedOn
            } else {
                DriveEvent::LedOff
            });
        }
        // Bits 5-6 density
        self.zone = (value >> 5) & 0x03;
    }

    pub fn move_head_up(&mut self) {
        if self.halftrack < disk::NUM_HALFTRACKS as u8 {
            let position = self.track_position();
            self.halftrack += 1;
            self.offset = self.scale_position(position);
        }
    }

    pub fn move_head_down(&mut self) {
        if self.halftrack > 1 {
            let position = self.track_position();
            self.halftrack -= 1;
            self.offset = self.scale_position(position);
        }
    }

    fn track_position(&self) -> f64 {
        match self.disk {
            Some(ref disk) => {
                f64::from(self.offset) / f64::from(disk.length_of_halftrack(self.halftrack))
            }
            None => 0.0,
        }
    }

    fn scale_position(&self, position: f64) -> u32 {
        match self.disk {
            Some(ref disk) => {
                (position * f64::from(disk.length_of_halftrack(self.halftrack))) as u32
            }
            None => 0,
        }
    }

    // -- Read/Write Electronics

    fn read_mode(&self) -> bool {
        self.via2.borrow().get_cb2()
    }

    fn write_mode(&self) -> bool {
        !self.read_mode()
    }

    fn light_barrier_blocked(&self) -> bool {
        match self.insertion_status {
            InsertionStatus::FullyInserted => self
                .disk
                .as_ref()
                .map_or(true, |disk| disk.is_write_protected()),
            _ => true,
        }
    }

    fn read_bit_from_head(&self) -> u8 {
        if self.insertion_status == InsertionStatus::FullyInserted {
            if let Some(ref disk) = self.disk {
                return disk.read_bit(self.halftrack, self.offset);
            }
        }
        0
    }

    fn write_bit_to_head(&mut self, value: bool) {
        let halftrack = self.halftrack;
        let offset = self.offset;
        if self.insertion_status == InsertionStatus::FullyInserted {
            if let Some(ref mut disk) = self.disk {
                disk.write_bit(halftrack, offset, value);
            }
        }
    }

    fn rotate_disk(&mut self) {
        self.offset += 1;
        let length = self
            .disk
            .as_ref()
            .map_or(disk::MAX_BYTES_PER_TRACK as u32 * 8, |disk| {
                disk.length_of_halftrack(self.halftrack)
            });
        if self.offset >= length {
            self.offset = 0;
        }
    }

    /// One cycle of the UF4 counter that clocks the read/write logic. A new
    /// bit cell arrives every fourth cycle.
    fn execute_uf4(&mut self) {
        self.counter_uf4 = self.counter_uf4.wrapping_add(1);
        self.carry_counter += 1;

        if self.carry_counter % 4 == 0 {
            // An incoming 1 resets UF4; this is the clock-recovery loop
            if self.read_mode() && self.read_bit_from_head() != 0 {
                self.counter_uf4 = 0;
            }
            self.rotate_disk();
        }

        // SYNC is active low: it drops while the shift register holds ten
        // one bits in read mode
        self.sync = (self.read_shiftreg & 0x03ff) != 0x03ff || self.write_mode();
        if !self.sync {
            self.byte_ready_counter = 0;
        }
        self.via2
            .borrow()
            .get_port_b()
            .borrow_mut()
            .set_input_bit(7, self.sync);
        self.via2
            .borrow()
            .get_port_b()
            .borrow_mut()
            .set_input_bit(4, !self.light_barrier_blocked());

        match self.counter_uf4 & 0x03 {
            0x00 | 0x01 => {
                self.update_byte_ready();
            }
            0x02 => {
                self.raise_byte_ready();
                self.byte_ready_counter = if self.sync {
                    (self.byte_ready_counter + 1) % 8
                } else {
                    0
                };
                if self.write_mode() && !self.light_barrier_blocked() {
                    let bit = self.write_shiftreg & 0x80 != 0;
                    self.write_bit_to_head(bit);
                }
                self.write_shiftreg <<= 1;
                self.read_shiftreg <<= 1;
                if (self.counter_uf4 & 0x0c) == 0 {
                    self.read_shiftreg |= 1;
                }
            }
            0x03 => {
                if self.byte_ready_counter == 7 {
                    self.write_shiftreg = self.via2.borrow().get_port_a().borrow().get_value();
                }
            }
            _ => unreachable!(),
        }
    }

    fn update_byte_ready(&mut self) {
        /*
                   74LS191                             ---
                   -------               VIA2::CA2 ---|   |
          SYNC --o| Load  |                UF4::QB --o| & |o-- Byte Ready
            QB ---| Clk   |                        ---|   |
                  |    QD |   ---                  |   ---
                  |    QC |--|   |    ---          |
                  |    QB |--| & |o--| 1 |o---------
                  |    QA |--|   |    ---
                   -------    ---
                     UE3
        */
        let ca2 = self.via2.borrow().get_ca2();
        let qb = self.counter_uf4 & 0x02 != 0;
        let ue3 = self.byte_ready_counter == 7;
        let new_byte_ready = !(ca2 && !qb && ue3);
        if self.byte_ready != new_byte_ready {
            self.byte_ready = new_byte_ready;
            if !new_byte_ready {
                // Latch the assembled byte on VIA 2 port A
                let byte = (self.read_shiftreg & 0xff) as u8;
                self.via2
                    .borrow()
                    .get_port_a()
                    .borrow_mut()
                    .set_input(byte);
            }
            self.via2.borrow_mut().set_ca1(new_byte_ready);
        }
    }

    fn raise_byte_ready(&mut self) {
        if !self.byte_ready {
            self.byte_ready = true;
            self.via2.borrow_mut().set_ca1(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::via::reg;
    use super::*;

    fn setup_drive() -> Drive {
        let mut drive = Drive::new(8);
        drive.set_connected(true);
        drive.reset();
        drive
    }

    fn sync_stepper(drive: &mut Drive) {
        drive.via2.borrow_mut().write(reg::DDRB, 0x6f);
        drive.apply_via2_port_b();
    }

    fn activate_head(drive: &mut Drive) {
        // Read mode, byte ready enabled
        drive.via2.borrow_mut().write(reg::PCR, 0b1110_1110);
        // Motor on, LED on, zone from halftrack
        drive.via2.borrow_mut().write(reg::DDRB, 0x6f);
        drive.via2.borrow_mut().write(reg::ORB, 0b0000_1100);
        drive.apply_via2_port_b();
    }

    fn insert_formatted_disk(drive: &mut Drive) {
        let mut disk = Disk::new();
        let data = [0x42u8; 256];
        disk.encode_sector(21, 0, 0x30, 0x30, &data, 0, 9);
        drive.insert_disk(disk);
        for _ in 0..INSERTION_DELAY_FRAMES {
            drive.process_vsync();
        }
    }

    #[test]
    fn insertion_takes_frames() {
        let mut drive = setup_drive();
        drive.insert_disk(Disk::new());
        assert_eq!(
            InsertionStatus::PartiallyInserted,
            drive.get_insertion_status()
        );
        for _ in 0..INSERTION_DELAY_FRAMES {
            drive.process_vsync();
        }
        assert_eq!(InsertionStatus::FullyInserted, drive.get_insertion_status());
        assert_eq!(Some(DriveEvent::DiskInserted), drive.poll_event());
    }

    #[test]
    fn motor_and_led_follow_via2_port_b() {
        let mut drive = setup_drive();
        activate_head(&mut drive);
        assert_eq!(true, drive.is_spinning());
        assert_eq!(true, drive.is_red_led_on());
        assert_eq!(Some(DriveEvent::MotorOn), drive.poll_event());
        assert_eq!(Some(DriveEvent::LedOn), drive.poll_event());
    }

    #[test]
    fn stepper_moves_half_tracks() {
        let mut drive = setup_drive();
        sync_stepper(&mut drive);
        let start = drive.get_halftrack();
        drive.via2.borrow_mut().write(reg::ORB, 0x01);
        drive.apply_via2_port_b();
        assert_eq!(start + 1, drive.get_halftrack());
        drive.via2.borrow_mut().write(reg::ORB, 0x00);
        drive.apply_via2_port_b();
        assert_eq!(start, drive.get_halftrack());
    }

    #[test]
    fn sync_found_on_formatted_track() {
        let mut drive = setup_drive();
        insert_formatted_disk(&mut drive);
        // Head on halftrack 41 = track 21 where the sector was written
        assert_eq!(41, drive.get_halftrack());
        activate_head(&mut drive);
        let mut found_sync = false;
        for _ in 0..200_000 {
            drive.execute_uf4();
            if !drive.sync {
                found_sync = true;
                break;
            }
        }
        assert_eq!(true, found_sync);
    }

    #[test]
    fn byte_ready_latches_header_id() {
        let mut drive = setup_drive();
        insert_formatted_disk(&mut drive);
        activate_head(&mut drive);
        // Run the bit clock until a byte is latched after the first sync
        let mut saw_sync = false;
        let mut latched = None;
        for _ in 0..400_000 {
            drive.execute_uf4();
            if !drive.sync {
                saw_sync = true;
            }
            if saw_sync && drive.sync && !drive.byte_ready {
                latched = Some(drive.via2.borrow().get_port_a().borrow().get_value());
                break;
            }
        }
        assert_eq!(Some(0x52), latched);
    }
}
