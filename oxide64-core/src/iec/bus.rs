// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{IoPort, Shared};

// Three open-collector lines shared by the CPU side (CIA 2 port A) and
// every drive side (VIA 1 port B). A line is low as soon as any participant
// pulls it; the resolved level is the AND of all driver outputs. Port bits
// use pull polarity: a set output bit pulls the line low, and input bits
// read back 1 while the line is pulled.
//
// CIA 2 port A: bit 3 ATN out, bit 4 CLK out, bit 5 DATA out,
//               bit 6 CLK in, bit 7 DATA in.
// VIA 1 port B: bit 0 DATA in, bit 1 DATA out, bit 2 CLK in, bit 3 CLK out,
//               bit 4 ATN ack, bits 5-6 device address, bit 7 ATN in.

#[derive(Copy, Clone, Default)]
struct DriveSide {
    data_out: bool,
    clk_out: bool,
    atn_ack: bool,
}

pub struct IecBus {
    // CPU-side pull-downs
    cpu_atn: bool,
    cpu_clk: bool,
    cpu_data: bool,
    // Drive-side pull-downs
    drives: Vec<DriveSide>,
    // Resolved line levels, true while released (high)
    atn: bool,
    clk: bool,
    data: bool,
    dirty: bool,
    // Write-back ports
    cia_2_port_a: Shared<IoPort>,
    drive_ports: Vec<Shared<IoPort>>,
    last_cia_in: u8,
    last_drive_in: Vec<u8>,
}

impl IecBus {
    pub fn new(cia_2_port_a: Shared<IoPort>) -> Self {
        Self {
            cpu_atn: false,
            cpu_clk: false,
            cpu_data: false,
            drives: Vec::new(),
            atn: true,
            clk: true,
            data: true,
            dirty: true,
            cia_2_port_a,
            drive_ports: Vec::new(),
            last_cia_in: 0xff,
            last_drive_in: Vec::new(),
        }
    }

    /// Register a drive's VIA 1 port B; returns its bus index.
    pub fn connect_drive(&mut self, via1_port_b: Shared<IoPort>) -> usize {
        self.drives.push(DriveSide::default());
        self.drive_ports.push(via1_port_b);
        self.last_drive_in.push(0xff);
        self.dirty = true;
        self.drives.len() - 1
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Resolved line levels, true = released.
    pub fn get_lines(&self) -> (bool, bool, bool) {
        (self.atn, self.clk, self.data)
    }

    /// CPU-side outputs from the CIA 2 port A value.
    pub fn set_cpu_lines(&mut self, port_value: u8) {
        self.cpu_atn = port_value.get_bit(3);
        self.cpu_clk = port_value.get_bit(4);
        self.cpu_data = port_value.get_bit(5);
        self.dirty = true;
    }

    /// Drive-side outputs from a VIA 1 port B value.
    pub fn set_drive_lines(&mut self, index: usize, port_value: u8) {
        let side = &mut self.drives[index];
        side.data_out = port_value.get_bit(1);
        side.clk_out = port_value.get_bit(3);
        side.atn_ack = port_value.get_bit(4);
        self.dirty = true;
    }

    pub fn reset(&mut self) {
        self.cpu_atn = false;
        self.cpu_clk = false;
        self.cpu_data = false;
        for side in self.drives.iter_mut() {
            *side = DriveSide::default();
        }
        self.dirty = true;
        self.update();
    }

    /// Recompute the line levels and propagate them back into the port
    /// input latches of every participant.
    pub fn update(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.atn = !self.cpu_atn;
        let mut clk_pulled = self.cpu_clk;
        let mut data_pulled = self.cpu_data;
        let atn_low = !self.atn;
        for side in self.drives.iter() {
            clk_pulled |= side.clk_out;
            // The ATN acknowledge gate pulls DATA while ATN is asserted and
            // the drive has not answered yet
            data_pulled |= side.data_out || (atn_low && !side.atn_ack);
        }
        self.clk = !clk_pulled;
        self.data = !data_pulled;

        // CPU side readback
        let mut cia_in = 0xffu8;
        cia_in.set_bit(6, !self.clk);
        cia_in.set_bit(7, !self.data);
        if cia_in != self.last_cia_in {
            self.last_cia_in = cia_in;
            let port = self.cia_2_port_a.clone();
            port.borrow_mut().set_input_bit(6, cia_in.get_bit(6));
            port.borrow_mut().set_input_bit(7, cia_in.get_bit(7));
        }

        // Drive side readback
        for (index, port) in self.drive_ports.iter().enumerate() {
            let mut drive_in = 0xffu8;
            drive_in.set_bit(0, !self.data);
            drive_in.set_bit(2, !self.clk);
            drive_in.set_bit(7, !self.atn);
            if drive_in != self.last_drive_in[index] {
                self.last_drive_in[index] = drive_in;
                port.borrow_mut().set_input_bit(0, drive_in.get_bit(0));
                port.borrow_mut().set_input_bit(2, drive_in.get_bit(2));
                port.borrow_mut().set_input_bit(7, drive_in.get_bit(7));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_bus() -> (IecBus, Shared<IoPort>, Shared<IoPort>) {
        let cia_2_port_a = new_shared(IoPort::new(0x3f, 0xff));
        let via1_port_b = new_shared(IoPort::new(0x1a, 0xff));
        let mut bus = IecBus::new(cia_2_port_a.clone());
        bus.connect_drive(via1_port_b.clone());
        bus.reset();
        (bus, cia_2_port_a, via1_port_b)
    }

    #[test]
    fn released_lines_read_high() {
        let (mut bus, _cia, _via) = setup_bus();
        bus.set_drive_lines(0, 0x10);
        bus.update();
        assert_eq!((true, true, true), bus.get_lines());
    }

    #[test]
    fn any_side_pulls_a_line() {
        let (mut bus, _cia, _via) = setup_bus();
        bus.set_drive_lines(0, 0x10);
        bus.set_cpu_lines(0x10); // CPU pulls CLK
        bus.update();
        assert_eq!((true, false, true), bus.get_lines());
        bus.set_drive_lines(0, 0x10 | 0x02); // drive pulls DATA
        bus.update();
        assert_eq!((true, false, false), bus.get_lines());
    }

    #[test]
    fn atn_is_auto_acknowledged() {
        let (mut bus, _cia, via1_port_b) = setup_bus();
        // Drive releases everything but has ATN ack low
        bus.set_drive_lines(0, 0x00);
        bus.set_cpu_lines(0x08); // CPU asserts ATN
        bus.update();
        let (atn, _clk, data) = bus.get_lines();
        assert_eq!(false, atn);
        // DATA is pulled by the acknowledge gate
        assert_eq!(false, data);
        // The drive sees ATN on port B bit 7
        assert_eq!(true, via1_port_b.borrow().get_value().get_bit(7));
    }

    #[test]
    fn cpu_sees_drive_clk() {
        let (mut bus, cia_2_port_a, _via) = setup_bus();
        bus.set_drive_lines(0, 0x18); // ATN ack high, CLK pulled
        bus.update();
        assert_eq!(true, cia_2_port_a.borrow().get_value().get_bit(6));
    }
}
