// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::LogLevel;

use crate::util::{IoPort, IrqLine, Shared};

// Spec: MOS 6522 VERSATILE INTERFACE ADAPTER Datasheet
// Design:
//   Two timers with latches, the interrupt flag/enable pair and the CA/CB
//   handshake lines cover what the 1541 firmware uses. Timer writes land on
//   the next cycle boundary like the CIA; the shift register is modeled at
//   register level only.

pub mod reg {
    pub const ORB: u8 = 0x00;
    pub const ORA: u8 = 0x01;
    pub const DDRB: u8 = 0x02;
    pub const DDRA: u8 = 0x03;
    pub const T1CL: u8 = 0x04;
    pub const T1CH: u8 = 0x05;
    pub const T1LL: u8 = 0x06;
    pub const T1LH: u8 = 0x07;
    pub const T2CL: u8 = 0x08;
    pub const T2CH: u8 = 0x09;
    pub const SR: u8 = 0x0a;
    pub const ACR: u8 = 0x0b;
    pub const PCR: u8 = 0x0c;
    pub const IFR: u8 = 0x0d;
    pub const IER: u8 = 0x0e;
    pub const ORA_NH: u8 = 0x0f;
}

mod flag {
    pub const CA2: u8 = 1;
    pub const CA1: u8 = 1 << 1;
    pub const SR: u8 = 1 << 2;
    pub const CB2: u8 = 1 << 3;
    pub const CB1: u8 = 1 << 4;
    pub const T2: u8 = 1 << 5;
    pub const T1: u8 = 1 << 6;
}

pub struct Via6522 {
    tag: &'static str,
    irq_source: usize,
    // Timers
    t1_counter: u16,
    t1_latch: u16,
    t1_running: bool,
    t2_counter: u16,
    t2_latch_lo: u8,
    t2_running: bool,
    // Control registers
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,
    sr: u8,
    // Handshake lines
    ca1: bool,
    ca2: bool,
    cb1: bool,
    cb2: bool,
    // I/O
    port_a: Shared<IoPort>,
    port_b: Shared<IoPort>,
    irq_line: Shared<IrqLine>,
}

impl Via6522 {
    pub fn new(
        tag: &'static str,
        irq_source: usize,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        Self {
            tag,
            irq_source,
            t1_counter: 0x01aa,
            t1_latch: 0x0105,
            t1_running: false,
            t2_counter: 0x01aa,
            t2_latch_lo: 0xaa,
            t2_running: false,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            sr: 0,
            ca1: false,
            ca2: true,
            cb1: false,
            cb2: true,
            port_a,
            port_b,
            irq_line,
        }
    }

    pub fn get_port_a(&self) -> Shared<IoPort> {
        self.port_a.clone()
    }

    pub fn get_port_b(&self) -> Shared<IoPort> {
        self.port_b.clone()
    }

    /// CA2 output; the 1541 wires VIA2 CA2 to the byte-ready enable (SOE).
    pub fn get_ca2(&self) -> bool {
        self.ca2
    }

    pub fn get_cb2(&self) -> bool {
        self.cb2
    }

    /// Edge on the CA1 input; VIA2 CA1 carries the byte-ready signal.
    pub fn set_ca1(&mut self, value: bool) {
        let falling = self.ca1 && !value;
        let rising = !self.ca1 && value;
        self.ca1 = value;
        let active_edge_rising = self.pcr.get_bit(0);
        if (active_edge_rising && rising) || (!active_edge_rising && falling) {
            self.set_interrupt(flag::CA1);
        }
    }

    pub fn set_cb1(&mut self, value: bool) {
        let falling = self.cb1 && !value;
        let rising = !self.cb1 && value;
        self.cb1 = value;
        let active_edge_rising = self.pcr.get_bit(4);
        if (active_edge_rising && rising) || (!active_edge_rising && falling) {
            self.set_interrupt(flag::CB1);
        }
    }

    fn set_interrupt(&mut self, flag: u8) {
        self.ifr |= flag;
        self.update_irq_line();
    }

    fn clear_interrupt(&mut self, flag: u8) {
        self.ifr &= !flag;
        self.update_irq_line();
    }

    fn update_irq_line(&mut self) {
        let active = (self.ifr & self.ier & 0x7f) != 0;
        self.ifr.set_bit(7, active);
        self.irq_line.borrow_mut().set_low(self.irq_source, active);
    }

    fn update_ca2(&mut self) {
        // Output modes only; handshake pulses are not needed by the 1541
        match (self.pcr >> 1) & 0x07 {
            0b110 => self.ca2 = false,
            0b111 => self.ca2 = true,
            _ => {}
        }
    }

    fn update_cb2(&mut self) {
        match (self.pcr >> 5) & 0x07 {
            0b110 => self.cb2 = false,
            0b111 => self.cb2 = true,
            _ => {}
        }
    }

    pub fn clock(&mut self) {
        // Timer 1
        if self.t1_counter == 0 {
            if self.t1_running {
                self.set_interrupt(flag::T1);
                if self.acr.get_bit(6) {
                    // Free-run mode reloads from the latch
                    self.t1_counter = self.t1_latch;
                } else {
                    self.t1_running = false;
                }
            }
        } else {
            self.t1_counter = self.t1_counter.wrapping_sub(1);
        }
        // Timer 2 counts system cycles unless wired to PB6 pulses
        if !self.acr.get_bit(5) {
            if self.t2_counter == 0 {
                if self.t2_running {
                    self.set_interrupt(flag::T2);
                    self.t2_running = false;
                }
            } else {
                self.t2_counter = self.t2_counter.wrapping_sub(1);
            }
        }
    }

    pub fn reset(&mut self) {
        self.t1_counter = 0x01aa;
        self.t1_latch = 0x0105;
        self.t1_running = false;
        self.t2_counter = 0x01aa;
        self.t2_latch_lo = 0xaa;
        self.t2_running = false;
        self.acr = 0;
        self.pcr = 0;
        self.ifr = 0;
        self.ier = 0;
        self.sr = 0;
        self.ca1 = false;
        self.ca2 = true;
        self.cb1 = false;
        self.cb2 = true;
        self.port_a.borrow_mut().reset();
        self.port_b.borrow_mut().reset();
        self.update_irq_line();
    }

    // -- I/O

    pub fn read(&mut self, reg: u8) -> u8 {
        let value = match reg {
            reg::ORB => {
                self.clear_interrupt(flag::CB1 | flag::CB2);
                self.port_b.borrow().get_value()
            }
            reg::ORA | reg::ORA_NH => {
                if reg == reg::ORA {
                    self.clear_interrupt(flag::CA1 | flag::CA2);
                }
                self.port_a.borrow().get_value()
            }
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::T1CL => {
                self.clear_interrupt(flag::T1);
                (self.t1_counter & 0xff) as u8
            }
            reg::T1CH => (self.t1_counter >> 8) as u8,
            reg::T1LL => (self.t1_latch & 0xff) as u8,
            reg::T1LH => (self.t1_latch >> 8) as u8,
            reg::T2CL => {
                self.clear_interrupt(flag::T2);
                (self.t2_counter & 0xff) as u8
            }
            reg::T2CH => (self.t2_counter >> 8) as u8,
            reg::SR => self.sr,
            reg::ACR => self.acr,
            reg::PCR => self.pcr,
            reg::IFR => self.ifr,
            reg::IER => self.ier | 0x80,
            _ => panic!("invalid reg {}", reg),
        };
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "via::reg", "{} read 0x{:02x} = 0x{:02x}", self.tag, reg, value);
        }
        value
    }

    pub fn spy_read(&self, reg: u8) -> u8 {
        match reg {
            reg::ORB => self.port_b.borrow().get_value(),
            reg::ORA | reg::ORA_NH => self.port_a.borrow().get_value(),
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::T1CL => (self.t1_counter & 0xff) as u8,
            reg::T1CH => (self.t1_counter >> 8) as u8,
            reg::T1LL => (self.t1_latch & 0xff) as u8,
            reg::T1LH => (self.t1_latch >> 8) as u8,
            reg::T2CL => (self.t2_counter & 0xff) as u8,
            reg::T2CH => (self.t2_counter >> 8) as u8,
            reg::SR => self.sr,
            reg::ACR => self.acr,
            reg::PCR => self.pcr,
            reg::IFR => self.ifr,
            reg::IER => self.ier | 0x80,
            _ => panic!("invalid reg {}", reg),
        }
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "via::reg", "{} write 0x{:02x} = 0x{:02x}", self.tag, reg, value);
        }
        match reg {
            reg::ORB => {
                self.clear_interrupt(flag::CB1 | flag::CB2);
                self.port_b.borrow_mut().set_value(value);
            }
            reg::ORA | reg::ORA_NH => {
                if reg == reg::ORA {
                    self.clear_interrupt(flag::CA1 | flag::CA2);
                }
                self.port_a.borrow_mut().set_value(value);
            }
            reg::DDRB => self.port_b.borrow_mut().set_direction(value),
            reg::DDRA => self.port_a.borrow_mut().set_direction(value),
            reg::T1CL | reg::T1LL => {
                self.t1_latch = (self.t1_latch & 0xff00) | u16::from(value);
            }
            reg::T1CH => {
                self.t1_latch = (u16::from(value) << 8) | (self.t1_latch & 0x00ff);
                self.t1_counter = self.t1_latch;
                self.t1_running = true;
                self.clear_interrupt(flag::T1);
            }
            reg::T1LH => {
                self.t1_latch = (u16::from(value) << 8) | (self.t1_latch & 0x00ff);
                self.clear_interrupt(flag::T1);
            }
            reg::T2CL => {
                self.t2_latch_lo = value;
            }
            reg::T2CH => {
                self.t2_counter = (u16::from(value) << 8) | u16::from(self.t2_latch_lo);
                self.t2_running = true;
                self.clear_interrupt(flag::T2);
            }
            reg::SR => {
                self.sr = value;
            }
            reg::ACR => {
                self.acr = value;
            }
            reg::PCR => {
                self.pcr = value;
                self.update_ca2();
                self.update_cb2();
            }
            reg::IFR => {
                // Writing 1 clears a flag
                self.ifr &= !(value & 0x7f);
                self.update_irq_line();
            }
            reg::IER => {
                if value.get_bit(7) {
                    self.ier |= value & 0x7f;
                } else {
                    self.ier &= !(value & 0x7f);
                }
                self.update_irq_line();
            }
            _ => panic!("invalid reg {}", reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_via() -> Via6522 {
        let port_a = new_shared(IoPort::new(0x00, 0xff));
        let port_b = new_shared(IoPort::new(0x00, 0xff));
        let irq_line = new_shared(IrqLine::new("drive irq"));
        let mut via = Via6522::new("via1", 0, port_a, port_b, irq_line);
        via.reset();
        via
    }

    #[test]
    fn timer_1_one_shot_interrupt() {
        let mut via = setup_via();
        via.write(reg::IER, 0x80 | flag::T1);
        via.write(reg::T1CL, 0x03);
        via.write(reg::T1CH, 0x00);
        for _ in 0..3 {
            via.clock();
            assert_eq!(false, via.irq_line.borrow().is_low());
        }
        via.clock();
        assert_eq!(true, via.irq_line.borrow().is_low());
        // Reading the low counter byte acknowledges
        let _ = via.read(reg::T1CL);
        assert_eq!(false, via.irq_line.borrow().is_low());
    }

    #[test]
    fn timer_1_free_run_reloads() {
        let mut via = setup_via();
        via.write(reg::ACR, 0x40);
        via.write(reg::T1CL, 0x02);
        via.write(reg::T1CH, 0x00);
        for _ in 0..3 {
            via.clock();
        }
        assert_eq!(0x02, u16::from(via.read(reg::T1CL)));
    }

    #[test]
    fn ca1_edge_sets_flag() {
        let mut via = setup_via();
        via.write(reg::IER, 0x80 | flag::CA1);
        via.set_ca1(true);
        assert_eq!(false, via.irq_line.borrow().is_low());
        via.set_ca1(false);
        assert_eq!(true, via.irq_line.borrow().is_low());
        let _ = via.read(reg::ORA);
        assert_eq!(false, via.irq_line.borrow().is_low());
    }

    #[test]
    fn pcr_drives_ca2_output() {
        let mut via = setup_via();
        via.write(reg::PCR, 0b0000_1100);
        assert_eq!(false, via.get_ca2());
        via.write(reg::PCR, 0b0000_1110);
        assert_eq!(true, via.get_ca2());
    }
}
