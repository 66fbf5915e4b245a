// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{CycleCounter, Pin, Shared};

// Spec: 6526 COMPLEX INTERFACE ADAPTER (CIA) Datasheet
// Design:
//   The timer is driven through a shift-delay pipeline so that writes and
//   count pulses land on their documented cycle boundaries. A count pulse
//   fed at cycle N decrements the counter at N+2 and underflow is detected
//   one pipeline stage earlier, which reproduces the CIA's one-cycle write
//   delays and the timer-B cascade timing.

pub mod delays {
    pub const COUNT0: u16 = 1;
    pub const COUNT1: u16 = 1 << 1;
    pub const COUNT2: u16 = 1 << 2;
    pub const COUNT3: u16 = 1 << 3;
    pub const LOAD0: u16 = 1 << 5;
    pub const LOAD1: u16 = 1 << 6;
    pub const MASK: u16 = COUNT0 | COUNT1 | COUNT2 | COUNT3 | LOAD0 | LOAD1;
}

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    TimerA,
    TimerB,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Input {
    SystemClock,
    External,
    TimerA,
    TimerAWithCnt,
}

pub struct Timer {
    // Configuration
    mode: Mode,
    config: u8,
    enabled: bool,
    input: Input,
    one_shot: bool,
    pb_on: bool,
    pb_toggle_mode: bool,
    // Runtime State
    latch: u16,
    counter: u16,
    pipeline: CycleCounter,
    pb_toggle: bool,
    pb_pulse: bool,
    // I/O
    cnt_pin: Shared<Pin>,
}

impl Timer {
    pub fn new(mode: Mode, cnt_pin: Shared<Pin>) -> Self {
        Self {
            mode,
            config: 0,
            enabled: false,
            input: Input::SystemClock,
            one_shot: false,
            pb_on: false,
            pb_toggle_mode: false,
            latch: 0xffff,
            counter: 0,
            pipeline: CycleCounter::new(delays::MASK),
            pb_toggle: false,
            pb_pulse: false,
            cnt_pin,
        }
    }

    pub fn get_config(&self) -> u8 {
        // Force-load strobe reads back as zero
        self.config & !0x10
    }

    pub fn get_counter(&self) -> u16 {
        self.counter
    }

    pub fn get_counter_lo(&self) -> u8 {
        (self.counter & 0xff) as u8
    }

    pub fn get_counter_hi(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    pub fn get_latch(&self) -> u16 {
        self.latch
    }

    pub fn is_pb_on(&self) -> bool {
        self.pb_on
    }

    pub fn get_pb_output(&self) -> bool {
        if self.pb_toggle_mode {
            self.pb_toggle
        } else {
            self.pb_pulse
        }
    }

    pub fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | u16::from(value);
    }

    pub fn set_latch_hi(&mut self, value: u8) {
        self.latch = (u16::from(value) << 8) | (self.latch & 0x00ff);
        // A stopped timer reloads on a high-latch write
        if !self.enabled {
            self.pipeline.feed(delays::LOAD0);
        }
    }

    pub fn set_config(&mut self, value: u8) {
        let was_enabled = self.enabled;
        self.config = value;
        self.enabled = value.get_bit(0);
        self.pb_on = value.get_bit(1);
        self.pb_toggle_mode = value.get_bit(2);
        self.one_shot = value.get_bit(3);
        self.input = match self.mode {
            Mode::TimerA => {
                if value.get_bit(5) {
                    Input::External
                } else {
                    Input::SystemClock
                }
            }
            Mode::TimerB => match (value >> 5) & 0x03 {
                0 => Input::SystemClock,
                1 => Input::External,
                2 => Input::TimerA,
                _ => Input::TimerAWithCnt,
            },
        };
        if !was_enabled && self.enabled {
            // Toggle output starts high whenever the timer is started
            self.pb_toggle = true;
            if self.input == Input::SystemClock {
                self.pipeline.feed(delays::COUNT0 | delays::COUNT1);
            }
        }
        self.pipeline.autofeed(
            delays::COUNT0,
            self.enabled && self.input == Input::SystemClock,
        );
        if value.get_bit(4) {
            self.pipeline.feed(delays::LOAD0);
        }
    }

    /// Feed external count sources. `pulse` carries the timer A underflow
    /// for the cascaded timer B modes.
    pub fn feed_source(&mut self, pulse: bool) {
        if !self.enabled {
            return;
        }
        let feed = match self.input {
            Input::SystemClock => false,
            Input::External => self.cnt_pin.borrow().is_rising(),
            Input::TimerA => pulse,
            Input::TimerAWithCnt => pulse && self.cnt_pin.borrow().is_high(),
        };
        if feed {
            self.pipeline.feed(delays::COUNT1);
        }
    }

    pub fn clock(&mut self) -> bool {
        self.pb_pulse = false;
        if self.pipeline.has_cycle(delays::COUNT3) {
            self.counter = self.counter.wrapping_sub(1);
        }
        let mut output = false;
        if self.counter == 0 && self.pipeline.has_cycle(delays::COUNT2) {
            output = true;
            self.pb_pulse = true;
            self.pb_toggle = !self.pb_toggle;
            if self.one_shot {
                self.enabled = false;
                self.config &= !0x01;
                self.pipeline.autofeed(delays::COUNT0, false);
                self.pipeline.remove(delays::COUNT0 | delays::COUNT1);
            }
            self.pipeline.feed(delays::LOAD1);
        }
        if self.pipeline.has_cycle(delays::LOAD1) {
            self.counter = self.latch;
            // The reload eats the count pulse in flight
            self.pipeline.remove(delays::COUNT2);
        }
        self.pipeline.clock();
        output
    }

    pub fn reset(&mut self) {
        self.config = 0x08;
        self.enabled = false;
        self.input = Input::SystemClock;
        self.one_shot = true;
        self.pb_on = false;
        self.pb_toggle_mode = false;
        self.latch = 0xffff;
        self.counter = 0;
        self.pipeline.reset();
        self.pb_toggle = false;
        self.pb_pulse = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_timer(mode: Mode) -> Timer {
        let cnt_pin = new_shared(Pin::new_high());
        let mut timer = Timer::new(mode, cnt_pin);
        timer.reset();
        timer
    }

    #[test]
    fn latch_write_loads_stopped_timer() {
        let mut timer = setup_timer(Mode::TimerA);
        timer.set_latch_lo(0xab);
        timer.set_latch_hi(0xcd);
        assert_eq!(0x0000, timer.get_counter());
        timer.clock();
        timer.clock();
        assert_eq!(0xcdab, timer.get_counter());
    }

    #[test]
    fn one_shot_counts_down_once() {
        let mut timer = setup_timer(Mode::TimerA);
        timer.set_latch_lo(0x01);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        timer.set_config(0b_0000_1001);
        assert_eq!(false, timer.clock());
        assert_eq!(false, timer.clock());
        assert_eq!(true, timer.clock());
        // Counter reloaded from latch, timer stopped
        assert_eq!(0x01, timer.get_counter());
        assert_eq!(false, timer.clock());
        assert_eq!(0x01, timer.get_counter());
        assert_eq!(0x08, timer.get_config() & 0x09);
    }

    #[test]
    fn continuous_underflow_period() {
        let mut timer = setup_timer(Mode::TimerA);
        timer.set_latch_lo(0x02);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        timer.set_config(0b_0000_0001);
        let mut outputs = Vec::new();
        for _ in 0..9 {
            outputs.push(timer.clock());
        }
        assert_eq!(
            vec![false, false, false, true, false, false, true, false, false],
            outputs
        );
    }
}
