// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use log::LogLevel;

use crate::factory::{Chip, SidModel, SoundOutput};
use crate::util::{Clock, SharedCell};

// Design:
//   The chip keeps the register-level model and delegates sample synthesis
//   to resid, syncing it up to the system clock whenever a register is
//   touched. Registers $19/$1A read back the paddle positions selected on
//   the control ports; $1B/$1C expose voice 3 state for random numbers.

#[derive(Clone, Copy, PartialEq)]
pub enum SamplingMethod {
    Fast,
    Interpolate,
    Resample,
    ResampleFast,
}

pub mod reg {
    pub const POTX: u8 = 0x19;
    pub const POTY: u8 = 0x1a;
    pub const OSC3: u8 = 0x1b;
    pub const ENV3: u8 = 0x1c;
}

pub struct Sid {
    // Dependencies
    system_clock: Rc<Clock>,
    sound_buffer: Arc<dyn SoundOutput>,
    // Functional Units
    resid: resid::Sid,
    // Runtime State
    regs: [u8; 0x20],
    // Voice 3 readback registers sampled on every sync so the
    // side-effect free view stays live
    voice3_osc: u8,
    voice3_env: u8,
    buffer: [i16; 8192],
    cycles: u64,
    // I/O
    pot_x: SharedCell<u8>,
    pot_y: SharedCell<u8>,
}

impl Sid {
    pub fn new(
        chip_model: SidModel,
        system_clock: Rc<Clock>,
        pot_x: SharedCell<u8>,
        pot_y: SharedCell<u8>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> Self {
        info!(target: "sound", "Initializing SID");
        let resid_model = match chip_model {
            SidModel::Mos6581 => resid::ChipModel::Mos6581,
            SidModel::Mos8580 => resid::ChipModel::Mos8580,
        };
        let resid = resid::Sid::new(resid_model);
        Sid {
            system_clock,
            sound_buffer,
            resid,
            regs: [0; 0x20],
            voice3_osc: 0,
            voice3_env: 0,
            buffer: [0i16; 8192],
            cycles: 0,
            pot_x,
            pot_y,
        }
    }

    pub fn enable_filter(&mut self, enabled: bool) {
        self.resid.enable_filter(enabled);
    }

    pub fn set_sampling_parameters(
        &mut self,
        sampling_method: SamplingMethod,
        clock_freq: u32,
        sample_freq: u32,
    ) {
        let resid_sampling_method = match sampling_method {
            SamplingMethod::Fast => resid::SamplingMethod::Fast,
            SamplingMethod::Interpolate => resid::SamplingMethod::Interpolate,
            SamplingMethod::Resample => resid::SamplingMethod::Resample,
            SamplingMethod::ResampleFast => resid::SamplingMethod::ResampleFast,
        };
        self.resid
            .set_sampling_parameters(resid_sampling_method, clock_freq, sample_freq);
    }

    fn sync(&mut self) {
        if self.cycles != self.system_clock.get() {
            let delta = (self.system_clock.get() - self.cycles) as u32;
            self.clock_delta(delta);
        }
        self.voice3_osc = self.resid.read(reg::OSC3);
        self.voice3_env = self.resid.read(reg::ENV3);
    }
}

impl Chip for Sid {
    fn clock(&mut self) {
        self.resid.clock();
        self.cycles = self.cycles.wrapping_add(1);
    }

    fn clock_delta(&mut self, delta: u32) {
        if delta > 0 {
            let mut delta = delta;
            while delta > 0 {
                let (samples, next_delta) = self.resid.sample(delta, &mut self.buffer[..], 1);
                self.sound_buffer.write(&self.buffer[0..samples]);
                delta = next_delta;
            }
        }
        self.cycles = self.cycles.wrapping_add(u64::from(delta));
    }

    fn process_vsync(&mut self) {
        self.sync();
    }

    fn reset(&mut self) {
        self.resid.reset();
        self.regs = [0; 0x20];
        self.voice3_osc = 0;
        self.voice3_env = 0;
        self.cycles = self.system_clock.get();
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        self.sync();
        match reg {
            reg::POTX => self.pot_x.get(),
            reg::POTY => self.pot_y.get(),
            reg::OSC3 => self.voice3_osc,
            reg::ENV3 => self.voice3_env,
            _ => self.resid.read(reg),
        }
    }

    fn spy_read(&self, reg: u8) -> u8 {
        match reg {
            reg::POTX => self.pot_x.get(),
            reg::POTY => self.pot_y.get(),
            reg::OSC3 => self.voice3_osc,
            reg::ENV3 => self.voice3_env,
            _ => self.regs[reg as usize],
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "sid::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        self.sync();
        self.regs[reg as usize] = value;
        self.resid.write(reg, value)
    }
}
