// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Spec: The MOS 6567/6569 video controller (VIC-II) and its application
//       in the Commodore 64
// Design:
//   One call to clock() emulates a single raster cycle: the memory access
//   for this cycle (refresh, c-access, g-access, p-access or s-access),
//   the BA line for bad lines and sprite DMA, eight pixels of output and
//   the counter updates (VC/VCBASE/RC/VMLI, sprite MC/MCBASE). The CPU is
//   clocked after the VIC within the same system cycle, so a register
//   write becomes visible to the following cycle's fetch and draw.

use bit_field::BitField;
use log::LogLevel;

use crate::factory::{Chip, VicModel, VideoOutput};
use crate::util::{IrqLine, Pin, Ram, Shared, SharedCell};

use super::border_unit::BorderUnit;
use super::gfx_sequencer::{GfxSequencer, Mode};
use super::mux_unit::MuxUnit;
use super::spec::Spec;
use super::sprite_sequencer::{self, SpriteSequencer};
use super::vic_memory::VicMemory;

pub const IRQ_SOURCE_VIC: usize = 1;

mod irq {
    pub const RASTER: usize = 0;
    pub const MB_COLLISION: usize = 1;
    pub const MM_COLLISION: usize = 2;
    pub const LIGHTPEN: usize = 3;
}

pub struct Vic {
    // Configuration
    chip_model: VicModel,
    spec: Spec,
    // Dependencies
    color_ram: Shared<Ram>,
    mem: VicMemory,
    // Functional Units
    border_unit: BorderUnit,
    gfx_seq: GfxSequencer,
    mux_unit: MuxUnit,
    sprites: [SpriteSequencer; 8],
    // Control registers
    den: bool,
    raster_compare: u16,
    scroll_x: u16,
    scroll_y: u16,
    char_base: u16,
    video_matrix: u16,
    irq_data: u8,
    irq_mask: u8,
    // Counters
    raster_cycle: u16,
    raster_y: u16,
    vc_base: u16,
    vc: u16,
    rc: u8,
    vmli: usize,
    refresh_counter: u8,
    // Runtime state
    allow_bad_lines: bool,
    is_bad_line: bool,
    display_state: bool,
    raster_irq_fired: bool,
    lp_triggered: bool,
    lp_x: u8,
    lp_y: u8,
    grey_dot_pending: bool,
    hide_sprites: bool,
    video_matrix_line: [u8; 40],
    color_line: [u8; 40],
    frame_count: u64,
    // I/O
    ba_line: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    frame_buffer: Shared<dyn VideoOutput>,
    vsync_flag: SharedCell<bool>,
    data_bus: SharedCell<u8>,
}

impl Vic {
    #![cfg_attr(feature = "cargo-clippy", allow(clippy::too_many_arguments))]
    pub fn new(
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        mem: VicMemory,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        data_bus: SharedCell<u8>,
    ) -> Self {
        info!(target: "video", "Initializing VIC");
        let spec = Spec::new(chip_model);
        Vic {
            chip_model,
            spec,
            color_ram,
            mem,
            border_unit: BorderUnit::new(),
            gfx_seq: GfxSequencer::new(),
            mux_unit: MuxUnit::new(),
            sprites: [
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
            ],
            den: false,
            raster_compare: 0,
            scroll_x: 0,
            scroll_y: 3,
            char_base: 0x1000,
            video_matrix: 0x0400,
            irq_data: 0,
            irq_mask: 0,
            raster_cycle: 1,
            raster_y: 0x0100,
            vc_base: 0,
            vc: 0,
            rc: 0,
            vmli: 0,
            refresh_counter: 0xff,
            allow_bad_lines: false,
            is_bad_line: false,
            display_state: false,
            raster_irq_fired: false,
            lp_triggered: false,
            lp_x: 0,
            lp_y: 0,
            grey_dot_pending: false,
            hide_sprites: false,
            video_matrix_line: [0; 40],
            color_line: [0; 40],
            frame_count: 0,
            ba_line,
            irq_line,
            frame_buffer,
            vsync_flag,
            data_bus,
        }
    }

    pub fn get_chip_model(&self) -> VicModel {
        self.chip_model
    }

    pub fn get_raster_y(&self) -> u16 {
        self.raster_y
    }

    pub fn get_raster_cycle(&self) -> u16 {
        self.raster_cycle
    }

    pub fn get_frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn set_collision_checks(&mut self, mm: bool, mb: bool) {
        self.mux_unit.config.check_mm_collisions = mm;
        self.mux_unit.config.check_mb_collisions = mb;
    }

    /// Keep sprites out of the pixel mux while collisions stay live.
    pub fn set_hide_sprites(&mut self, hide: bool) {
        self.hide_sprites = hide;
    }

    /// Light pen pulse from control port 1.
    pub fn trigger_lp(&mut self) {
        if !self.lp_triggered {
            self.lp_triggered = true;
            self.lp_x = ((self.raster_cycle - 1) << 2) as u8;
            self.lp_y = self.raster_y as u8;
            self.set_irq_event(irq::LIGHTPEN);
        }
    }

    // -- Interrupts

    fn set_irq_event(&mut self, source: usize) {
        self.irq_data.set_bit(source, true);
        self.update_irq_line();
    }

    fn update_irq_line(&mut self) {
        let triggered = self.irq_data & self.irq_mask & 0x0f != 0;
        self.irq_data.set_bit(7, triggered);
        self.irq_line
            .borrow_mut()
            .set_low(IRQ_SOURCE_VIC, triggered);
    }

    // -- Bad lines

    fn update_bad_line(&mut self) {
        if self.raster_y == 0x30 && self.den {
            self.allow_bad_lines = true;
        }
        self.is_bad_line = self.allow_bad_lines
            && self.raster_y >= 0x30
            && self.raster_y <= 0xf7
            && (self.raster_y & 0x07) == self.scroll_y;
        if self.is_bad_line {
            self.display_state = true;
        }
    }

    // -- Sprite engine

    fn sprite_pointer_cycle(&self, n: usize) -> u16 {
        // Sprite 0 fetches five cycles before the end of the line; sprites
        // 3-7 fetch at the start of the following line.
        let n = n as u16;
        if n < 3 {
            self.spec.cycles_per_raster - 5 + 2 * n
        } else {
            2 * n - 5
        }
    }

    fn sprite_ba_active(&self) -> bool {
        let cpr = self.spec.cycles_per_raster;
        let cycle = self.raster_cycle;
        self.sprites.iter().enumerate().any(|(n, sprite)| {
            if !sprite.dma {
                return false;
            }
            let p = self.sprite_pointer_cycle(n);
            (p + cpr - cycle) % cpr <= 3 || (cycle + cpr - p) % cpr <= 1
        })
    }

    fn sprite_accesses(&mut self) {
        for n in 0..8 {
            let p_cycle = self.sprite_pointer_cycle(n);
            let s_cycle = p_cycle % self.spec.cycles_per_raster + 1;
            if self.raster_cycle == p_cycle {
                let pointer = self.read_vm(self.video_matrix | 0x03f8 | n as u16);
                self.sprites[n].pointer = pointer;
                if self.sprites[n].dma {
                    let mc = u16::from(self.sprites[n].mc);
                    let data = self.read_vm(u16::from(pointer) << 6 | mc);
                    self.sprites[n].set_data(0, data);
                    self.sprites[n].mc = self.sprites[n].mc.wrapping_add(1) & 0x3f;
                }
            } else if self.raster_cycle == s_cycle && self.sprites[n].dma {
                for byte in 1..3 {
                    let pointer = self.sprites[n].pointer;
                    let mc = u16::from(self.sprites[n].mc);
                    let data = self.read_vm(u16::from(pointer) << 6 | mc);
                    self.sprites[n].set_data(byte, data);
                    self.sprites[n].mc = self.sprites[n].mc.wrapping_add(1) & 0x3f;
                }
            }
        }
    }

    fn sprite_dma_on_check(&mut self) {
        let raster_y = self.raster_y;
        for sprite in self.sprites.iter_mut() {
            if sprite.config.enabled
                && u16::from(sprite.config.y) == (raster_y & 0xff)
                && !sprite.dma
            {
                sprite.dma = true;
                sprite.mc_base = 0;
                if sprite.config.expand_y {
                    sprite.expansion_ff = false;
                }
            }
        }
    }

    // -- Memory accesses

    fn read_vm(&self, address: u16) -> u8 {
        let value = self.mem.read(address);
        self.data_bus.set(value);
        value
    }

    fn c_access(&mut self) {
        if self.is_bad_line && self.vmli < 40 {
            let address = self.video_matrix | self.vc;
            self.video_matrix_line[self.vmli] = self.read_vm(address);
            self.color_line[self.vmli] = self.color_ram.borrow().read(self.vc) & 0x0f;
        }
    }

    fn g_access(&mut self) {
        if self.display_state {
            let vmli = if self.vmli < 40 { self.vmli } else { 39 };
            let c_data = self.video_matrix_line[vmli];
            let c_color = self.color_line[vmli];
            let address = match self.gfx_seq.config.mode {
                Mode::Text | Mode::McText => {
                    self.char_base | (u16::from(c_data) << 3) | u16::from(self.rc)
                }
                Mode::EcmText | Mode::InvalidText => {
                    (self.char_base | (u16::from(c_data) << 3) | u16::from(self.rc)) & 0xf9ff
                }
                Mode::Bitmap | Mode::McBitmap => {
                    (self.char_base & 0x2000) | (self.vc << 3) | u16::from(self.rc)
                }
                Mode::InvalidBitmap1 | Mode::InvalidBitmap2 => {
                    ((self.char_base & 0x2000) | (self.vc << 3) | u16::from(self.rc)) & 0xf9ff
                }
            };
            let g_data = self.read_vm(address);
            self.gfx_seq.set_data(c_data, c_color, g_data);
            self.vc = (self.vc + 1) & 0x03ff;
            self.vmli = (self.vmli + 1) & 0x3f;
        } else {
            // Idle state reads from $3FFF ($39FF with ECM set)
            let address = match self.gfx_seq.config.mode {
                Mode::EcmText | Mode::InvalidText | Mode::InvalidBitmap2 => 0x39ff,
                _ => 0x3fff,
            };
            let g_data = self.read_vm(address);
            self.gfx_seq.set_data(0, 0, g_data);
        }
    }

    fn refresh_access(&mut self) {
        let address = 0x3f00 | u16::from(self.refresh_counter);
        let _ = self.read_vm(address);
        self.refresh_counter = self.refresh_counter.wrapping_sub(1);
    }

    // -- Drawing

    fn draw_cycle(&mut self) {
        let y = self.raster_y;
        let x_start = (self.raster_cycle - 1) << 3;
        let in_display = self.raster_cycle >= 16 && self.raster_cycle <= 55;
        let (width, height) = self.frame_buffer.borrow().get_dimension();
        let mut sprite_output = [None; 8];
        for i in 0..8u16 {
            let x = x_start + i;
            self.border_unit.update_main_ff(x, y, self.den);
            if in_display && i == self.scroll_x {
                self.gfx_seq.load_data();
            }
            self.gfx_seq.clock();
            let gfx_output = if !self.border_unit.is_vertical() {
                self.gfx_seq.output()
            } else {
                (self.gfx_seq.config.bg_color[0], false)
            };
            self.mux_unit.feed_graphics(gfx_output);
            for (n, sprite) in self.sprites.iter_mut().enumerate() {
                sprite.clock(x);
                sprite_output[n] = sprite.output();
            }
            self.mux_unit.compute_collisions(&sprite_output);
            if !self.hide_sprites {
                self.mux_unit.feed_sprites(&sprite_output);
            }
            if self.border_unit.is_enabled() {
                self.mux_unit
                    .feed_border(self.border_unit.config.border_color);
            }
            let mut pixel = self.mux_unit.output();
            if self.grey_dot_pending {
                // HMOS revisions emit one light grey pixel when a color
                // register changes
                self.grey_dot_pending = false;
                pixel = 0x0f;
            }
            if (x as usize) < width && (y as usize) < height {
                let index = y as usize * width + x as usize;
                self.frame_buffer.borrow_mut().write(index, pixel);
            }
            if self.mux_unit.mb_interrupt {
                self.mux_unit.mb_interrupt = false;
                self.set_irq_event(irq::MB_COLLISION);
            }
            if self.mux_unit.mm_interrupt {
                self.mux_unit.mm_interrupt = false;
                self.set_irq_event(irq::MM_COLLISION);
            }
        }
    }

    fn update_ba(&mut self) {
        let bad_line_ba =
            self.is_bad_line && self.raster_cycle >= 12 && self.raster_cycle <= 54;
        let active = !(bad_line_ba || self.sprite_ba_active());
        self.ba_line.borrow_mut().set_active(active);
    }

    fn begin_frame(&mut self) {
        self.raster_y = 0;
        self.vc_base = 0;
        self.allow_bad_lines = false;
        self.lp_triggered = false;
        self.frame_count = self.frame_count.wrapping_add(1);
        self.vsync_flag.set(true);
    }
}

impl Chip for Vic {
    fn clock(&mut self) {
        self.update_bad_line();

        // Raster compare fires in cycle 1, or cycle 2 on line 0
        let irq_cycle = if self.raster_y == 0 { 2 } else { 1 };
        if self.raster_cycle == irq_cycle && !self.raster_irq_fired {
            if self.raster_y == self.raster_compare {
                self.raster_irq_fired = true;
                self.set_irq_event(irq::RASTER);
            }
        }

        // Memory access for this cycle
        match self.raster_cycle {
            11..=15 => {
                self.refresh_access();
                if self.raster_cycle == 14 {
                    self.vc = self.vc_base;
                    self.vmli = 0;
                    if self.is_bad_line {
                        self.rc = 0;
                    }
                }
                if self.raster_cycle == 15 {
                    for sprite in self.sprites.iter_mut() {
                        if sprite.expansion_ff {
                            sprite.mc_base = (sprite.mc_base + 2) & 0x3f;
                        }
                    }
                    self.c_access();
                }
            }
            16 => {
                for sprite in self.sprites.iter_mut() {
                    if sprite.expansion_ff {
                        sprite.mc_base = (sprite.mc_base + 1) & 0x3f;
                    }
                    if sprite.mc_base == 63 {
                        sprite.dma = false;
                    }
                }
                self.g_access();
                self.c_access();
            }
            17..=54 => {
                self.g_access();
                self.c_access();
            }
            55 => {
                for sprite in self.sprites.iter_mut() {
                    if sprite.config.expand_y {
                        sprite.expansion_ff = !sprite.expansion_ff;
                    }
                }
                self.sprite_dma_on_check();
                self.g_access();
            }
            56 => {
                self.sprite_dma_on_check();
            }
            58 => {
                if self.rc == 7 {
                    self.vc_base = self.vc;
                    if !self.is_bad_line {
                        self.display_state = false;
                    }
                }
                if self.display_state {
                    self.rc = (self.rc + 1) & 0x07;
                }
                let raster_y = self.raster_y;
                for sprite in self.sprites.iter_mut() {
                    sprite.mc = sprite.mc_base;
                    if sprite.dma {
                        if sprite.config.enabled
                            && u16::from(sprite.config.y) == (raster_y & 0xff)
                        {
                            sprite.display = true;
                        }
                    } else {
                        sprite.display = false;
                    }
                }
            }
            _ => {}
        }
        self.sprite_accesses();

        self.update_ba();
        self.draw_cycle();

        // Advance
        self.raster_cycle += 1;
        if self.raster_cycle > self.spec.cycles_per_raster {
            self.raster_cycle = 1;
            self.border_unit.update_vertical_ff(self.raster_y, self.den);
            self.raster_y += 1;
            self.raster_irq_fired = false;
            if self.raster_y >= self.spec.raster_lines {
                self.begin_frame();
            }
        }
    }

    fn clock_delta(&mut self, delta: u32) {
        for _i in 0..delta {
            self.clock();
        }
    }

    fn process_vsync(&mut self) {}

    fn reset(&mut self) {
        self.border_unit.reset();
        self.gfx_seq.reset();
        self.mux_unit.reset();
        for sprite in self.sprites.iter_mut() {
            sprite.reset();
        }
        self.den = false;
        self.raster_compare = 0;
        self.scroll_x = 0;
        self.scroll_y = 3;
        self.char_base = 0x1000;
        self.video_matrix = 0x0400;
        self.irq_data = 0;
        self.irq_mask = 0;
        self.raster_cycle = 1;
        self.raster_y = 0x0100;
        self.vc_base = 0;
        self.vc = 0;
        self.rc = 0;
        self.vmli = 0;
        self.refresh_counter = 0xff;
        self.allow_bad_lines = false;
        self.is_bad_line = false;
        self.display_state = false;
        self.raster_irq_fired = false;
        self.lp_triggered = false;
        self.lp_x = 0;
        self.lp_y = 0;
        self.grey_dot_pending = false;
        self.video_matrix_line = [0; 40];
        self.color_line = [0; 40];
        self.ba_line.borrow_mut().set_active(true);
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        let value = match reg {
            0x1e => {
                // Sprite-sprite collisions clear on read
                let result = self.mux_unit.mm_collision;
                self.mux_unit.mm_collision = 0;
                result
            }
            0x1f => {
                // Sprite-background collisions clear on read
                let result = self.mux_unit.mb_collision;
                self.mux_unit.mb_collision = 0;
                result
            }
            _ => self.spy_read(reg),
        };
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "vic::reg", "Read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    fn spy_read(&self, reg: u8) -> u8 {
        match reg {
            0x00 | 0x02 | 0x04 | 0x06 | 0x08 | 0x0a | 0x0c | 0x0e => {
                (self.sprites[(reg >> 1) as usize].config.x & 0xff) as u8
            }
            0x01 | 0x03 | 0x05 | 0x07 | 0x09 | 0x0b | 0x0d | 0x0f => {
                self.sprites[(reg >> 1) as usize].config.y
            }
            0x10 => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value.set_bit(i, sprite.config.x.get_bit(8));
                }
                value
            }
            0x11 => {
                let mode = self.gfx_seq.config.mode.value();
                let mut value = (self.scroll_y & 0x07) as u8;
                value.set_bit(3, self.border_unit.config.rsel);
                value.set_bit(4, self.den);
                value.set_bit(5, mode.get_bit(1));
                value.set_bit(6, mode.get_bit(2));
                value.set_bit(7, self.raster_y.get_bit(8));
                value
            }
            0x12 => (self.raster_y & 0xff) as u8,
            0x13 => self.lp_x,
            0x14 => self.lp_y,
            0x15 => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value.set_bit(i, sprite.config.enabled);
                }
                value
            }
            0x16 => {
                let mode = self.gfx_seq.config.mode.value();
                let mut value = (self.scroll_x & 0x07) as u8;
                value.set_bit(3, self.border_unit.config.csel);
                value.set_bit(4, mode.get_bit(0));
                value | 0xc0
            }
            0x17 => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value.set_bit(i, sprite.config.expand_y);
                }
                value
            }
            0x18 => {
                let vm = ((self.video_matrix >> 10) as u8) << 4;
                let cb = ((self.char_base >> 11) as u8) << 1;
                vm | cb | 0x01
            }
            0x19 => self.irq_data | 0x70,
            0x1a => self.irq_mask | 0xf0,
            0x1b => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value.set_bit(i, sprite.config.data_priority);
                }
                value
            }
            0x1c => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value.set_bit(i, sprite.config.mode == sprite_sequencer::Mode::Multicolor);
                }
                value
            }
            0x1d => {
                let mut value = 0;
                for (i, sprite) in self.sprites.iter().enumerate() {
                    value.set_bit(i, sprite.config.expand_x);
                }
                value
            }
            0x1e => self.mux_unit.mm_collision,
            0x1f => self.mux_unit.mb_collision,
            0x20 => self.border_unit.config.border_color | 0xf0,
            0x21..=0x24 => self.gfx_seq.config.bg_color[(reg - 0x21) as usize] | 0xf0,
            0x25 | 0x26 => self.sprites[0].config.multicolor[(reg - 0x25) as usize] | 0xf0,
            0x27..=0x2e => self.sprites[(reg - 0x27) as usize].config.color | 0xf0,
            0x2f..=0x3f => 0xff,
            _ => panic!("invalid reg {}", reg),
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "vic::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg {
            0x00 | 0x02 | 0x04 | 0x06 | 0x08 | 0x0a | 0x0c | 0x0e => {
                let sprite = &mut self.sprites[(reg >> 1) as usize];
                sprite.config.x = (sprite.config.x & 0x0100) | u16::from(value);
                sprite.config.x_screen = BorderUnit::map_sprite_to_screen(sprite.config.x);
            }
            0x01 | 0x03 | 0x05 | 0x07 | 0x09 | 0x0b | 0x0d | 0x0f => {
                self.sprites[(reg >> 1) as usize].config.y = value;
            }
            0x10 => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.x.set_bit(8, value.get_bit(i));
                    sprite.config.x_screen =
                        BorderUnit::map_sprite_to_screen(sprite.config.x & 0x01ff);
                }
            }
            0x11 => {
                self.scroll_y = u16::from(value & 0x07);
                self.border_unit.config.rsel = value.get_bit(3);
                self.den = value.get_bit(4);
                let mut mode = self.gfx_seq.config.mode.value();
                mode.set_bit(1, value.get_bit(5));
                mode.set_bit(2, value.get_bit(6));
                self.gfx_seq.config.mode = Mode::from(mode);
                self.raster_compare.set_bit(8, value.get_bit(7));
                self.check_raster_compare();
            }
            0x12 => {
                self.raster_compare = (self.raster_compare & 0x0100) | u16::from(value);
                self.check_raster_compare();
            }
            0x13 | 0x14 => {
                // Light pen latches are read only
            }
            0x15 => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.enabled = value.get_bit(i);
                }
            }
            0x16 => {
                self.scroll_x = u16::from(value & 0x07);
                self.border_unit.config.csel = value.get_bit(3);
                let mut mode = self.gfx_seq.config.mode.value();
                mode.set_bit(0, value.get_bit(4));
                self.gfx_seq.config.mode = Mode::from(mode);
            }
            0x17 => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.expand_y = value.get_bit(i);
                    if !sprite.config.expand_y {
                        sprite.expansion_ff = true;
                    }
                }
            }
            0x18 => {
                self.video_matrix = u16::from(value & 0xf0) << 6;
                self.char_base = u16::from(value & 0x0e) << 10;
            }
            0x19 => {
                // Writing 1 acknowledges an interrupt source
                self.irq_data &= !(value & 0x0f);
                self.update_irq_line();
            }
            0x1a => {
                self.irq_mask = value & 0x0f;
                self.update_irq_line();
            }
            0x1b => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.data_priority = value.get_bit(i);
                    self.mux_unit.config.data_priority[i] = value.get_bit(i);
                }
            }
            0x1c => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.mode = if value.get_bit(i) {
                        sprite_sequencer::Mode::Multicolor
                    } else {
                        sprite_sequencer::Mode::Standard
                    };
                }
            }
            0x1d => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.expand_x = value.get_bit(i);
                }
            }
            0x1e | 0x1f => {
                // Collision registers are read only
            }
            0x20 => {
                self.border_unit.config.border_color = value & 0x0f;
                self.grey_dot_pending = self.chip_model.has_grey_dot_bug();
            }
            0x21..=0x24 => {
                self.gfx_seq.config.bg_color[(reg - 0x21) as usize] = value & 0x0f;
                self.grey_dot_pending = self.chip_model.has_grey_dot_bug();
            }
            0x25 | 0x26 => {
                for sprite in self.sprites.iter_mut() {
                    sprite.config.multicolor[(reg - 0x25) as usize] = value & 0x0f;
                }
            }
            0x27..=0x2e => self.sprites[(reg - 0x27) as usize].config.color = value & 0x0f,
            0x2f..=0x3f => {}
            _ => panic!("invalid reg {}", reg),
        }
    }
}

impl Vic {
    fn check_raster_compare(&mut self) {
        // Changing the compare value to the current line raises the
        // interrupt immediately, once per line
        if self.raster_y == self.raster_compare && !self.raster_irq_fired {
            self.raster_irq_fired = true;
            self.set_irq_event(irq::RASTER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::VicModel;
    use crate::util::{new_shared, new_shared_cell, Rom};

    struct NullVideo;

    impl VideoOutput for NullVideo {
        fn get_dimension(&self) -> (usize, usize) {
            (504, 312)
        }
        fn reset(&mut self) {}
        fn write(&mut self, _index: usize, _color: u8) {}
    }

    fn setup_vic() -> (Vic, Shared<Pin>, Shared<IrqLine>) {
        let ba_line = new_shared(Pin::new_high());
        let irq_line = new_shared(IrqLine::new("irq"));
        let ram = new_shared(Ram::new(0x10000));
        let color_ram = new_shared(Ram::new(1024));
        let charset = new_shared(Rom::new(vec![0; 0x1000], 0));
        let mem = VicMemory::new(
            new_shared_cell(0u16),
            charset,
            ram,
            new_shared_cell(false),
        );
        let mut vic = Vic::new(
            VicModel::Mos6569,
            color_ram,
            mem,
            new_shared(NullVideo {}),
            new_shared_cell(false),
            ba_line.clone(),
            irq_line.clone(),
            new_shared_cell(0u8),
        );
        vic.reset();
        (vic, ba_line, irq_line)
    }

    fn run_to_line(vic: &mut Vic, line: u16) {
        while vic.get_raster_y() != line || vic.get_raster_cycle() != 1 {
            vic.clock();
        }
    }

    #[test]
    fn d011_reads_back_low_seven_bits() {
        let (mut vic, _ba, _irq) = setup_vic();
        run_to_line(&mut vic, 0x40);
        vic.write(0x11, 0xff);
        assert_eq!(0x7f, vic.read(0x11));
    }

    #[test]
    fn raster_wraps_to_zero() {
        let (mut vic, _ba, _irq) = setup_vic();
        run_to_line(&mut vic, 311);
        for _ in 0..63 {
            vic.clock();
        }
        assert_eq!(0, vic.get_raster_y());
    }

    #[test]
    fn bad_line_asserts_ba() {
        let (mut vic, ba_line, _irq) = setup_vic();
        // DEN on with yscroll 3: line 0x33 is the first matching bad line
        vic.write(0x11, 0x1b);
        run_to_line(&mut vic, 0x33);
        // BA drops in cycle 12
        for _ in 0..12 {
            vic.clock();
        }
        assert_eq!(true, ba_line.borrow().is_low());
        // BA released after cycle 54
        while vic.get_raster_cycle() != 56 {
            vic.clock();
        }
        assert_eq!(false, ba_line.borrow().is_low());
    }

    #[test]
    fn ba_stays_high_without_bad_lines() {
        let (mut vic, ba_line, _irq) = setup_vic();
        // DEN off: no bad lines, no sprites
        run_to_line(&mut vic, 0x35);
        for _ in 0..63 {
            vic.clock();
            assert_eq!(true, ba_line.borrow().is_high());
        }
    }

    #[test]
    fn raster_irq_fires_on_compare() {
        let (mut vic, _ba, irq_line) = setup_vic();
        vic.write(0x1a, 0x01);
        vic.write(0x12, 0x42);
        run_to_line(&mut vic, 0x42);
        vic.clock();
        assert_eq!(true, irq_line.borrow().is_low());
        assert_eq!(0x81 | 0x70, vic.read(0x19));
        // Acknowledge
        vic.write(0x19, 0x01);
        assert_eq!(false, irq_line.borrow().is_low());
    }

    #[test]
    fn sprite_dma_turns_on_at_y_match() {
        let (mut vic, _ba, _irq) = setup_vic();
        vic.write(0x15, 0x01); // enable sprite 0
        vic.write(0x01, 100); // sprite 0 y
        run_to_line(&mut vic, 100);
        assert_eq!(false, vic.sprites[0].dma);
        // DMA check happens at cycle 55
        while vic.get_raster_cycle() != 57 {
            vic.clock();
        }
        assert_eq!(true, vic.sprites[0].dma);
    }

    #[test]
    fn sprite_dma_turns_off_after_data_consumed() {
        let (mut vic, _ba, _irq) = setup_vic();
        vic.write(0x15, 0x01);
        vic.write(0x01, 100);
        run_to_line(&mut vic, 122);
        // 21 lines of 3 bytes each exhausts the sprite
        assert_eq!(false, vic.sprites[0].dma);
    }
}
