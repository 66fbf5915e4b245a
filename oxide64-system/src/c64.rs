// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use oxide64_core::device::{Cartridge, ControlPort, ExpansionPort, Keyboard};
use oxide64_core::drive::{Disk, Drive, DriveEvent};
use oxide64_core::factory::*;
use oxide64_core::iec::IecBus;
use oxide64_core::mem::{Memory, Pla};
use oxide64_core::util::*;

use super::breakpoint::{BreakpointManager, WatchpointManager};
use super::{Config, Error, GlueLogic, RomKind, SystemEvent};

// Design:
//   C64 represents the machine itself and all of its components, wired as
//   a dependency graph of shared I/O state. One system cycle clocks the
//   VIC first (phase 1, including its memory access and the BA line), then
//   the CIAs and the expansion port, then the CPU (phase 2), and finally
//   converges the drives which run on their own clock. The IEC lines are
//   resolved at the cycle boundary, so each side observes the other side's
//   changes one cycle later.

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
    DriveRom = 0xc000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub struct C64 {
    // Dependencies
    config: Rc<Config>,
    // Chipset
    cpu: Box<dyn Cpu>,
    cia_1: Shared<dyn Chip>,
    cia_2: Shared<dyn Chip>,
    sid: Shared<dyn Chip>,
    vic: Shared<dyn Chip>,
    // Memory
    color_ram: Shared<Ram>,
    expansion_port: Shared<ExpansionPort>,
    mem: Shared<Memory>,
    ram: Shared<Ram>,
    basic_rom: Shared<Rom>,
    charset_rom: Shared<Rom>,
    kernal_rom: Shared<Rom>,
    drive_rom: Shared<Rom>,
    // Peripherals
    control_port_1: ControlPort,
    control_port_2: ControlPort,
    drives: Vec<Shared<Drive>>,
    iec_bus: Shared<IecBus>,
    keyboard: Keyboard,
    // Buffers
    frame_buffer: Shared<dyn VideoOutput>,
    sound_buffer: Arc<dyn SoundOutput>,
    // I/O lines observed at cycle boundaries
    cia_2_port_a: Shared<IoPort>,
    nmi_line: Shared<IrqLine>,
    vic_base_address: SharedCell<u16>,
    pending_vic_base: SharedCell<u16>,
    glue_discrete: bool,
    last_cia_2_pa: u8,
    last_drive_pb: [u8; 2],
    last_nmi: bool,
    // Runtime State
    breakpoints: BreakpointManager,
    watchpoints: WatchpointManager,
    clock: Rc<Clock>,
    cycle_duration: u64,
    events: Shared<VecDeque<SystemEvent>>,
    frame_count: u32,
    raster_hook: Option<u16>,
    raster_hook_armed: bool,
    suspend_depth: u32,
    vsync_flag: SharedCell<bool>,
    warp_mode: bool,
}

impl C64 {
    pub fn build(
        config: Rc<Config>,
        factory: &dyn ChipFactory,
        frame_buffer: Shared<dyn VideoOutput>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> C64 {
        info!(target: "c64", "Initializing system");
        // Buffers
        let clock = Rc::new(Clock::default());
        let joystick_1_state = new_shared_cell(0u8);
        let joystick_2_state = new_shared_cell(0u8);
        let pot_x = new_shared_cell(0xffu8);
        let pot_y = new_shared_cell(0xffu8);
        let keyboard_matrix = new_shared([0xff; 16]);
        let vsync_flag = new_shared_cell(false);
        let vic_base_address = new_shared_cell(0u16);
        let ultimax = new_shared_cell(false);
        let vic_data_bus = new_shared_cell(0u8);

        // I/O Lines
        let ba_line = new_shared(Pin::new_high());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_flag_pin = new_shared(Pin::new_low());
        let cia_1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_flag_pin = new_shared(Pin::new_low());
        let cia_2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_port_b = new_shared(IoPort::new(0x00, 0xff));
        let exp_io_line = new_shared(IoPort::new(0xff, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));

        // Memory
        let color_ram = factory.new_ram(config.model.color_ram);
        let ram = factory.new_ram(config.model.memory_size);
        let basic_rom = factory.new_rom(config.roms.basic.as_slice(), BaseAddr::Basic.addr());
        let charset_rom = factory.new_rom(config.roms.charset.as_slice(), 0);
        let kernal_rom = factory.new_rom(config.roms.kernal.as_slice(), BaseAddr::Kernal.addr());
        let drive_rom = factory.new_rom(config.roms.vc1541.as_slice(), BaseAddr::DriveRom.addr());

        // Chipset
        let cia_1 = factory.new_cia_1(
            joystick_1_state.clone(),
            joystick_2_state.clone(),
            keyboard_matrix.clone(),
            cia_1_port_a.clone(),
            cia_1_port_b.clone(),
            cia_1_flag_pin.clone(),
            irq_line.clone(),
        );
        let cia_2 = factory.new_cia_2(
            cia_2_port_a.clone(),
            cia_2_port_b.clone(),
            cia_2_flag_pin.clone(),
            nmi_line.clone(),
        );
        let sid = factory.new_sid(
            config.model.sid_model,
            clock.clone(),
            pot_x.clone(),
            pot_y.clone(),
            sound_buffer.clone(),
        );
        let vic = factory.new_vic(
            config.model.vic_model,
            color_ram.clone(),
            ram.clone(),
            charset_rom.clone(),
            vic_base_address.clone(),
            ultimax.clone(),
            frame_buffer.clone(),
            vsync_flag.clone(),
            ba_line.clone(),
            irq_line.clone(),
            vic_data_bus.clone(),
        );

        // Memory Controller and Processor
        let expansion_port = new_shared(ExpansionPort::new(exp_io_line.clone(), ultimax));
        let mmu = new_shared(Pla::new());
        let mem = factory.new_memory(
            mmu.clone(),
            cpu_io_port.clone(),
            cia_1.clone(),
            cia_2.clone(),
            color_ram.clone(),
            expansion_port.clone(),
            ram.clone(),
            basic_rom.clone(),
            charset_rom.clone(),
            kernal_rom.clone(),
            sid.clone(),
            vic.clone(),
            vic_data_bus,
        );
        let mem_dyn: Shared<dyn Addressable> = mem.clone();
        let cpu = factory.new_cpu(mem_dyn, ba_line, irq_line, nmi_line.clone());

        // Peripherals
        let keyboard = Keyboard::new(keyboard_matrix, nmi_line.clone());
        let control_port_1 = ControlPort::new(joystick_1_state, pot_x.clone(), pot_y.clone());
        let control_port_2 = ControlPort::new(joystick_2_state, pot_x, pot_y);
        let iec_bus = new_shared(IecBus::new(cia_2_port_a.clone()));
        let mut drives = Vec::new();
        for (index, drive_config) in config.drives.iter().enumerate() {
            let mut drive = Drive::new(8 + index as u8);
            drive.set_connected(drive_config.connected);
            drive.set_switched_on(drive_config.switched_on);
            drive.set_clock_frequency(config.model.cpu_freq);
            drive.set_rom(drive_rom.clone());
            iec_bus.borrow_mut().connect_drive(drive.get_via1_port_b());
            drives.push(new_shared(drive));
        }

        // Observers
        let exp_io_line_clone_1 = exp_io_line.clone();
        let mmu_clone_1 = mmu.clone();
        cpu_io_port
            .borrow_mut()
            .set_observer(Box::new(move |cpu_port| {
                let expansion_port_io = exp_io_line_clone_1.borrow().get_value();
                let mode = cpu_port & 0x07 | expansion_port_io & 0x18;
                mmu_clone_1.borrow_mut().switch_banks(mode);
            }));

        let cpu_io_port_clone_2 = cpu_io_port.clone();
        let mmu_clone_2 = mmu.clone();
        exp_io_line
            .borrow_mut()
            .set_observer(Box::new(move |expansion_port_io| {
                let cpu_port_io = cpu_io_port_clone_2.borrow().get_value();
                let mode = cpu_port_io & 0x07 | expansion_port_io & 0x18;
                mmu_clone_2.borrow_mut().switch_banks(mode);
            }));

        // With discrete glue logic the VIC bank switch lands on the next
        // cycle boundary; the custom IC applies it right away
        let glue_discrete = config.glue_logic == GlueLogic::Discrete;
        let pending_vic_base = new_shared_cell(0u16);
        let pending_vic_base_clone = pending_vic_base.clone();
        let vic_base_address_clone = vic_base_address.clone();
        cia_2_port_a
            .borrow_mut()
            .set_observer(Box::new(move |value| {
                let base_address = u16::from(!value & 0x03) << 14;
                pending_vic_base_clone.set(base_address);
                if !glue_discrete {
                    vic_base_address_clone.set(base_address);
                }
            }));

        let cycle_duration = 10_000_000_000 / u64::from(config.model.cpu_freq);
        C64 {
            config,
            cpu,
            cia_1,
            cia_2,
            sid,
            vic,
            color_ram,
            expansion_port,
            mem,
            ram,
            basic_rom,
            charset_rom,
            kernal_rom,
            drive_rom,
            control_port_1,
            control_port_2,
            drives,
            iec_bus,
            keyboard,
            frame_buffer,
            sound_buffer,
            cia_2_port_a,
            nmi_line,
            vic_base_address,
            pending_vic_base,
            glue_discrete,
            last_cia_2_pa: 0,
            last_drive_pb: [0xff; 2],
            last_nmi: false,
            breakpoints: BreakpointManager::default(),
            watchpoints: WatchpointManager::default(),
            clock,
            cycle_duration,
            events: new_shared(VecDeque::new()),
            frame_count: 0,
            raster_hook: None,
            raster_hook_armed: false,
            suspend_depth: 0,
            vsync_flag,
            warp_mode: false,
        }
    }

    // -- Accessors

    pub fn get_bpm(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    pub fn get_bpm_mut(&mut self) -> &mut BreakpointManager {
        &mut self.breakpoints
    }

    pub fn get_wpm(&self) -> &WatchpointManager {
        &self.watchpoints
    }

    pub fn get_wpm_mut(&mut self) -> &mut WatchpointManager {
        &mut self.watchpoints
    }

    pub fn get_clock(&self) -> Rc<Clock> {
        self.clock.clone()
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_control_port_1(&mut self) -> &mut ControlPort {
        &mut self.control_port_1
    }

    pub fn get_control_port_2(&mut self) -> &mut ControlPort {
        &mut self.control_port_2
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &*self.cpu
    }

    pub fn get_cpu_mut(&mut self) -> &mut dyn Cpu {
        &mut *self.cpu
    }

    pub fn get_cia_1(&self) -> Shared<dyn Chip> {
        self.cia_1.clone()
    }

    pub fn get_cia_2(&self) -> Shared<dyn Chip> {
        self.cia_2.clone()
    }

    pub fn get_cycles(&self) -> u64 {
        self.clock.get()
    }

    pub fn get_drive(&self, drive_no: u8) -> Option<Shared<Drive>> {
        self.drives.get(drive_no as usize).cloned()
    }

    pub fn get_frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn get_iec_bus(&self) -> Shared<IecBus> {
        self.iec_bus.clone()
    }

    pub fn get_keyboard(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn get_sid(&self) -> Shared<dyn Chip> {
        self.sid.clone()
    }

    pub fn get_vic(&self) -> Shared<dyn Chip> {
        self.vic.clone()
    }

    pub fn get_vsync(&self) -> bool {
        self.vsync_flag.get()
    }

    pub fn is_cpu_jam(&self) -> bool {
        self.cpu.is_cpu_jam()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend_depth > 0
    }

    pub fn is_warp(&self) -> bool {
        self.warp_mode
    }

    pub fn reset_vsync(&self) {
        self.vsync_flag.set(false)
    }

    // -- Host Control

    /// Suspend dispatch. Calls nest; the host may inspect or mutate chip
    /// state freely while the depth is non-zero.
    pub fn suspend(&mut self) {
        self.suspend_depth += 1;
    }

    pub fn resume(&mut self) {
        if self.suspend_depth > 0 {
            self.suspend_depth -= 1;
        }
    }

    pub fn set_warp(&mut self, warp: bool) {
        if self.warp_mode != warp {
            self.warp_mode = warp;
            self.post_event(SystemEvent::WarpChanged(warp));
        }
    }

    /// Post an event when the raster reaches the given line.
    pub fn set_raster_notification(&mut self, line: Option<u16>) {
        self.raster_hook = line;
        self.raster_hook_armed = line.is_some();
    }

    pub fn poll_event(&mut self) -> Option<SystemEvent> {
        self.events.borrow_mut().pop_front()
    }

    fn post_event(&self, event: SystemEvent) {
        self.events.borrow_mut().push_back(event);
    }

    // -- Memory Ops

    pub fn load(&mut self, data: &[u8], offset: u16) {
        let mut mem = self.ram.borrow_mut();
        let mut address = offset;
        for byte in data {
            mem.write(address, *byte);
            address = address.wrapping_add(1);
        }
    }

    /// Read through the memory map with full side effects.
    pub fn peek(&self, address: u16) -> u8 {
        self.cpu.read(address)
    }

    /// Read through the memory map with no side effects, for debugger use.
    pub fn spy_peek(&self, address: u16) -> u8 {
        self.mem.borrow().spy_read(address)
    }

    pub fn poke(&mut self, address: u16, value: u8) {
        self.cpu.write(address, value);
    }

    pub fn load_rom(&mut self, kind: RomKind, data: &[u8]) -> Result<(), Error> {
        if data.len() != kind.size() {
            return Err(Error::Config(format!(
                "invalid {:?} rom size {}, expected {}",
                kind,
                data.len(),
                kind.size()
            )));
        }
        match kind {
            RomKind::Basic => {
                *self.basic_rom.borrow_mut() = Rom::new(data.to_vec(), BaseAddr::Basic.addr());
            }
            RomKind::Charset => {
                *self.charset_rom.borrow_mut() = Rom::new(data.to_vec(), 0);
            }
            RomKind::Kernal => {
                *self.kernal_rom.borrow_mut() = Rom::new(data.to_vec(), BaseAddr::Kernal.addr());
            }
            RomKind::Vc1541 => {
                *self.drive_rom.borrow_mut() = Rom::new(data.to_vec(), BaseAddr::DriveRom.addr());
            }
        }
        Ok(())
    }

    // -- Peripheral Ops

    pub fn attach_cartridge(&mut self, mut cartridge: Cartridge) {
        let events = self.events.clone();
        cartridge.set_led_observer(Some(Box::new(move |on| {
            events.borrow_mut().push_back(SystemEvent::CartridgeLed(on));
        })));
        self.expansion_port.borrow_mut().attach(cartridge);
        self.expansion_port.borrow_mut().reset();
    }

    pub fn detach_cartridge(&mut self) {
        self.expansion_port.borrow_mut().detach();
        self.reset(false);
    }

    pub fn insert_disk(&mut self, drive_no: u8, disk: Disk) -> Result<(), Error> {
        let drive = self
            .drives
            .get(drive_no as usize)
            .ok_or_else(|| Error::Config(format!("invalid drive {}", drive_no)))?;
        if !drive.borrow().is_connected() {
            return Err(Error::Config(format!("drive {} not connected", drive_no)));
        }
        drive.borrow_mut().insert_disk(disk);
        Ok(())
    }

    pub fn eject_disk(&mut self, drive_no: u8) -> Result<(), Error> {
        let drive = self
            .drives
            .get(drive_no as usize)
            .ok_or_else(|| Error::Config(format!("invalid drive {}", drive_no)))?;
        drive.borrow_mut().eject_disk();
        Ok(())
    }

    // -- Execution

    pub fn reset(&mut self, hard: bool) {
        info!(target: "c64", "Resetting system");
        self.clock.reset();
        // Memory
        if hard {
            let period = self.config.ram_init_pattern.period();
            self.ram.borrow_mut().fill_banded(period);
            for i in 0..self.config.model.color_ram as u16 {
                self.color_ram.borrow_mut().write(i, 0x00);
            }
        }
        // Chipset
        self.cpu.reset();
        self.cia_1.borrow_mut().reset();
        self.cia_2.borrow_mut().reset();
        self.sid.borrow_mut().reset();
        self.vic.borrow_mut().reset();
        // I/O
        self.expansion_port.borrow_mut().reset();
        self.iec_bus.borrow_mut().reset();
        // Peripherals
        for drive in self.drives.iter() {
            drive.borrow_mut().reset();
        }
        self.control_port_1.reset();
        self.control_port_2.reset();
        self.keyboard.reset();
        self.frame_buffer.borrow_mut().reset();
        self.sound_buffer.reset();
        // Runtime State
        self.last_cia_2_pa = 0;
        self.last_drive_pb = [0xff; 2];
        self.last_nmi = false;
        self.frame_count = 0;
        self.vsync_flag.set(false);
    }

    /// Advance the system by the given number of whole cycles. Returns the
    /// number of cycles actually executed; dispatch stops early on a debug
    /// event or while suspended.
    pub fn step(&mut self, cycles: u32) -> u32 {
        let mut executed = 0;
        while executed < cycles {
            if self.is_suspended() {
                break;
            }
            self.clock_cycle();
            executed += 1;
            if self.vsync_flag.get() {
                self.process_vsync();
            }
            if self.cpu.is_instruction_boundary() && !self.check_debug_events() {
                break;
            }
        }
        executed
    }

    /// Run until the next vsync. Returns false when stopped early by a
    /// debug event.
    pub fn run_frame(&mut self) -> bool {
        while !self.vsync_flag.get() {
            if self.is_suspended() {
                return false;
            }
            self.clock_cycle();
            if self.cpu.is_instruction_boundary() && !self.check_debug_events() {
                return false;
            }
        }
        self.process_vsync();
        true
    }

    /// Execute a single instruction.
    pub fn step_instruction(&mut self) {
        self.clock_cycle();
        while !self.cpu.is_instruction_boundary() && !self.cpu.is_cpu_jam() {
            self.clock_cycle();
        }
        if self.vsync_flag.get() {
            self.process_vsync();
        }
    }

    fn clock_cycle(&mut self) {
        // Resolve IEC lines changed during the previous cycle
        self.poll_iec_lines();
        if self.glue_discrete {
            self.vic_base_address.set(self.pending_vic_base.get());
        }
        // Phase 1
        self.vic.borrow_mut().clock();
        // Phase 2
        self.cia_1.borrow_mut().clock();
        self.cia_2.borrow_mut().clock();
        self.expansion_port.borrow_mut().clock();
        let nmi_low = self.nmi_line.borrow().is_low();
        if nmi_low && !self.last_nmi {
            self.expansion_port.borrow_mut().nmi_will_trigger();
        }
        self.last_nmi = nmi_low;
        self.cpu.clock();
        // Drives converge on their own clock
        for drive in self.drives.iter() {
            drive.borrow_mut().execute(self.cycle_duration);
        }
        self.clock.tick();
        if self.raster_hook_armed {
            self.check_raster_hook();
        }
    }

    fn poll_iec_lines(&mut self) {
        // Only lines actually driven as outputs pull the bus
        let cia_driven = {
            let port = self.cia_2_port_a.borrow();
            port.get_value() & port.get_direction()
        };
        if (cia_driven ^ self.last_cia_2_pa) & 0x38 != 0 {
            self.iec_bus.borrow_mut().set_cpu_lines(cia_driven);
        }
        self.last_cia_2_pa = cia_driven;
        for (index, drive) in self.drives.iter().enumerate() {
            let port = drive.borrow().get_via1_port_b();
            let driven = {
                let port = port.borrow();
                port.get_value() & port.get_direction()
            };
            if (driven ^ self.last_drive_pb[index]) & 0x1a != 0 {
                self.iec_bus.borrow_mut().set_drive_lines(index, driven);
            }
            self.last_drive_pb[index] = driven;
        }
        if self.iec_bus.borrow().is_dirty() {
            self.iec_bus.borrow_mut().update();
        }
    }

    fn check_raster_hook(&mut self) {
        if let Some(line) = self.raster_hook {
            let vic = self.vic.borrow();
            let raster = u16::from(vic.spy_read(0x12))
                | (u16::from(vic.spy_read(0x11) & 0x80) << 1);
            drop(vic);
            if raster == line {
                self.raster_hook_armed = false;
                self.post_event(SystemEvent::RasterReached(line));
            }
        }
    }

    /// Returns false when a debug event suspended the core.
    fn check_debug_events(&mut self) -> bool {
        if self.breakpoints.is_bp_present() {
            if let Some(address) = self.breakpoints.check(&*self.cpu) {
                self.post_event(SystemEvent::BreakpointHit(address));
                self.suspend();
                return false;
            }
        }
        if self.watchpoints.is_wp_present() {
            let ram = self.ram.clone();
            let hit = self.watchpoints.check(|address| ram.borrow().read(address));
            if let Some(address) = hit {
                self.post_event(SystemEvent::WatchpointHit(address));
                self.suspend();
                return false;
            }
        }
        true
    }

    fn process_vsync(&mut self) {
        self.sid.borrow_mut().process_vsync();
        self.cia_1.borrow_mut().process_vsync();
        self.cia_2.borrow_mut().process_vsync();
        // An unstable power grid slips an extra pulse in now and then
        if !self.config.power_grid_frequency.is_stable() && self.frame_count % 63 == 62 {
            self.cia_1.borrow_mut().process_vsync();
            self.cia_2.borrow_mut().process_vsync();
        }
        self.keyboard.drain_events();
        for drive in self.drives.iter() {
            let mut drive = drive.borrow_mut();
            drive.process_vsync();
            let drive_nr = drive.get_device_nr();
            while let Some(event) = drive.poll_event() {
                let system_event = match event {
                    DriveEvent::LedOn => SystemEvent::DriveLed {
                        drive: drive_nr,
                        on: true,
                    },
                    DriveEvent::LedOff => SystemEvent::DriveLed {
                        drive: drive_nr,
                        on: false,
                    },
                    DriveEvent::MotorOn => SystemEvent::DriveMotor {
                        drive: drive_nr,
                        on: true,
                    },
                    DriveEvent::MotorOff => SystemEvent::DriveMotor {
                        drive: drive_nr,
                        on: false,
                    },
                    DriveEvent::DiskInserted => SystemEvent::DiskInserted { drive: drive_nr },
                    DriveEvent::DiskEjected => SystemEvent::DiskEjected { drive: drive_nr },
                };
                self.events.borrow_mut().push_back(system_event);
            }
        }
        self.frame_count = self.frame_count.wrapping_add(1);
        self.raster_hook_armed = self.raster_hook.is_some();
        self.post_event(SystemEvent::FrameCompleted);
        self.vsync_flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{C64Factory, FrameBuffer, Palette, SoundBuffer, VideoStandard};
    use super::*;

    fn build_c64() -> C64 {
        let config = Rc::new(Config::new(VideoStandard::Pal6569R3));
        let factory = C64Factory::new(config.clone());
        let frame_buffer = new_shared(FrameBuffer::new(504, 312, Palette::default()));
        let sound_buffer = Arc::new(SoundBuffer::new(8192));
        let mut c64 = C64::build(config, &factory, frame_buffer, sound_buffer);
        c64.reset(true);
        c64
    }

    #[test]
    fn ram_init_pattern_applied_on_hard_reset() {
        let c64 = build_c64();
        assert_eq!(0x00, c64.spy_peek(0x4000 + 0x3f));
        assert_eq!(0xff, c64.spy_peek(0x4000 + 0x40));
    }

    #[test]
    fn spy_peek_poke_roundtrip() {
        let mut c64 = build_c64();
        for address in [0x0002u16, 0x0100, 0x4000, 0x7abc].iter() {
            c64.poke(*address, 0x42);
            assert_eq!(0x42, c64.spy_peek(*address));
        }
    }

    #[test]
    fn step_advances_clock() {
        let mut c64 = build_c64();
        let executed = c64.step(100);
        assert_eq!(100, executed);
        assert_eq!(100, c64.get_cycles());
    }

    #[test]
    fn suspend_blocks_dispatch_and_nests() {
        let mut c64 = build_c64();
        c64.suspend();
        c64.suspend();
        assert_eq!(0, c64.step(10));
        c64.resume();
        assert_eq!(0, c64.step(10));
        c64.resume();
        assert_eq!(10, c64.step(10));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut c64 = build_c64();
        c64.reset(true);
        let a = (
            c64.get_cycles(),
            c64.spy_peek(0x4000),
            c64.get_frame_count(),
        );
        c64.reset(true);
        let b = (
            c64.get_cycles(),
            c64.spy_peek(0x4000),
            c64.get_frame_count(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn run_frame_posts_frame_event() {
        let mut c64 = build_c64();
        assert_eq!(true, c64.run_frame());
        let mut saw_frame = false;
        while let Some(event) = c64.poll_event() {
            if event == SystemEvent::FrameCompleted {
                saw_frame = true;
            }
        }
        assert_eq!(true, saw_frame);
        assert_eq!(1, c64.get_frame_count());
    }

    #[test]
    fn breakpoint_suspends_core() {
        let mut c64 = build_c64();
        // Infinite loop at 0x2000: JMP $2000
        c64.load(&[0x4c, 0x00, 0x20], 0x2000);
        c64.get_cpu_mut().set_pc(0x2000);
        c64.get_bpm_mut().set(0x2000, false);
        c64.step(1000);
        assert_eq!(true, c64.is_suspended());
        let mut saw_hit = false;
        while let Some(event) = c64.poll_event() {
            if event == SystemEvent::BreakpointHit(0x2000) {
                saw_hit = true;
            }
        }
        assert_eq!(true, saw_hit);
    }

    #[test]
    fn invalid_rom_size_is_config_error() {
        let mut c64 = build_c64();
        let result = c64.load_rom(RomKind::Basic, &[0u8; 100]);
        assert_eq!(true, result.is_err());
    }
}
