// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use oxide64_core::device::{Cartridge, Chip as CartChip, ChipType, HwType};
use oxide64_core::util::new_shared;
use oxide64_system::{
    C64, C64Factory, Config, FrameBuffer, Palette, SoundBuffer, SystemEvent, VideoStandard,
};

const PAL_CYCLES_PER_FRAME: u64 = 312 * 63;

fn build_c64_with(configure: impl FnOnce(&mut Config)) -> C64 {
    let mut config = Config::new(VideoStandard::Pal6569R3);
    // Character generator filled with a checker pattern so text mode
    // produces foreground pixels
    config.roms.charset = vec![0xaa; 0x1000];
    configure(&mut config);
    let config = Rc::new(config);
    let factory = C64Factory::new(config.clone());
    let frame_buffer = new_shared(FrameBuffer::new(504, 312, Palette::default()));
    let sound_buffer = Arc::new(SoundBuffer::new(8192));
    let mut c64 = C64::build(config, &factory, frame_buffer, sound_buffer);
    c64.reset(true);
    c64
}

fn build_c64() -> C64 {
    build_c64_with(|_| {})
}

fn current_raster(c64: &C64) -> u16 {
    u16::from(c64.spy_peek(0xd012)) | (u16::from(c64.spy_peek(0xd011) & 0x80) << 1)
}

#[test]
fn pal_frame_has_19656_cycles() {
    let mut c64 = build_c64();
    let start = c64.get_cycles();
    assert_eq!(true, c64.run_frame());
    let elapsed = c64.get_cycles() - start;
    // The first frame starts mid-line after reset; subsequent frames are
    // exact
    let start = c64.get_cycles();
    assert_eq!(true, c64.run_frame());
    assert_eq!(PAL_CYCLES_PER_FRAME, c64.get_cycles() - start);
    assert!(elapsed <= PAL_CYCLES_PER_FRAME);
}

#[test]
fn bad_line_steals_cpu_cycles() {
    let mut c64 = build_c64();
    // DEN on, yscroll 3: every line with y & 7 == 3 inside the display
    // window is a bad line
    c64.poke(0xd011, 0x1b);
    // Tight loop of read cycles: JMP $2000
    c64.load(&[0x4c, 0x00, 0x20], 0x2000);
    c64.get_cpu_mut().set_pc(0x2000);
    // Let the state settle for a frame
    c64.run_frame();

    let mut iterations: HashMap<u16, u32> = HashMap::new();
    let mut prev_hit = false;
    for _ in 0..PAL_CYCLES_PER_FRAME {
        c64.step(1);
        let cpu = c64.get_cpu();
        let hit = cpu.is_instruction_boundary() && cpu.get_pc() == 0x2000;
        if hit && !prev_hit {
            let line = current_raster(&c64);
            *iterations.entry(line).or_insert(0) += 1;
        }
        prev_hit = hit;
    }
    let bad_line = iterations.get(&0x33).cloned().unwrap_or(0);
    let normal_line = iterations.get(&0x35).cloned().unwrap_or(0);
    // The CPU is held for 40 cycles on the bad line
    assert!(
        bad_line + 5 < normal_line,
        "bad line {} iterations, normal line {}",
        bad_line,
        normal_line
    );
}

#[test]
fn sprite_background_collision_sets_and_clears() {
    let mut c64 = build_c64();
    c64.poke(0xd011, 0x1b);
    // Sprite 0 data: solid block at pointer 63
    c64.load(&[63], 0x07f8);
    c64.load(&[0xff; 63], 63 * 64);
    c64.poke(0xd015, 0x01);
    c64.poke(0xd000, 160);
    c64.poke(0xd001, 100);
    for _ in 0..3 {
        c64.run_frame();
    }
    let collisions = c64.peek(0xd01f);
    assert_eq!(0x01, collisions & 0x01);
    // Reading cleared the register; the sprite keeps colliding so it may
    // fill again during further frames but not within a few cycles
    let collisions = c64.peek(0xd01f);
    assert_eq!(0x00, collisions & 0x01);
}

#[test]
fn easyflash_bank_switch_is_visible_to_cpu() {
    let mut c64 = build_c64();
    let mut cartridge = Cartridge::new(HwType::EasyFlash, false, false);
    for bank in 0..8 {
        cartridge.add(CartChip {
            chip_type: ChipType::FlashRom,
            bank_number: bank,
            offset: 0x8000,
            size: 0x2000,
            data: vec![0x10 + bank; 0x2000],
        });
        cartridge.add(CartChip {
            chip_type: ChipType::FlashRom,
            bank_number: bank,
            offset: 0xa000,
            size: 0x2000,
            data: vec![0x20 + bank; 0x2000],
        });
    }
    c64.attach_cartridge(cartridge);
    // Bank 3, MXG = 111 (16K), LED on
    c64.poke(0xde00, 0x03);
    c64.poke(0xde02, 0x87);
    assert_eq!(0x13, c64.peek(0x8000));
    assert_eq!(0x23, c64.peek(0xa000));
    let mut saw_led = false;
    while let Some(event) = c64.poll_event() {
        if event == SystemEvent::CartridgeLed(true) {
            saw_led = true;
        }
    }
    assert_eq!(true, saw_led);
}

#[test]
fn iec_atn_is_acknowledged_by_drive() {
    let mut c64 = build_c64_with(|config| {
        config.drives[0].connected = true;
    });
    // CIA 2 port A: VIC bank and IEC outputs
    c64.poke(0xdd02, 0x3f);
    c64.poke(0xdd00, 0x08); // assert ATN
    c64.step(2);
    let (atn, _clk, data) = c64.get_iec_bus().borrow().get_lines();
    assert_eq!(false, atn);
    // The drive side acknowledge gate pulls DATA
    assert_eq!(false, data);
    // The drive sees ATN on VIA 1 port B bit 7
    let drive = c64.get_drive(0).unwrap();
    let port = drive.borrow().get_via1_port_b();
    let seen = port.borrow().get_value();
    assert_eq!(0x80, seen & 0x80);
}

#[test]
fn iec_byte_arrives_bit_by_bit() {
    let mut c64 = build_c64_with(|config| {
        config.drives[0].connected = true;
    });
    c64.poke(0xdd02, 0x3f);
    let drive = c64.get_drive(0).unwrap();
    let port = drive.borrow().get_via1_port_b();
    let byte = 0xa5u8;
    let mut received = 0u8;
    let start = c64.get_cycles();
    for bit in 0..8 {
        let value = (byte >> bit) & 0x01;
        // Data line released = logical 1; CLK edge strobes the bit
        let data_pull = if value != 0 { 0x00 } else { 0x20 };
        c64.poke(0xdd00, 0x10 | data_pull);
        c64.step(2);
        c64.poke(0xdd00, data_pull); // release CLK
        c64.step(2);
        // Sample the drive-side DATA input: bit 0 reads 1 while pulled
        let sampled = port.borrow().get_value() & 0x01;
        received |= (sampled ^ 0x01) << bit;
        c64.step(2);
    }
    assert_eq!(byte, received);
    assert!(c64.get_cycles() - start < 160);
}

#[test]
fn raster_notification_event() {
    let mut c64 = build_c64();
    c64.set_raster_notification(Some(0x80));
    c64.run_frame();
    let mut saw_raster = false;
    while let Some(event) = c64.poll_event() {
        if event == SystemEvent::RasterReached(0x80) {
            saw_raster = true;
        }
    }
    assert_eq!(true, saw_raster);
}

#[test]
fn drive_insertion_posts_events() {
    let mut c64 = build_c64_with(|config| {
        config.drives[0].connected = true;
    });
    c64.insert_disk(0, oxide64_core::drive::Disk::new()).unwrap();
    // The light barrier FSM takes ~17 frames to settle
    for _ in 0..20 {
        c64.run_frame();
    }
    let mut saw_inserted = false;
    while let Some(event) = c64.poll_event() {
        if event == (SystemEvent::DiskInserted { drive: 8 }) {
            saw_inserted = true;
        }
    }
    assert_eq!(true, saw_inserted);
}
