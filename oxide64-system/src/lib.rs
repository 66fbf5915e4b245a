// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[macro_use]
extern crate log;

mod breakpoint;
mod c64;
mod c64_factory;
mod config;
mod error;
mod event;
mod frame_buffer;
mod palette;
mod sound_buffer;

pub use self::breakpoint::{Breakpoint, BreakpointManager, Watchpoint, WatchpointManager};
pub use self::c64::C64;
pub use self::c64_factory::C64Factory;
pub use self::config::{
    CheatConfig, Config, DriveConfig, GlueLogic, PowerGridFrequency, RamInitPattern, RomData,
    RomKind, SoundConfig, VideoStandard,
};
pub use self::error::Error;
pub use self::event::SystemEvent;
pub use self::frame_buffer::FrameBuffer;
pub use self::palette::Palette;
pub use self::sound_buffer::SoundBuffer;
