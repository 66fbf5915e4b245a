// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod border_unit;
mod gfx_sequencer;
mod mux_unit;
mod spec;
mod sprite_sequencer;
mod vic;
mod vic_memory;

pub use self::spec::Spec;
pub use self::vic::{Vic, IRQ_SOURCE_VIC};
pub use self::vic_memory::VicMemory;
