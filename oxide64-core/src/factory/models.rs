// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VicModel {
    /// NTSC, 65 cycles per line
    Mos6567,
    /// Early NTSC revision, 64 cycles per line
    Mos6567R56A,
    /// PAL, 63 cycles per line
    Mos6569,
    /// Early PAL revision with split D011 visibility
    Mos6569R1,
    /// PAL HMOS with grey dot bug
    Mos8565,
    /// NTSC HMOS with grey dot bug
    Mos8562,
}

impl VicModel {
    pub fn is_ntsc(self) -> bool {
        match self {
            VicModel::Mos6567 | VicModel::Mos6567R56A | VicModel::Mos8562 => true,
            _ => false,
        }
    }

    pub fn has_grey_dot_bug(self) -> bool {
        match self {
            VicModel::Mos8565 | VicModel::Mos8562 => true,
            _ => false,
        }
    }

    /// The early PAL revision latches set bits of D011 two pixels before
    /// cleared bits.
    pub fn has_split_d011(self) -> bool {
        self == VicModel::Mos6569R1
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidModel {
    Mos6581,
    Mos8580,
}

#[derive(Clone, Copy)]
pub struct SystemModel {
    pub color_ram: usize,
    pub cpu_freq: u32,
    pub cycles_per_frame: u16,
    pub frame_buffer_size: (usize, usize),
    pub memory_size: usize,
    pub refresh_rate: f32,
    pub sid_model: SidModel,
    pub vic_model: VicModel,
}

impl SystemModel {
    pub fn from(model: &str) -> SystemModel {
        match model {
            "ntsc" | "c64-ntsc" => SystemModel::c64_ntsc(),
            "pal" | "c64-pal" => SystemModel::c64_pal(),
            _ => panic!("invalid model {}", model),
        }
    }

    pub fn from_vic(vic_model: VicModel) -> SystemModel {
        if vic_model.is_ntsc() {
            SystemModel {
                vic_model,
                ..SystemModel::c64_ntsc()
            }
        } else {
            SystemModel {
                vic_model,
                ..SystemModel::c64_pal()
            }
        }
    }

    pub fn c64_ntsc() -> SystemModel {
        SystemModel {
            color_ram: 1024,
            cpu_freq: 1_022_727,
            cycles_per_frame: 17095,
            frame_buffer_size: (520, 263),
            memory_size: 65536,
            refresh_rate: 59.826,
            sid_model: SidModel::Mos6581,
            vic_model: VicModel::Mos6567,
        }
    }

    pub fn c64_pal() -> SystemModel {
        SystemModel {
            color_ram: 1024,
            cpu_freq: 985_248,
            cycles_per_frame: 19656,
            frame_buffer_size: (504, 312),
            memory_size: 65536,
            refresh_rate: 50.125,
            sid_model: SidModel::Mos6581,
            vic_model: VicModel::Mos6569,
        }
    }
}
