// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use oxide64_core::factory::{SystemModel, VicModel};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum VideoStandard {
    Pal6569R1,
    Pal6569R3,
    Pal8565,
    Ntsc6567,
    Ntsc6567R56A,
    Ntsc8562,
}

impl VideoStandard {
    pub fn vic_model(self) -> VicModel {
        match self {
            VideoStandard::Pal6569R1 => VicModel::Mos6569R1,
            VideoStandard::Pal6569R3 => VicModel::Mos6569,
            VideoStandard::Pal8565 => VicModel::Mos8565,
            VideoStandard::Ntsc6567 => VicModel::Mos6567,
            VideoStandard::Ntsc6567R56A => VicModel::Mos6567R56A,
            VideoStandard::Ntsc8562 => VicModel::Mos8562,
        }
    }

    pub fn is_pal(self) -> bool {
        !self.vic_model().is_ntsc()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GlueLogic {
    Discrete,
    CustomIc,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RamInitPattern {
    /// 0x00/0xFF bands with a 0x40 byte period
    Pattern40,
    /// 0x00/0xFF bands with a 0x80 byte period
    Pattern80,
}

impl RamInitPattern {
    pub fn period(self) -> usize {
        match self {
            RamInitPattern::Pattern40 => 0x40,
            RamInitPattern::Pattern80 => 0x80,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PowerGridFrequency {
    Stable50,
    Unstable50,
    Stable60,
    Unstable60,
}

impl PowerGridFrequency {
    /// Grid pulses per TOD tenth of a second.
    pub fn pulses_per_tenth(self) -> u8 {
        match self {
            PowerGridFrequency::Stable50 | PowerGridFrequency::Unstable50 => 5,
            PowerGridFrequency::Stable60 | PowerGridFrequency::Unstable60 => 6,
        }
    }

    pub fn is_stable(self) -> bool {
        match self {
            PowerGridFrequency::Stable50 | PowerGridFrequency::Stable60 => true,
            _ => false,
        }
    }
}

#[derive(Copy, Clone)]
pub struct DriveConfig {
    pub connected: bool,
    pub switched_on: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            connected: false,
            switched_on: true,
        }
    }
}

#[derive(Copy, Clone)]
pub struct CheatConfig {
    pub check_ss_collisions: bool,
    pub check_sb_collisions: bool,
    pub hide_sprites: bool,
}

impl Default for CheatConfig {
    fn default() -> Self {
        CheatConfig {
            check_ss_collisions: true,
            check_sb_collisions: true,
            hide_sprites: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RomKind {
    Basic,
    Charset,
    Kernal,
    Vc1541,
}

impl RomKind {
    pub fn size(self) -> usize {
        match self {
            RomKind::Basic => 0x2000,
            RomKind::Charset => 0x1000,
            RomKind::Kernal => 0x2000,
            RomKind::Vc1541 => 0x4000,
        }
    }
}

pub struct RomData {
    pub basic: Vec<u8>,
    pub charset: Vec<u8>,
    pub kernal: Vec<u8>,
    pub vc1541: Vec<u8>,
}

impl RomData {
    pub fn default() -> Self {
        RomData {
            basic: vec![0x00; RomKind::Basic.size()],
            charset: vec![0x00; RomKind::Charset.size()],
            kernal: vec![0x00; RomKind::Kernal.size()],
            vc1541: vec![0x00; RomKind::Vc1541.size()],
        }
    }

    pub fn new(basic: &[u8], charset: &[u8], kernal: &[u8]) -> Self {
        RomData {
            basic: basic.to_vec(),
            charset: charset.to_vec(),
            kernal: kernal.to_vec(),
            vc1541: vec![0x00; RomKind::Vc1541.size()],
        }
    }
}

pub struct SoundConfig {
    pub enable: bool,
    pub buffer_size: usize,
    pub sample_rate: u32,
    pub sid_filters: bool,
}

impl SoundConfig {
    pub fn default() -> SoundConfig {
        SoundConfig {
            enable: true,
            buffer_size: 4096,
            sample_rate: 44100,
            sid_filters: true,
        }
    }
}

pub struct Config {
    pub model: SystemModel,
    pub video_standard: VideoStandard,
    pub glue_logic: GlueLogic,
    pub ram_init_pattern: RamInitPattern,
    pub power_grid_frequency: PowerGridFrequency,
    pub drives: [DriveConfig; 2],
    pub cheats: CheatConfig,
    pub sound: SoundConfig,
    pub roms: RomData,
}

impl Config {
    pub fn new(video_standard: VideoStandard) -> Config {
        let model = SystemModel::from_vic(video_standard.vic_model());
        Config {
            model,
            video_standard,
            glue_logic: GlueLogic::Discrete,
            ram_init_pattern: RamInitPattern::Pattern40,
            power_grid_frequency: if video_standard.is_pal() {
                PowerGridFrequency::Stable50
            } else {
                PowerGridFrequency::Stable60
            },
            drives: [DriveConfig::default(); 2],
            cheats: CheatConfig::default(),
            sound: SoundConfig::default(),
            roms: RomData::default(),
        }
    }

    pub fn new_with_roms(
        video_standard: VideoStandard,
        basic: &[u8],
        charset: &[u8],
        kernal: &[u8],
    ) -> Config {
        let mut config = Config::new(video_standard);
        config.roms = RomData::new(basic, charset, kernal);
        config
    }
}
