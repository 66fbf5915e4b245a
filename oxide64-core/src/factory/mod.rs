// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod chip_factory;
mod models;
mod types;

pub use self::chip_factory::ChipFactory;
pub use self::models::{SidModel, SystemModel, VicModel};
pub use self::types::*;
