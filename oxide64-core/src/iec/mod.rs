// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod bus;

pub use self::bus::IecBus;
