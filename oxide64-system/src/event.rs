// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

/// Messages posted to the host through the system event queue.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SystemEvent {
    FrameCompleted,
    RasterReached(u16),
    BreakpointHit(u16),
    WatchpointHit(u16),
    DriveLed { drive: u8, on: bool },
    DriveMotor { drive: u8, on: bool },
    DiskInserted { drive: u8 },
    DiskEjected { drive: u8 },
    CartridgeLed(bool),
    WarpChanged(bool),
}
