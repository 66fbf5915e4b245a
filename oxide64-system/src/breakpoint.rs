// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use oxide64_core::factory::Cpu;

pub struct Breakpoint {
    pub index: u16,
    pub address: u16,
    pub enabled: bool,
    pub hit_count: u32,
    ignore: u16,
    autodelete: bool,
}

pub struct BreakpointManager {
    breakpoints: Vec<Breakpoint>,
    bp_index: u16,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self {
            breakpoints: Vec::new(),
            bp_index: 1,
        }
    }

    #[inline]
    pub fn check(&mut self, cpu: &dyn Cpu) -> Option<u16> {
        if self.breakpoints.is_empty() {
            return None;
        }
        let pc = cpu.get_pc();
        let bp_pos = self.breakpoints.iter_mut().position(|bp| {
            if bp.address == pc && bp.enabled {
                if bp.ignore == 0 {
                    bp.hit_count += 1;
                    true
                } else {
                    bp.ignore -= 1;
                    false
                }
            } else {
                false
            }
        });
        if let Some(pos) = bp_pos {
            let address = self.breakpoints[pos].address;
            if self.breakpoints[pos].autodelete {
                self.breakpoints.remove(pos);
            }
            Some(address)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    pub fn enable_all(&mut self, enabled: bool) {
        for bp in self.breakpoints.iter_mut() {
            bp.enabled = enabled;
        }
    }

    pub fn get(&self, index: u16) -> Result<&Breakpoint, String> {
        match self.breakpoints.iter().position(|bp| bp.index == index) {
            Some(pos) => Ok(&self.breakpoints[pos]),
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn is_bp_present(&self) -> bool {
        self.breakpoints.iter().any(|bp| bp.enabled)
    }

    pub fn ignore(&mut self, index: u16, count: u16) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                bp.ignore = count;
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn list(&self) -> std::slice::Iter<'_, Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn remove(&mut self, index: u16) -> Result<(), String> {
        match self.breakpoints.iter().position(|bp| bp.index == index) {
            Some(pos) => {
                self.breakpoints.remove(pos);
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn set(&mut self, address: u16, autodelete: bool) -> u16 {
        let index = self.bp_index;
        let bp = Breakpoint {
            index,
            address,
            enabled: true,
            hit_count: 0,
            ignore: 0,
            autodelete,
        };
        self.breakpoints.push(bp);
        self.bp_index += 1;
        index
    }

    pub fn set_enabled(&mut self, index: u16, enabled: bool) -> Result<(), String> {
        match self.find_mut(index) {
            Some(bp) => {
                bp.enabled = enabled;
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    fn find_mut(&mut self, index: u16) -> Option<&mut Breakpoint> {
        match self.breakpoints.iter().position(|bp| bp.index == index) {
            Some(pos) => Some(&mut self.breakpoints[pos]),
            None => None,
        }
    }
}

impl Default for BreakpointManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Watchpoint {
    pub index: u16,
    pub address: u16,
    pub enabled: bool,
    pub hit_count: u32,
    last_value: Option<u8>,
}

/// Watchpoints observe memory through value snapshots compared at
/// instruction boundaries.
pub struct WatchpointManager {
    watchpoints: Vec<Watchpoint>,
    wp_index: u16,
}

impl WatchpointManager {
    pub fn new() -> Self {
        Self {
            watchpoints: Vec::new(),
            wp_index: 1,
        }
    }

    pub fn is_wp_present(&self) -> bool {
        self.watchpoints.iter().any(|wp| wp.enabled)
    }

    pub fn set(&mut self, address: u16) -> u16 {
        let index = self.wp_index;
        self.watchpoints.push(Watchpoint {
            index,
            address,
            enabled: true,
            hit_count: 0,
            last_value: None,
        });
        self.wp_index += 1;
        index
    }

    pub fn remove(&mut self, index: u16) -> Result<(), String> {
        match self.watchpoints.iter().position(|wp| wp.index == index) {
            Some(pos) => {
                self.watchpoints.remove(pos);
                Ok(())
            }
            None => Err(format!("Invalid index {}", index)),
        }
    }

    pub fn clear(&mut self) {
        self.watchpoints.clear();
    }

    pub fn list(&self) -> std::slice::Iter<'_, Watchpoint> {
        self.watchpoints.iter()
    }

    /// Compare watched addresses against their last seen values; returns
    /// the first address whose value changed.
    pub fn check<F>(&mut self, read: F) -> Option<u16>
    where
        F: Fn(u16) -> u8,
    {
        let mut hit = None;
        for wp in self.watchpoints.iter_mut() {
            if !wp.enabled {
                continue;
            }
            let value = read(wp.address);
            if let Some(last) = wp.last_value {
                if last != value && hit.is_none() {
                    wp.hit_count += 1;
                    hit = Some(wp.address);
                }
            }
            wp.last_value = Some(value);
        }
        hit
    }
}

impl Default for WatchpointManager {
    fn default() -> Self {
        Self::new()
    }
}
