// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::SharedCell;

// Control port digital lines, active in the shared state byte:
// bit 0 up, bit 1 down, bit 2 left, bit 3 right, bit 4 fire.

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Button {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    Fire = 4,
}

pub struct Joystick {
    state: SharedCell<u8>,
}

impl Joystick {
    pub fn new(state: SharedCell<u8>) -> Self {
        Self { state }
    }

    pub fn get_state(&self) -> u8 {
        self.state.get()
    }

    pub fn reset(&mut self) {
        self.state.set(0);
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let mut state = self.state.get();
        state.set_bit(button as usize, pressed);
        self.state.set(state);
    }

    pub fn set_axis(&mut self, dx: i8, dy: i8) {
        let mut state = self.state.get();
        state.set_bit(Button::Left as usize, dx < 0);
        state.set_bit(Button::Right as usize, dx > 0);
        state.set_bit(Button::Up as usize, dy < 0);
        state.set_bit(Button::Down as usize, dy > 0);
        self.state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared_cell;

    #[test]
    fn fire_button_sets_bit_4() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(state.clone());
        joystick.set_button(Button::Fire, true);
        assert_eq!(0x10, state.get());
        joystick.set_button(Button::Fire, false);
        assert_eq!(0x00, state.get());
    }
}
