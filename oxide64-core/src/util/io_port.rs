// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

pub type Observer = Box<dyn Fn(u8)>;

// direction - (where 1 is an output, and 0 is an input).

pub struct IoPort {
    direction: u8,
    input: u8,
    output: u8,
    observer: Option<Observer>,
}

impl IoPort {
    pub fn new(direction: u8, input: u8) -> IoPort {
        IoPort {
            direction,
            input,
            output: 0,
            observer: None,
        }
    }

    #[inline]
    pub fn get_direction(&self) -> u8 {
        self.direction
    }

    #[inline]
    pub fn get_value(&self) -> u8 {
        (self.output & self.direction) | (self.input & !self.direction)
    }

    /// Port value with the floating input lines replaced by an external state.
    #[inline]
    pub fn get_value_2(&self, input: u8) -> u8 {
        (self.output & self.direction) | (input & !self.direction)
    }

    #[inline]
    pub fn set_direction(&mut self, direction: u8) {
        self.direction = direction;
        self.notify_observer();
    }

    #[inline]
    pub fn set_input(&mut self, value: u8) {
        self.input = value;
        self.notify_observer();
    }

    #[inline]
    pub fn set_input_bit(&mut self, bit: usize, value: bool) {
        self.input.set_bit(bit, value);
        self.notify_observer();
    }

    #[inline]
    pub fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    #[inline]
    pub fn set_value(&mut self, value: u8) {
        self.output = value;
        self.notify_observer();
    }

    #[inline]
    pub fn reset(&mut self) {
        self.direction = 0x00;
        self.input = 0xff;
        self.output = 0x00;
        self.notify_observer();
    }

    #[inline]
    fn notify_observer(&self) {
        if let Some(ref observer) = self.observer {
            observer(self.get_value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_mixes_output_and_input() {
        let mut port = IoPort::new(0x0f, 0xff);
        port.set_value(0x55);
        assert_eq!(0xf5, port.get_value());
    }

    #[test]
    fn observer_sees_effective_value() {
        use std::cell::Cell;
        use std::rc::Rc;
        let seen = Rc::new(Cell::new(0u8));
        let seen_clone = seen.clone();
        let mut port = IoPort::new(0xff, 0xff);
        port.set_observer(Box::new(move |value| seen_clone.set(value)));
        port.set_value(0xa5);
        assert_eq!(0xa5, seen.get());
    }
}
