// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{IrqLine, Shared};

// SPEC: https://www.c64-wiki.com/index.php/Keyboard#Hardware
// Design:
//   The matrix is kept in two mirrors, row-indexed and column-indexed, so
//   both scan directions are O(1). RESTORE is not part of the matrix and
//   drives the NMI line directly; SHIFT LOCK is a latch on the left shift
//   position. Auto-typing is an event queue drained once per frame slot.

pub const NMI_SOURCE_RESTORE: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Key {
    // Numerical
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    // Alpha
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    // Symbols
    Asterisk,
    At,
    Backspace,
    Caret,
    Colon,
    Comma,
    Dollar,
    Equals,
    Minus,
    Period,
    Plus,
    Return,
    Semicolon,
    Slash,
    Space,
    // Control
    CrsrDown,
    Ctrl,
    Home,
    Left,
    LGui,
    LShift,
    RunStop,
    CrsrRight,
    RShift,
    Restore,
    ShiftLock,
    // Function
    F1,
    F3,
    F5,
    F7,
}

#[derive(Copy, Clone, Debug)]
pub struct KeyEvent {
    keycode: Key,
    modifier: Option<Key>,
    disable_shift: bool,
}

impl KeyEvent {
    pub fn new(keycode: Key) -> Self {
        Self {
            keycode,
            modifier: None,
            disable_shift: false,
        }
    }

    pub fn with_disabled_shift(keycode: Key) -> KeyEvent {
        KeyEvent {
            keycode,
            modifier: None,
            disable_shift: true,
        }
    }

    pub fn with_mod(keycode: Key, modifier: Key) -> KeyEvent {
        KeyEvent {
            keycode,
            modifier: Some(modifier),
            disable_shift: false,
        }
    }
}

/// Auto-type queue entries consumed on a scheduler slot.
#[derive(Copy, Clone, Debug)]
pub enum TypeEvent {
    Press(KeyEvent),
    Release(KeyEvent),
    Wait(u32),
    ReleaseAll,
}

pub struct Keyboard {
    matrix: Shared<[u8; 16]>,
    queue: Vec<TypeEvent>,
    wait_slots: u32,
    disabled_shift: u8,
    shift_lock: bool,
    nmi_line: Shared<IrqLine>,
}

impl Keyboard {
    pub fn new(matrix: Shared<[u8; 16]>, nmi_line: Shared<IrqLine>) -> Self {
        Self {
            matrix,
            queue: Vec::new(),
            wait_slots: 0,
            disabled_shift: 0,
            shift_lock: false,
            nmi_line,
        }
    }

    pub fn get_col(&self, col: u8) -> u8 {
        self.matrix.borrow()[8 + col as usize]
    }

    pub fn get_row(&self, row: u8) -> u8 {
        self.matrix.borrow()[row as usize]
    }

    pub fn has_events(&self) -> bool {
        !self.queue.is_empty() || self.wait_slots > 0
    }

    /// Consume auto-type events for one scheduler slot. Events are drained
    /// until the first wait.
    pub fn drain_events(&mut self) {
        if self.wait_slots > 0 {
            self.wait_slots -= 1;
            return;
        }
        while !self.queue.is_empty() {
            let event = self.queue.remove(0);
            match event {
                TypeEvent::Press(key_event) => self.on_key_down(key_event),
                TypeEvent::Release(key_event) => self.on_key_up(key_event),
                TypeEvent::Wait(slots) => {
                    self.wait_slots = slots;
                    break;
                }
                TypeEvent::ReleaseAll => self.release_all(),
            }
        }
    }

    pub fn enqueue(&mut self, text: &str) {
        for c in text.chars() {
            let key_event = self.map_char(c);
            self.queue.push(TypeEvent::Press(key_event));
            self.queue.push(TypeEvent::Wait(1));
            self.queue.push(TypeEvent::Release(key_event));
            self.queue.push(TypeEvent::Wait(1));
        }
    }

    pub fn enqueue_event(&mut self, event: TypeEvent) {
        self.queue.push(event);
    }

    pub fn release_all(&mut self) {
        let mut matrix = self.matrix.borrow_mut();
        for value in matrix.iter_mut() {
            *value = 0xff;
        }
        drop(matrix);
        if self.shift_lock {
            self.set_matrix_key(Key::LShift, true);
        }
    }

    pub fn reset(&mut self) {
        {
            let mut matrix = self.matrix.borrow_mut();
            for value in matrix.iter_mut() {
                *value = 0xff;
            }
        }
        self.queue.clear();
        self.wait_slots = 0;
        self.disabled_shift = 0;
        self.shift_lock = false;
    }

    pub fn set_key(&mut self, keycode: Key, enabled: bool) {
        match keycode {
            Key::Restore => {
                self.nmi_line
                    .borrow_mut()
                    .set_low(NMI_SOURCE_RESTORE, enabled);
            }
            Key::ShiftLock => {
                self.shift_lock = enabled;
                self.set_matrix_key(Key::LShift, enabled);
            }
            _ => self.set_matrix_key(keycode, enabled),
        }
    }

    fn set_matrix_key(&mut self, keycode: Key, enabled: bool) {
        let mapping = self.map_keycode(keycode);
        self.matrix.borrow_mut()[mapping.0].set_bit(mapping.1, !enabled);
        self.matrix.borrow_mut()[8 + mapping.1].set_bit(mapping.0, !enabled);
    }

    pub fn set_matrix(&mut self, mapping: (usize, usize), enabled: bool) {
        self.matrix.borrow_mut()[mapping.0].set_bit(mapping.1, !enabled);
        self.matrix.borrow_mut()[8 + mapping.1].set_bit(mapping.0, !enabled);
    }

    fn is_pressed(&self, keycode: Key) -> bool {
        let mapping = self.map_keycode(keycode);
        !self.matrix.borrow()[mapping.0].get_bit(mapping.1)
    }

    // -- Event Handlers

    pub fn on_key_down(&mut self, event: KeyEvent) {
        self.set_key(event.keycode, true);
        if let Some(modifier) = event.modifier {
            self.set_key(modifier, true);
        }
        if event.disable_shift {
            if self.is_pressed(Key::LShift) {
                self.set_key(Key::LShift, false);
                self.disabled_shift.set_bit(0, true);
            }
            if self.is_pressed(Key::RShift) {
                self.set_key(Key::RShift, false);
                self.disabled_shift.set_bit(1, true);
            }
        }
    }

    pub fn on_key_up(&mut self, event: KeyEvent) {
        self.set_key(event.keycode, false);
        if let Some(modifier) = event.modifier {
            self.set_key(modifier, false);
        }
        if event.disable_shift {
            if self.disabled_shift.get_bit(0) {
                self.set_key(Key::LShift, true);
            }
            if self.disabled_shift.get_bit(1) {
                self.set_key(Key::RShift, true);
            }
            self.disabled_shift = 0;
        }
    }

    // -- Mapping Ops

    fn map_char(&self, c: char) -> KeyEvent {
        match c {
            '\n' => KeyEvent::new(Key::Return),
            ' ' => KeyEvent::new(Key::Space),
            '!' => KeyEvent::with_mod(Key::Num1, Key::LShift),
            '"' => KeyEvent::with_mod(Key::Num2, Key::LShift),
            '#' => KeyEvent::with_mod(Key::Num3, Key::LShift),
            '$' => KeyEvent::with_mod(Key::Num4, Key::LShift),
            '%' => KeyEvent::with_mod(Key::Num5, Key::LShift),
            '&' => KeyEvent::with_mod(Key::Num6, Key::LShift),
            '\'' => KeyEvent::with_mod(Key::Num7, Key::LShift),
            '(' => KeyEvent::with_mod(Key::Num8, Key::LShift),
            ')' => KeyEvent::with_mod(Key::Num9, Key::LShift),
            '*' => KeyEvent::new(Key::Asterisk),
            '+' => KeyEvent::new(Key::Plus),
            ',' => KeyEvent::new(Key::Comma),
            '-' => KeyEvent::new(Key::Minus),
            '.' => KeyEvent::new(Key::Period),
            '/' => KeyEvent::new(Key::Slash),
            '0' => KeyEvent::new(Key::Num0),
            '1' => KeyEvent::new(Key::Num1),
            '2' => KeyEvent::new(Key::Num2),
            '3' => KeyEvent::new(Key::Num3),
            '4' => KeyEvent::new(Key::Num4),
            '5' => KeyEvent::new(Key::Num5),
            '6' => KeyEvent::new(Key::Num6),
            '7' => KeyEvent::new(Key::Num7),
            '8' => KeyEvent::new(Key::Num8),
            '9' => KeyEvent::new(Key::Num9),
            ':' => KeyEvent::new(Key::Colon),
            ';' => KeyEvent::new(Key::Semicolon),
            '<' => KeyEvent::with_mod(Key::Comma, Key::LShift),
            '=' => KeyEvent::new(Key::Equals),
            '>' => KeyEvent::with_mod(Key::Period, Key::LShift),
            '?' => KeyEvent::with_mod(Key::Slash, Key::LShift),
            '@' => KeyEvent::new(Key::At),
            'A' => KeyEvent::new(Key::A),
            'B' => KeyEvent::new(Key::B),
            'C' => KeyEvent::new(Key::C),
            'D' => KeyEvent::new(Key::D),
            'E' => KeyEvent::new(Key::E),
            'F' => KeyEvent::new(Key::F),
            'G' => KeyEvent::new(Key::G),
            'H' => KeyEvent::new(Key::H),
            'I' => KeyEvent::new(Key::I),
            'J' => KeyEvent::new(Key::J),
            'K' => KeyEvent::new(Key::K),
            'L' => KeyEvent::new(Key::L),
            'M' => KeyEvent::new(Key::M),
            'N' => KeyEvent::new(Key::N),
            'O' => KeyEvent::new(Key::O),
            'P' => KeyEvent::new(Key::P),
            'Q' => KeyEvent::new(Key::Q),
            'R' => KeyEvent::new(Key::R),
            'S' => KeyEvent::new(Key::S),
            'T' => KeyEvent::new(Key::T),
            'U' => KeyEvent::new(Key::U),
            'V' => KeyEvent::new(Key::V),
            'W' => KeyEvent::new(Key::W),
            'X' => KeyEvent::new(Key::X),
            'Y' => KeyEvent::new(Key::Y),
            'Z' => KeyEvent::new(Key::Z),
            '^' => KeyEvent::new(Key::Caret),
            _ => panic!("unsupported char {}", c),
        }
    }

    fn map_keycode(&self, keycode: Key) -> (usize, usize) {
        match keycode {
            // Row 0
            Key::Backspace => (0, 0),
            Key::Return => (0, 1),
            Key::CrsrRight => (0, 2),
            Key::F7 => (0, 3),
            Key::F1 => (0, 4),
            Key::F3 => (0, 5),
            Key::F5 => (0, 6),
            Key::CrsrDown => (0, 7),
            // Row 1
            Key::Num3 => (1, 0),
            Key::W => (1, 1),
            Key::A => (1, 2),
            Key::Num4 => (1, 3),
            Key::Z => (1, 4),
            Key::S => (1, 5),
            Key::E => (1, 6),
            Key::LShift => (1, 7),
            // Row 2
            Key::Num5 => (2, 0),
            Key::R => (2, 1),
            Key::D => (2, 2),
            Key::Num6 => (2, 3),
            Key::C => (2, 4),
            Key::F => (2, 5),
            Key::T => (2, 6),
            Key::X => (2, 7),
            // Row 3
            Key::Num7 => (3, 0),
            Key::Y => (3, 1),
            Key::G => (3, 2),
            Key::Num8 => (3, 3),
            Key::B => (3, 4),
            Key::H => (3, 5),
            Key::U => (3, 6),
            Key::V => (3, 7),
            // Row 4
            Key::Num9 => (4, 0),
            Key::I => (4, 1),
            Key::J => (4, 2),
            Key::Num0 => (4, 3),
            Key::M => (4, 4),
            Key::K => (4, 5),
            Key::O => (4, 6),
            Key::N => (4, 7),
            // Row 5
            Key::Plus => (5, 0),
            Key::P => (5, 1),
            Key::L => (5, 2),
            Key::Minus => (5, 3),
            Key::Period => (5, 4),
            Key::Colon => (5, 5),
            Key::At => (5, 6),
            Key::Comma => (5, 7),
            // Row 6
            Key::Dollar => (6, 0),
            Key::Asterisk => (6, 1),
            Key::Semicolon => (6, 2),
            Key::Home => (6, 3),
            Key::RShift => (6, 4),
            Key::Equals => (6, 5),
            Key::Caret => (6, 6),
            Key::Slash => (6, 7),
            // Row 7
            Key::Num1 => (7, 0),
            Key::Left => (7, 1),
            Key::Ctrl => (7, 2),
            Key::Num2 => (7, 3),
            Key::Space => (7, 4),
            Key::LGui => (7, 5),
            Key::Q => (7, 6),
            Key::RunStop => (7, 7),
            Key::Restore | Key::ShiftLock => panic!("key {:?} has no matrix position", keycode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_keyboard() -> Keyboard {
        let matrix = new_shared([0xff; 16]);
        let nmi_line = new_shared(IrqLine::new("nmi"));
        let mut keyboard = Keyboard::new(matrix, nmi_line);
        keyboard.reset();
        keyboard
    }

    #[test]
    fn key_press_updates_both_mirrors() {
        let mut keyboard = setup_keyboard();
        keyboard.set_key(Key::S, true);
        assert_eq!(0xdf, keyboard.get_row(1));
        assert_eq!(0xfd, keyboard.get_col(5));
    }

    #[test]
    fn restore_pulls_nmi() {
        let mut keyboard = setup_keyboard();
        keyboard.set_key(Key::Restore, true);
        assert_eq!(true, keyboard.nmi_line.borrow().is_low());
        keyboard.set_key(Key::Restore, false);
        assert_eq!(false, keyboard.nmi_line.borrow().is_low());
    }

    #[test]
    fn shift_lock_sticks() {
        let mut keyboard = setup_keyboard();
        keyboard.set_key(Key::ShiftLock, true);
        keyboard.release_all();
        assert_eq!(true, keyboard.is_pressed(Key::LShift));
        keyboard.set_key(Key::ShiftLock, false);
        assert_eq!(false, keyboard.is_pressed(Key::LShift));
    }

    #[test]
    fn autotype_waits_between_events() {
        let mut keyboard = setup_keyboard();
        keyboard.enqueue("S");
        keyboard.drain_events();
        assert_eq!(true, keyboard.is_pressed(Key::S));
        keyboard.drain_events();
        keyboard.drain_events();
        assert_eq!(false, keyboard.is_pressed(Key::S));
        keyboard.drain_events();
        assert_eq!(false, keyboard.has_events());
    }
}
