// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::collections::VecDeque;
use std::sync::Mutex;

use oxide64_core::factory::SoundOutput;

pub struct SoundBuffer {
    buffer: Mutex<VecDeque<i16>>,
    capacity: usize,
}

impl SoundBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn drain(&self, out: &mut [i16]) -> usize {
        let mut buffer = self.buffer.lock().unwrap();
        let count = out.len().min(buffer.len());
        for sample in out.iter_mut().take(count) {
            *sample = buffer.pop_front().unwrap_or(0);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().unwrap().is_empty()
    }
}

impl SoundOutput for SoundBuffer {
    fn reset(&self) {
        self.buffer.lock().unwrap().clear();
    }

    fn write(&self, samples: &[i16]) {
        let mut buffer = self.buffer.lock().unwrap();
        for sample in samples {
            if buffer.len() == self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(*sample);
        }
    }
}
