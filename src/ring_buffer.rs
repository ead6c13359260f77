//! Fixed-capacity circular history.
//!
//! Every slot always holds a value: the buffer is filled at construction
//! and writing a new element overwrites the oldest one in the same step.
//! Offsets are logical, `0` being the newest element.

use crate::error::{invalid, Result, SpectrumError};

#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    values: Vec<T>,
    /// Slot that the next `add` writes to (holds the oldest element).
    marker: usize,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Creates a buffer of `capacity` default values.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_value(capacity, T::default())
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Creates a buffer of `capacity` copies of `value`.
    pub fn with_value(capacity: usize, value: T) -> Result<Self> {
        if capacity == 0 {
            return Err(invalid("ring buffer capacity must be positive"));
        }
        Ok(Self {
            values: vec![value; capacity],
            marker: 0,
        })
    }

    /// Resets the write marker and overwrites every slot with `value`.
    pub fn clear(&mut self, value: T) {
        self.marker = 0;
        for slot in &mut self.values {
            *slot = value.clone();
        }
    }
}

impl<T> RingBuffer<T> {
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Writes `value` over the oldest element and returns the evicted one.
    pub fn add(&mut self, value: T) -> T {
        let evicted = std::mem::replace(&mut self.values[self.marker], value);
        self.marker += 1;
        if self.marker == self.values.len() {
            self.marker = 0;
        }
        evicted
    }

    /// Most recently added element.
    pub fn front(&self) -> &T {
        &self.values[self.slot(0)]
    }

    /// Oldest surviving element.
    pub fn back(&self) -> &T {
        &self.values[self.marker]
    }

    /// Element `offset` steps back in time from the newest one.
    pub fn element_at(&self, offset: isize) -> Result<&T> {
        let len = self.values.len();
        if offset < 0 || offset as usize >= len {
            return Err(SpectrumError::OutOfRange { index: offset, len });
        }
        Ok(&self.values[self.slot(offset as usize)])
    }

    /// Iterates newest to oldest. The iterator is double ended, so
    /// `.rev()` walks oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            front: 0,
            back: self.values.len(),
        }
    }

    fn slot(&self, offset: usize) -> usize {
        let len = self.values.len();
        (self.marker + len - 1 - offset) % len
    }
}

pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let item = &self.buffer.values[self.buffer.slot(self.front)];
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(&self.buffer.values[self.buffer.slot(self.back)])
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
