//! Fixed-size circular buffer used by the smoothing stages.
//!
//! The write cursor walks backwards so the newest sample is always at
//! offset 0 when reading forward from the cursor.

use std::iter::Sum;

#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    slots: [T; N],
    head: usize,
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        Self {
            slots: [T::default(); N],
            head: 0,
        }
    }

    /// Stores `value` as the newest sample, overwriting the oldest.
    pub fn push(&mut self, value: T) {
        self.head = (self.head + N - 1) % N;
        self.slots[self.head] = value;
    }

    /// Iterates the `count` most recent samples, newest first.
    ///
    /// `count` is capped at the capacity. Slots never written read as
    /// `T::default()`.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = T> + '_ {
        let count = count.min(N);
        (0..count).map(move |offset| self.slots[(self.head + offset) % N])
    }

    pub fn newest(&self) -> T {
        self.slots[self.head]
    }

    pub fn clear(&mut self) {
        self.slots = [T::default(); N];
        self.head = 0;
    }
}

impl<T, const N: usize> RingBuffer<T, N>
where
    T: Copy + Default + Sum<T> + std::ops::Div<f32, Output = T>,
{
    /// Mean of the `count` most recent samples (at least one).
    pub fn mean_of_recent(&self, count: usize) -> T {
        let count = count.clamp(1, N);
        self.recent(count).sum::<T>() / count as f32
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_order() {
        let mut buf: RingBuffer<f32, 4> = RingBuffer::new();
        buf.push(1.0);
        buf.push(2.0);
        buf.push(3.0);
        let recent: Vec<f32> = buf.recent(3).collect();
        assert_eq!(recent, vec![3.0, 2.0, 1.0]);
        assert_eq!(buf.newest(), 3.0);
    }

    #[test]
    fn test_overwrites_oldest() {
        let mut buf: RingBuffer<f32, 3> = RingBuffer::new();
        for v in 1..=5 {
            buf.push(v as f32);
        }
        let recent: Vec<f32> = buf.recent(10).collect();
        assert_eq!(recent, vec![5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_mean_counts_unwritten_slots_as_zero() {
        let mut buf: RingBuffer<f32, 8> = RingBuffer::new();
        buf.push(8.0);
        assert_eq!(buf.mean_of_recent(8), 1.0);
        assert_eq!(buf.mean_of_recent(1), 8.0);
        assert_eq!(buf.mean_of_recent(0), 8.0);
    }

    #[test]
    fn test_clear() {
        let mut buf: RingBuffer<f32, 2> = RingBuffer::new();
        buf.push(4.0);
        buf.clear();
        assert_eq!(buf.mean_of_recent(2), 0.0);
    }
}
