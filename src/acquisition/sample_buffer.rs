// src/acquisition/sample_buffer.rs
//! Bounded sample buffer shared by the acquisition loop and readers
//!
//! Rows are stored flat and row-major next to a parallel timestamp vector.
//! Storage for the full capacity is reserved when the buffer is created, so a
//! request the allocator cannot satisfy fails up front instead of in the
//! middle of a recording.

use crate::error::{BoardError, BoardResult};
use crate::hal::types::Sample;
use ndarray::Array2;
use parking_lot::Mutex;

/// Samples returned by a read, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct BoardData {
    width: usize,
    data: Vec<f32>,
    timestamps: Vec<f64>,
}

impl BoardData {
    pub fn empty(width: usize) -> Self {
        Self {
            width,
            data: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row-major `count × width` channel values
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Channel values of one row
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.count() {
            return None;
        }
        let start = index * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// `count × (width + 1)` table with the timestamp in the last column
    pub fn to_table(&self) -> Array2<f64> {
        let width = self.width;
        Array2::from_shape_fn((self.count(), width + 1), |(row, column)| {
            if column < width {
                self.data[row * width + column] as f64
            } else {
                self.timestamps[row]
            }
        })
    }
}

struct Ring {
    data: Vec<f32>,
    timestamps: Vec<f64>,
    /// Slot of the oldest retained sample
    head: usize,
    len: usize,
    sealed: bool,
}

impl Ring {
    fn slot(&self, index: usize, capacity: usize) -> usize {
        (self.head + index) % capacity
    }

    fn collect(&self, skip: usize, count: usize, width: usize, capacity: usize) -> BoardData {
        let mut data = Vec::with_capacity(count * width);
        let mut timestamps = Vec::with_capacity(count);
        for index in skip..skip + count {
            let slot = self.slot(index, capacity);
            data.extend_from_slice(&self.data[slot * width..(slot + 1) * width]);
            timestamps.push(self.timestamps[slot]);
        }
        BoardData {
            width,
            data,
            timestamps,
        }
    }

    fn clear(&mut self) {
        self.data.clear();
        self.timestamps.clear();
        self.head = 0;
        self.len = 0;
    }
}

/// Bounded FIFO of fixed-width samples; a push into a full buffer evicts the oldest
pub struct SampleBuffer {
    width: usize,
    capacity: usize,
    inner: Mutex<Ring>,
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("width", &self.width)
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .finish()
    }
}

impl SampleBuffer {
    /// Reserve room for `capacity` samples of `width` channels
    pub fn new(capacity: usize, width: usize) -> BoardResult<Self> {
        if capacity == 0 || width == 0 {
            return Err(BoardError::Allocation {
                requested: capacity,
                reason: "buffer capacity and width must be greater than 0".to_string(),
            });
        }
        let values = capacity.checked_mul(width).ok_or_else(|| BoardError::Allocation {
            requested: capacity,
            reason: "buffer size overflows".to_string(),
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(values).map_err(|err| BoardError::Allocation {
            requested: capacity,
            reason: err.to_string(),
        })?;
        let mut timestamps = Vec::new();
        timestamps.try_reserve_exact(capacity).map_err(|err| BoardError::Allocation {
            requested: capacity,
            reason: err.to_string(),
        })?;

        Ok(Self {
            width,
            capacity,
            inner: Mutex::new(Ring {
                data,
                timestamps,
                head: 0,
                len: 0,
                sealed: false,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Append a sample; returns false if it was discarded
    ///
    /// Samples are discarded once the buffer is sealed or when their width
    /// does not match the buffer.
    pub fn push(&self, sample: &Sample) -> bool {
        if sample.width() != self.width {
            return false;
        }
        let mut ring = self.inner.lock();
        if ring.sealed {
            return false;
        }

        let width = self.width;
        if ring.len == self.capacity {
            let slot = ring.head;
            ring.data[slot * width..(slot + 1) * width].copy_from_slice(sample.channels());
            ring.timestamps[slot] = sample.timestamp();
            ring.head = (ring.head + 1) % self.capacity;
            return true;
        }

        let slot = ring.slot(ring.len, self.capacity);
        if slot == ring.timestamps.len() {
            ring.data.extend_from_slice(sample.channels());
            ring.timestamps.push(sample.timestamp());
        } else {
            ring.data[slot * width..(slot + 1) * width].copy_from_slice(sample.channels());
            ring.timestamps[slot] = sample.timestamp();
        }
        ring.len += 1;
        true
    }

    pub fn count(&self) -> usize {
        self.inner.lock().len
    }

    /// Up to `n` most recent samples, oldest first; the buffer is left intact
    pub fn drain_latest(&self, n: usize) -> BoardData {
        let ring = self.inner.lock();
        let count = n.min(ring.len);
        ring.collect(ring.len - count, count, self.width, self.capacity)
    }

    /// Every retained sample, oldest first; the buffer is emptied
    pub fn drain_all(&self) -> BoardData {
        let mut ring = self.inner.lock();
        let all = ring.collect(0, ring.len, self.width, self.capacity);
        ring.clear();
        all
    }

    /// Remove and return up to `max` of the oldest samples
    pub fn drain_oldest(&self, max: usize) -> BoardData {
        let mut ring = self.inner.lock();
        let count = max.min(ring.len);
        let oldest = ring.collect(0, count, self.width, self.capacity);
        if count == ring.len {
            ring.clear();
        } else {
            ring.head = ring.slot(count, self.capacity);
            ring.len -= count;
        }
        oldest
    }

    /// Discard every later push
    pub fn seal(&self) {
        self.inner.lock().sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn sample(value: f32, width: usize) -> Sample {
        Sample::new(vec![value; width], value as f64)
    }

    fn filled(capacity: usize, pushes: usize) -> SampleBuffer {
        let buffer = SampleBuffer::new(capacity, 2).unwrap();
        for i in 0..pushes {
            assert!(buffer.push(&sample(i as f32, 2)));
        }
        buffer
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(matches!(SampleBuffer::new(0, 8), Err(BoardError::Allocation { .. })));
        assert!(matches!(SampleBuffer::new(8, 0), Err(BoardError::Allocation { .. })));
        assert!(matches!(
            SampleBuffer::new(usize::MAX, 8),
            Err(BoardError::Allocation { .. })
        ));
    }

    #[test]
    fn test_empty_buffer_reads() {
        let buffer = SampleBuffer::new(4, 3).unwrap();
        assert_eq!(buffer.count(), 0);
        assert!(buffer.drain_latest(10).is_empty());
        assert!(buffer.drain_all().is_empty());
        assert!(buffer.drain_oldest(10).is_empty());
        assert_eq!(buffer.drain_all().width(), 3);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let buffer = filled(3, 5);
        assert_eq!(buffer.count(), 3);
        let all = buffer.drain_all();
        assert_eq!(all.timestamps(), &[2.0, 3.0, 4.0]);
        assert_eq!(all.row(0), Some(&[2.0f32, 2.0][..]));
        assert_eq!(all.row(3), None);
    }

    #[test]
    fn test_drain_latest_is_non_destructive() {
        let buffer = filled(10, 6);

        let latest = buffer.drain_latest(2);
        assert_eq!(latest.timestamps(), &[4.0, 5.0]);
        assert_eq!(latest.data(), &[4.0, 4.0, 5.0, 5.0]);
        assert_eq!(buffer.count(), 6);

        assert!(buffer.drain_latest(0).is_empty());
        assert_eq!(buffer.drain_latest(100).count(), 6);
    }

    #[test]
    fn test_drain_all_empties() {
        let buffer = filled(4, 3);
        assert_eq!(buffer.drain_all().count(), 3);
        assert_eq!(buffer.count(), 0);
        assert!(buffer.drain_all().is_empty());

        buffer.push(&sample(9.0, 2));
        assert_eq!(buffer.drain_all().timestamps(), &[9.0]);
    }

    #[test]
    fn test_drain_oldest_then_push_wraps() {
        let buffer = filled(4, 4);
        assert_eq!(buffer.drain_oldest(3).timestamps(), &[0.0, 1.0, 2.0]);
        assert_eq!(buffer.count(), 1);

        for value in [10.0, 11.0, 12.0, 13.0] {
            buffer.push(&sample(value, 2));
        }
        assert_eq!(buffer.count(), 4);
        assert_eq!(buffer.drain_all().timestamps(), &[10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_sealed_buffer_discards_pushes() {
        let buffer = filled(4, 2);
        buffer.seal();
        assert!(buffer.is_sealed());
        assert!(!buffer.push(&sample(7.0, 2)));
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.drain_latest(1).timestamps(), &[1.0]);
    }

    #[test]
    fn test_width_mismatch_discarded() {
        let buffer = SampleBuffer::new(4, 2).unwrap();
        assert!(!buffer.push(&sample(1.0, 3)));
        assert_eq!(buffer.count(), 0);
    }

    #[test]
    fn test_table_layout() {
        let buffer = SampleBuffer::new(4, 2).unwrap();
        buffer.push(&Sample::new(vec![1.0, 2.0], 100.5));
        buffer.push(&Sample::new(vec![3.0, 4.0], 100.75));

        let table = buffer.drain_latest(2).to_table();
        assert_eq!(table.shape(), &[2, 3]);
        assert_eq!(table[[0, 0]], 1.0);
        assert_eq!(table[[1, 1]], 4.0);
        assert_eq!(table[[1, 2]], 100.75);
    }

    #[test]
    fn test_concurrent_drain_all_partitions() {
        let buffer = Arc::new(SampleBuffer::new(100_000, 1).unwrap());
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..20_000 {
                    buffer.push(&Sample::new(vec![i as f32], i as f64));
                }
            })
        };
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..200 {
                        seen.extend_from_slice(buffer.drain_all().timestamps());
                    }
                    seen
                })
            })
            .collect();

        producer.join().unwrap();
        let mut seen: Vec<f64> = readers.into_iter().flat_map(|r| r.join().unwrap()).collect();
        seen.extend_from_slice(buffer.drain_all().timestamps());

        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..20_000).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    proptest! {
        #[test]
        fn prop_retains_newest_in_order(capacity in 1usize..64, pushes in 0usize..256) {
            let buffer = filled(capacity, pushes);
            let retained = pushes.min(capacity);
            prop_assert_eq!(buffer.count(), retained);

            let expected: Vec<f64> = (pushes - retained..pushes).map(|i| i as f64).collect();
            let latest = buffer.drain_latest(retained);
            prop_assert_eq!(latest.timestamps(), expected.as_slice());
        }

        #[test]
        fn prop_last_k_round_trip(k in 0usize..32, pushes in 0usize..128) {
            let buffer = filled(128, pushes);
            let latest = buffer.drain_latest(k);
            let taken = k.min(pushes);
            prop_assert_eq!(latest.count(), taken);
            for (row, i) in (pushes - taken..pushes).enumerate() {
                prop_assert_eq!(latest.row(row), Some(&[i as f32, i as f32][..]));
            }
        }
    }
}
