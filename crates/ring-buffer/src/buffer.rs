//! Ring Buffer Implementation

use crate::CapturedFrame;

/// Default buffer capacity (32 frames)
pub const DEFAULT_CAPACITY: usize = 32;

/// Fixed-capacity circular frame store that overwrites the oldest frame when full
///
/// Chronological order runs from `tail` to `head - 1`. Once full, every push
/// advances both indices and counts one overrun.
#[derive(Debug, Clone)]
pub struct FrameRingBuffer<const N: usize = DEFAULT_CAPACITY> {
    /// Pre-allocated storage
    storage: [CapturedFrame; N],
    /// Next write position
    head: usize,
    /// Oldest valid position
    tail: usize,
    /// Number of valid frames
    count: usize,
    /// Frames discarded because the buffer was full
    overruns: u32,
}

impl<const N: usize> FrameRingBuffer<N> {
    /// Create an empty buffer
    pub fn new() -> Self {
        assert!(N > 0, "ring buffer capacity must be non-zero");
        Self {
            storage: [CapturedFrame::default(); N],
            head: 0,
            tail: 0,
            count: 0,
            overruns: 0,
        }
    }

    /// Push a frame, overwriting the oldest one if the buffer is full
    pub fn push(&mut self, frame: CapturedFrame) {
        self.storage[self.head] = frame;
        self.head = (self.head + 1) % N;

        if self.count < N {
            self.count += 1;
        } else {
            self.tail = (self.tail + 1) % N;
            self.overruns = self.overruns.saturating_add(1);
        }
    }

    /// Copy out the most recent `max_count` frames, oldest first
    pub fn snapshot(&self, max_count: usize) -> Vec<CapturedFrame> {
        let window = max_count.min(self.count);
        let start = (self.head + N - window) % N;

        (0..window)
            .map(|i| self.storage[(start + i) % N])
            .collect()
    }

    /// Oldest retained frame
    pub fn oldest(&self) -> Option<&CapturedFrame> {
        (self.count > 0).then(|| &self.storage[self.tail])
    }

    /// Most recently pushed frame
    pub fn newest(&self) -> Option<&CapturedFrame> {
        (self.count > 0).then(|| &self.storage[(self.head + N - 1) % N])
    }

    /// Get the number of frames currently in the buffer
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        N
    }

    /// Frames overwritten before they were read out
    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}

impl<const N: usize> Default for FrameRingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
