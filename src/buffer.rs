//! Bounded drop-oldest buffer for decoded readings.
//!
//! Capacity is fixed at 20 samples. When the producer outpaces the consumer
//! the oldest unread readings are evicted, favoring freshness over
//! completeness. Both operations are O(1) and infallible; the driver wraps
//! the buffer in a mutex held only for the push or pop itself.

use std::collections::VecDeque;

use crate::registers::SensorReading;

/// Fixed-capacity FIFO of decoded readings with drop-oldest overflow.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: VecDeque<SensorReading>,
}

impl SampleBuffer {
    /// Maximum number of buffered readings.
    pub const CAPACITY: usize = 20;

    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(Self::CAPACITY),
        }
    }

    /// Append a reading, evicting the oldest one first when full.
    pub fn push(&mut self, reading: SensorReading) {
        if self.samples.len() == Self::CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(reading);
    }

    /// Remove and return the oldest reading, or `None` when empty.
    pub fn pop_oldest(&mut self) -> Option<SensorReading> {
        self.samples.pop_front()
    }

    /// Number of buffered readings.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no readings.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
