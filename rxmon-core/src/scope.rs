//! Decimated snapshot of the conditioned input for the signal display.
//!
//! Append-only until full, then frozen until the display side drains it.
//! Only every `stride`-th sample is recorded, so the buffer spans a useful
//! time window at trivial cost. Shares the session mutex; not part of the
//! latency-critical path.

/// Bounded, decimated capture of recent conditioned samples.
pub struct ScopeBuffer {
    samples: Vec<f32>,
    capacity: usize,
    stride: usize,
    tick: usize,
}

impl ScopeBuffer {
    pub fn new(capacity: usize, stride: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            stride: stride.max(1),
            tick: 0,
        }
    }

    /// Offer one conditioned sample; records it only on the decimation
    /// stride and only while there is room. Allocation-free (capacity is
    /// reserved up front).
    #[inline]
    pub fn record(&mut self, sample: f32) {
        let take = self.tick == 0;
        self.tick = (self.tick + 1) % self.stride;
        if take && self.samples.len() < self.capacity {
            self.samples.push(sample);
        }
    }

    /// Drain the snapshot for display; the buffer starts filling again
    /// immediately after.
    pub fn take(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
