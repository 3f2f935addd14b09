//! Buffer management for streaming audio.

use crate::sample::Sample;
use parking_lot::RwLock;

/// A fixed-length rolling window of the most recent samples.
///
/// The window always holds exactly `capacity` samples (initially silence).
/// Every [`push`](Self::push) evicts the oldest sample. Readers get the
/// window oldest-first through [`snapshot`](Self::snapshot) or
/// [`snapshot_into`](Self::snapshot_into), and always see the window as it
/// was either before or after any concurrent push, never a mix.
///
/// Internally this is a ring with a head index guarded by a read-write lock:
/// a push writes one slot, a snapshot copies the two halves of the ring.
pub struct RollingBuffer {
    ring: RwLock<Ring>,
    capacity: usize,
}

struct Ring {
    data: Box<[f32]>,
    /// Slot holding the oldest sample, which is also the next slot written.
    head: usize,
    total_pushed: u64,
}

impl RollingBuffer {
    /// Create a window of `capacity` samples, all silent.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`StreamerConfig::validate`] rejects
    /// that value before a buffer is ever built from configuration.
    ///
    /// [`StreamerConfig::validate`]: crate::config::StreamerConfig::validate
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "rolling buffer capacity must be > 0");
        Self {
            ring: RwLock::new(Ring {
                data: vec![0.0; capacity].into_boxed_slice(),
                head: 0,
                total_pushed: 0,
            }),
            capacity,
        }
    }

    /// Append one sample, evicting the oldest.
    pub fn push(&self, sample: Sample) {
        let mut ring = self.ring.write();
        let head = ring.head;
        ring.data[head] = sample.value();
        ring.head = (head + 1) % self.capacity;
        ring.total_pushed += 1;
    }

    /// Copy the current window, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        let ring = self.ring.read();
        let (newer, older) = ring.data.split_at(ring.head);
        older
            .iter()
            .chain(newer.iter())
            .map(|&v| Sample::new(v))
            .collect()
    }

    /// Copy the current window into `out`, oldest first, reusing its allocation.
    ///
    /// `out` is cleared first and holds exactly `capacity` values afterwards.
    pub fn snapshot_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.capacity);
        let ring = self.ring.read();
        let (newer, older) = ring.data.split_at(ring.head);
        out.extend_from_slice(older);
        out.extend_from_slice(newer);
    }

    /// The most recently pushed sample, or silence before the first push.
    pub fn latest(&self) -> Sample {
        let ring = self.ring.read();
        let idx = (ring.head + self.capacity - 1) % self.capacity;
        Sample::new(ring.data[idx])
    }

    /// Number of samples in the window. Always equal to the capacity.
    pub const fn len(&self) -> usize {
        self.capacity
    }

    /// Always `false`; a rolling window is never empty.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Get buffer statistics.
    pub fn stats(&self) -> BufferStats {
        let ring = self.ring.read();
        BufferStats {
            capacity: self.capacity,
            total_pushed: ring.total_pushed,
            evicted: ring.total_pushed.saturating_sub(self.capacity as u64),
        }
    }
}

impl std::fmt::Debug for RollingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingBuffer")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about buffer usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Window length in samples
    pub capacity: usize,
    /// Samples pushed since creation
    pub total_pushed: u64,
    /// Samples that have fallen out of the window
    pub evicted: u64,
}
