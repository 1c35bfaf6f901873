//! Buffer Pool
//!
//! Reuses fixed-length result buffers so repeated applies do not allocate.

use serde::Serialize;

/// Pool usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buffers handed out
    pub acquired: usize,
    /// Buffers given back
    pub released: usize,
    /// Buffers that had to be newly allocated
    pub created: usize,
    /// Peak number of buffers out at once
    pub peak_outstanding: usize,
}

impl PoolStats {
    /// Buffers currently handed out
    ///
    /// Buffers the pool never handed out may be released too, so this
    /// saturates at zero.
    pub fn outstanding(&self) -> usize {
        self.acquired.saturating_sub(self.released)
    }
}

/// Pool of reusable `Vec<T>` buffers
#[derive(Debug)]
pub struct ArrayPool<T> {
    free_list: Vec<Vec<T>>,
    stats: PoolStats,
}

impl<T: Clone> ArrayPool<T> {
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    /// Get a buffer of exactly `len` elements, each set to `fill`
    pub fn acquire(&mut self, len: usize, fill: T) -> Vec<T> {
        let mut buffer = match self.free_list.pop() {
            Some(buffer) => buffer,
            None => {
                self.stats.created += 1;
                Vec::with_capacity(len)
            }
        };
        buffer.clear();
        buffer.resize(len, fill);

        self.stats.acquired += 1;
        self.stats.peak_outstanding = self.stats.peak_outstanding.max(self.stats.outstanding());
        buffer
    }

    /// Give a buffer back. Its contents are dropped.
    pub fn release(&mut self, mut buffer: Vec<T>) {
        buffer.clear();
        self.free_list.push(buffer);
        self.stats.released += 1;
    }

    /// Buffers waiting for reuse
    pub fn available(&self) -> usize {
        self.free_list.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

impl<T: Clone> Default for ArrayPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
