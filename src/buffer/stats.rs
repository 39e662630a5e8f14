//! Buffer pool access statistics.

/// Monotone counters over the pool's lifetime, readable via
/// [`BufferPool::stats`](super::BufferPool::stats).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Page lookups: one per `fetch_page` call plus one per frame a
    /// `flush_file` scan inspects on behalf of its file.
    pub accesses: u64,
    /// Pages read from a pager into a frame.
    pub disk_reads: u64,
    /// Pages written back to a pager (eviction, flush, shutdown).
    pub disk_writes: u64,
}

impl std::fmt::Display for BufferStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accesses={} disk_reads={} disk_writes={}",
            self.accesses, self.disk_reads, self.disk_writes
        )
    }
}
