//! Transfer counters shared by both halves of a pipe.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a pipe's transfer counters.
///
/// `bytes_read` never exceeds `bytes_written`. For a file-backed pipe,
/// `bytes_written` starts at the size the file had when it was opened, since
/// those bytes are read first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeStats {
    /// Total bytes made readable: accepted by the writer, plus any content
    /// the backing file already held.
    pub bytes_written: u64,
    /// Total bytes handed to the reader.
    pub bytes_read: u64,
    /// Number of successful non-empty writes.
    pub chunks_written: u64,
    /// Number of observer invocations.
    pub notifications: u64,
}

impl PipeStats {
    /// Bytes written but not yet read.
    ///
    /// Includes bytes discarded by closing the reader.
    pub fn pending(&self) -> u64 {
        self.bytes_written.saturating_sub(self.bytes_read)
    }
}

#[derive(Debug, Default)]
pub(crate) struct PipeCounters {
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    chunks_written: AtomicU64,
    notifications: AtomicU64,
}

impl PipeCounters {
    /// Counters for a pipe that starts with `existing` readable bytes.
    pub fn with_written(existing: u64) -> Self {
        Self {
            bytes_written: AtomicU64::new(existing),
            ..Self::default()
        }
    }

    /// Counts bytes as they become visible to the reader.
    pub fn record_written(&self, len: usize) {
        self.bytes_written.fetch_add(len as u64, Ordering::SeqCst);
    }

    pub fn record_chunk(&self) {
        self.chunks_written.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_read(&self, len: usize) {
        self.bytes_read.fetch_add(len as u64, Ordering::SeqCst);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> PipeStats {
        // Read side first so a concurrent transfer can't make read > written.
        let bytes_read = self.bytes_read.load(Ordering::SeqCst);
        PipeStats {
            bytes_written: self.bytes_written.load(Ordering::SeqCst),
            bytes_read,
            chunks_written: self.chunks_written.load(Ordering::SeqCst),
            notifications: self.notifications.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_stats_default() {
        let stats = PipeStats::default();
        assert_eq!(stats.bytes_written, 0);
        assert_eq!(stats.bytes_read, 0);
        assert_eq!(stats.pending(), 0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = PipeCounters::default();
        counters.record_written(4);
        counters.record_chunk();
        counters.record_written(2);
        counters.record_chunk();
        counters.record_read(3);
        counters.record_notification();

        let stats = counters.snapshot();
        assert_eq!(stats.bytes_written, 6);
        assert_eq!(stats.chunks_written, 2);
        assert_eq!(stats.bytes_read, 3);
        assert_eq!(stats.notifications, 1);
        assert_eq!(stats.pending(), 3);
    }

    #[test]
    fn test_counters_with_existing_bytes() {
        let counters = PipeCounters::with_written(10);
        counters.record_written(1);
        counters.record_read(11);

        let stats = counters.snapshot();
        assert_eq!(stats.bytes_written, 11);
        assert_eq!(stats.bytes_read, 11);
        assert_eq!(stats.chunks_written, 0);
        assert_eq!(stats.pending(), 0);
    }
}
