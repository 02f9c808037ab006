//! Bounded in-memory transport.
//!
//! A `ringbuf` heap ring guarded by one mutex, with two condition variables
//! parking the producer while the ring is full and the consumer while it is
//! empty.

use parking_lot::{Condvar, Mutex};
use ringbuf::traits::{Consumer, Observer as _, Producer};
use ringbuf::HeapRb;

use crate::stats::PipeCounters;
use crate::PipeError;

struct RingState {
    ring: HeapRb<u8>,
    writer_closed: bool,
    reader_closed: bool,
}

/// Ring storage shared by the writer and reader of an in-memory pipe.
pub(crate) struct MemoryChannel {
    capacity: usize,
    state: Mutex<RingState>,
    readable: Condvar,
    writable: Condvar,
}

impl MemoryChannel {
    /// Creates a channel holding at most `capacity` unread bytes.
    pub fn new(capacity: usize) -> Result<Self, PipeError> {
        if capacity == 0 {
            return Err(PipeError::InvalidCapacity);
        }
        Ok(Self {
            capacity,
            state: Mutex::new(RingState {
                ring: HeapRb::new(capacity),
                writer_closed: false,
                reader_closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
        })
    }

    /// Pushes all of `data`, parking while the ring lacks room.
    ///
    /// Data that fits in the ring is pushed in one piece once enough space is
    /// free, so a write broken while parked leaves nothing behind. Larger data
    /// is fed through as space frees up; the reader may drain a prefix of it
    /// before a reader close breaks the call.
    pub fn write(&self, data: &[u8], counters: &PipeCounters) -> Result<(), PipeError> {
        let whole = data.len() <= self.capacity;
        let mut state = self.state.lock();
        let mut remaining = data;

        while !remaining.is_empty() {
            if state.reader_closed {
                return Err(PipeError::BrokenPipe);
            }

            let vacant = state.ring.vacant_len();
            if vacant == 0 || (whole && vacant < remaining.len()) {
                self.writable.wait(&mut state);
                continue;
            }

            let pushed = state.ring.push_slice(remaining);
            counters.record_written(pushed);
            remaining = &remaining[pushed..];
            self.readable.notify_one();
        }

        Ok(())
    }

    /// Pops up to `buf.len()` bytes, parking while the ring is empty.
    ///
    /// Returns `None` once the writer is gone and the ring is drained.
    pub fn read(&self, buf: &mut [u8], counters: &PipeCounters) -> Result<Option<usize>, PipeError> {
        let mut state = self.state.lock();

        loop {
            if state.reader_closed {
                return Err(PipeError::Closed);
            }

            let popped = state.ring.pop_slice(buf);
            if popped > 0 {
                counters.record_read(popped);
                self.writable.notify_one();
                return Ok(Some(popped));
            }

            if state.writer_closed {
                return Ok(None);
            }

            self.readable.wait(&mut state);
        }
    }

    /// Bytes readable without parking.
    pub fn available(&self) -> usize {
        self.state.lock().ring.occupied_len()
    }

    pub fn close_writer(&self) {
        let mut state = self.state.lock();
        state.writer_closed = true;
        self.readable.notify_all();
    }

    /// Closes the reader end, discarding unread bytes.
    ///
    /// Returns the number of bytes discarded, or `None` if already closed.
    pub fn close_reader(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if state.reader_closed {
            return None;
        }
        state.reader_closed = true;
        let discarded = state.ring.clear();

        self.writable.notify_all();
        self.readable.notify_all();
        Some(discarded)
    }

    pub fn is_reader_closed(&self) -> bool {
        self.state.lock().reader_closed
    }
}
