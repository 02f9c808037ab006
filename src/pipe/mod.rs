//! The buffered pipe and its two halves.
//!
//! ```text
//! capture thread → PipeWriter → [ring | file] → PipeReader → encoder thread
//!                      │
//!                      └→ Observer (copy of each chunk)
//! ```
//!
//! A [`BufferedPipe`] is built once per recording session and split into a
//! [`PipeWriter`] and a [`PipeReader`]. Each half is the only handle to its
//! end, so a pipe has exactly one producer and one consumer.

mod file;
mod memory;

use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::config::{PipeConfig, PipeMode, DEFAULT_PIPE_CAPACITY};
use crate::error::chunk_range;
use crate::observer::{Observer, ObserverSlot};
use crate::stats::{PipeCounters, PipeStats};
use crate::{PipeBuilder, PipeError};

use file::{FileChannel, FileReader, FileWriter};
use memory::MemoryChannel;

enum WriterTransport {
    Memory(Arc<MemoryChannel>),
    File {
        channel: Arc<FileChannel>,
        file: FileWriter,
    },
}

enum ReaderTransport {
    Memory(Arc<MemoryChannel>),
    File {
        channel: Arc<FileChannel>,
        file: FileReader,
    },
}

#[derive(Clone)]
enum SharedChannel {
    Memory(Arc<MemoryChannel>),
    File(Arc<FileChannel>),
}

impl SharedChannel {
    /// Closes the reader end. Returns `false` if it was already closed.
    fn close_reader(&self) -> bool {
        match self {
            Self::Memory(channel) => match channel.close_reader() {
                Some(discarded) => {
                    tracing::debug!(discarded, "pipe reader closed");
                    true
                }
                None => false,
            },
            Self::File(channel) => {
                let closed = channel.close_reader();
                if closed {
                    tracing::debug!(path = %channel.path().display(), "pipe reader closed");
                }
                closed
            }
        }
    }

    fn is_reader_closed(&self) -> bool {
        match self {
            Self::Memory(channel) => channel.is_reader_closed(),
            Self::File(channel) => channel.is_reader_closed(),
        }
    }
}

/// A blocking byte pipe with one writer, one reader and an observer tap.
///
/// # Example
///
/// ```
/// use piped_buffer::{observer, BufferedPipe};
/// use std::thread;
///
/// let pipe = BufferedPipe::with_capacity(4).unwrap();
/// pipe.set_observer(Some(observer(|chunk| println!("tap: {chunk:?}"))));
/// let (mut writer, mut reader) = pipe.split();
///
/// let producer = thread::spawn(move || {
///     writer.write_bytes(&[1, 2, 3, 4, 5, 6]).unwrap();
///     // Dropping the writer signals end-of-stream.
/// });
///
/// let mut out = Vec::new();
/// while let Some(byte) = reader.read_byte().unwrap() {
///     out.push(byte);
/// }
/// producer.join().unwrap();
/// assert_eq!(out, [1, 2, 3, 4, 5, 6]);
/// ```
pub struct BufferedPipe {
    mode: PipeMode,
    writer: PipeWriter,
    reader: PipeReader,
}

impl BufferedPipe {
    /// Creates an in-memory pipe with [`DEFAULT_PIPE_CAPACITY`].
    pub fn new() -> Result<Self, PipeError> {
        Self::with_capacity(DEFAULT_PIPE_CAPACITY)
    }

    /// Creates an in-memory pipe buffering at most `capacity` bytes.
    ///
    /// Fails with [`PipeError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, PipeError> {
        let channel = Arc::new(MemoryChannel::new(capacity)?);
        let counters = Arc::new(PipeCounters::default());

        tracing::debug!(capacity, "created in-memory pipe");

        Ok(Self::assemble(
            PipeMode::Memory { capacity },
            WriterTransport::Memory(channel.clone()),
            ReaderTransport::Memory(channel),
            counters,
        ))
    }

    /// Creates a pipe backed by the file at `path`.
    ///
    /// The file is opened for append and, separately, for reading from its
    /// start. It is created if missing; existing content is kept and will be
    /// read first. Fails with [`PipeError::Open`] if either open fails.
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self, PipeError> {
        let path = path.as_ref();
        let (channel, write_file, read_file) = file::open(path)?;
        let existing = channel.readable_len();
        let channel = Arc::new(channel);
        let counters = Arc::new(PipeCounters::with_written(existing));

        tracing::debug!(path = %path.display(), existing, "created file-backed pipe");

        Ok(Self::assemble(
            PipeMode::File {
                path: path.to_path_buf(),
            },
            WriterTransport::File {
                channel: channel.clone(),
                file: write_file,
            },
            ReaderTransport::File {
                channel,
                file: read_file,
            },
            counters,
        ))
    }

    /// Creates a pipe from a [`PipeConfig`].
    pub fn from_config(config: &PipeConfig) -> Result<Self, PipeError> {
        match &config.mode {
            PipeMode::Memory { capacity } => Self::with_capacity(*capacity),
            PipeMode::File { path } => Self::with_file(path),
        }
    }

    /// Returns a builder for configuring a pipe.
    pub fn builder() -> PipeBuilder {
        PipeBuilder::new()
    }

    fn assemble(
        mode: PipeMode,
        writer: WriterTransport,
        reader: ReaderTransport,
        counters: Arc<PipeCounters>,
    ) -> Self {
        Self {
            mode,
            writer: PipeWriter {
                transport: writer,
                observer: ObserverSlot::new(),
                counters: counters.clone(),
            },
            reader: PipeReader {
                transport: reader,
                counters,
            },
        }
    }

    /// Returns the backing storage of this pipe.
    pub fn mode(&self) -> &PipeMode {
        &self.mode
    }

    /// Replaces the observer. `None` removes it.
    pub fn set_observer(&self, observer: Option<Observer>) {
        self.writer.set_observer(observer);
    }

    /// Returns a handle to the observer slot.
    ///
    /// The handle stays valid after [`split`](Self::split) and can swap the
    /// observer from any thread while the writer is in use.
    pub fn observer_slot(&self) -> ObserverSlot {
        self.writer.observer.clone()
    }

    /// Returns a snapshot of the transfer counters.
    pub fn stats(&self) -> PipeStats {
        self.writer.stats()
    }

    /// Splits the pipe into its writer and reader halves.
    pub fn split(self) -> (PipeWriter, PipeReader) {
        tracing::debug!(mode = ?self.mode, "split pipe");
        (self.writer, self.reader)
    }
}

impl std::fmt::Debug for BufferedPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedPipe")
            .field("mode", &self.mode)
            .field("observer", &self.writer.observer)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Producer half of a [`BufferedPipe`].
///
/// Dropping the writer (or calling [`close`](Self::close)) tells the reader
/// that no more bytes will come: it drains what is buffered and then sees
/// end-of-stream.
pub struct PipeWriter {
    transport: WriterTransport,
    observer: ObserverSlot,
    counters: Arc<PipeCounters>,
}

impl PipeWriter {
    /// Writes a single byte.
    ///
    /// Blocks while an in-memory pipe is full. Notifies the observer with a
    /// one-byte chunk.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), PipeError> {
        self.write_chunk(&[byte], 0, 1)
    }

    /// Writes `buf[offset..offset + len]`.
    ///
    /// Bytes arrive at the reader in order and are never interleaved with
    /// another write. In memory, a chunk that fits the ring waits for room
    /// for all of it. Blocks until every byte is accepted, then notifies the
    /// observer once with a copy of exactly those bytes. A zero-length call
    /// does nothing.
    ///
    /// # Errors
    ///
    /// - [`PipeError::InvalidArgument`] if the range is outside `buf`
    /// - [`PipeError::BrokenPipe`] if the reader end is closed, including
    ///   while this call is blocked
    /// - [`PipeError::Io`] if the backing file fails
    ///
    /// A failed call never notifies the observer. In memory, a chunk no
    /// larger than the capacity is pushed whole, so a failed call delivered
    /// none of it. A larger chunk streams through the ring, and the reader
    /// may already have consumed a prefix of it when the call fails. A file
    /// write that fails partway leaves the bytes it did append readable.
    pub fn write_chunk(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<(), PipeError> {
        let data = &buf[chunk_range(buf.len(), offset, len)?];
        if data.is_empty() {
            return Ok(());
        }

        let result = match &mut self.transport {
            WriterTransport::Memory(channel) => channel.write(data, &self.counters),
            WriterTransport::File { channel, file } => {
                channel.write(file, data, &self.counters)
            }
        };
        if let Err(err) = result {
            if matches!(err, PipeError::BrokenPipe) {
                tracing::warn!(len = data.len(), "pipe write rejected: reader closed");
            }
            return Err(err);
        }

        self.counters.record_chunk();
        tracing::trace!(len = data.len(), "pipe write");

        if self.observer.notify(data) {
            self.counters.record_notification();
        }
        Ok(())
    }

    /// Writes all of `buf`. Same as `write_chunk(buf, 0, buf.len())`.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<(), PipeError> {
        self.write_chunk(buf, 0, buf.len())
    }

    /// Pushes written bytes down to the transport.
    ///
    /// In-memory writes are visible to the reader as soon as they return,
    /// so this only matters for file-backed pipes, where it syncs the file.
    pub fn flush(&mut self) -> Result<(), PipeError> {
        match &mut self.transport {
            WriterTransport::Memory(_) => Ok(()),
            WriterTransport::File { channel, file } => channel.flush(file),
        }
    }

    /// Replaces the observer for subsequent writes. `None` removes it.
    pub fn set_observer(&self, observer: Option<Observer>) {
        self.observer.set(observer);
    }

    /// Returns a handle to the observer slot.
    pub fn observer_slot(&self) -> ObserverSlot {
        self.observer.clone()
    }

    /// Returns `true` once the reader end has been closed.
    ///
    /// Every further write will fail with [`PipeError::BrokenPipe`].
    pub fn is_broken(&self) -> bool {
        match &self.transport {
            WriterTransport::Memory(channel) => channel.is_reader_closed(),
            WriterTransport::File { channel, .. } => channel.is_reader_closed(),
        }
    }

    /// Returns a snapshot of the transfer counters.
    pub fn stats(&self) -> PipeStats {
        self.counters.snapshot()
    }

    /// Finishes writing. The reader sees end-of-stream once drained.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        match &self.transport {
            WriterTransport::Memory(channel) => channel.close_writer(),
            WriterTransport::File { channel, .. } => channel.close_writer(),
        }
        tracing::debug!(bytes_written = self.counters.snapshot().bytes_written, "pipe writer closed");
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        PipeWriter::flush(self).map_err(Into::into)
    }
}

impl std::fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeWriter")
            .field("observer", &self.observer)
            .field("broken", &self.is_broken())
            .finish_non_exhaustive()
    }
}

/// Consumer half of a [`BufferedPipe`].
///
/// Closing the reader (explicitly, through a [`ShutdownHandle`], or by
/// dropping it) tears the pipe down: unread bytes are discarded and the
/// writer fails with [`PipeError::BrokenPipe`] from then on.
pub struct PipeReader {
    transport: ReaderTransport,
    counters: Arc<PipeCounters>,
}

impl PipeReader {
    /// Reads the next byte.
    ///
    /// Blocks until a byte is available. Returns `None` once the writer is
    /// gone and every byte has been read.
    ///
    /// # Errors
    ///
    /// [`PipeError::Closed`] if the reader end has been closed.
    pub fn read_byte(&mut self) -> Result<Option<u8>, PipeError> {
        let mut byte = [0u8; 1];
        Ok(self.read_into(&mut byte)?.map(|_| byte[0]))
    }

    /// Reads up to `len` bytes into `buf[offset..]`.
    ///
    /// A zero `len` returns `Some(0)` without blocking. Otherwise blocks
    /// until at least one byte is available and returns how many were read,
    /// or `None` at end-of-stream.
    ///
    /// # Errors
    ///
    /// - [`PipeError::InvalidArgument`] if the range is outside `buf`
    /// - [`PipeError::Closed`] if the reader end has been closed
    /// - [`PipeError::Io`] if the backing file fails
    pub fn read_chunk(
        &mut self,
        buf: &mut [u8],
        offset: usize,
        len: usize,
    ) -> Result<Option<usize>, PipeError> {
        let range = chunk_range(buf.len(), offset, len)?;
        if range.is_empty() {
            return Ok(Some(0));
        }
        self.read_into(&mut buf[range])
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<Option<usize>, PipeError> {
        let read = match &mut self.transport {
            ReaderTransport::Memory(channel) => channel.read(buf, &self.counters),
            ReaderTransport::File { channel, file } => channel.read(file, buf, &self.counters),
        }?;

        match read {
            Some(n) => tracing::trace!(len = n, "pipe read"),
            None => tracing::trace!("pipe end-of-stream"),
        }
        Ok(read)
    }

    /// Bytes that can be read right now without blocking.
    pub fn available(&self) -> usize {
        match &self.transport {
            ReaderTransport::Memory(channel) => channel.available(),
            ReaderTransport::File { channel, file } => {
                usize::try_from(channel.available(file)).unwrap_or(usize::MAX)
            }
        }
    }

    /// Closes the reader end.
    ///
    /// Unread bytes are discarded, the file read handle (if any) is
    /// released, and a writer blocked on a full buffer wakes with
    /// [`PipeError::BrokenPipe`]. Further reads fail with
    /// [`PipeError::Closed`]. Calling this twice is harmless.
    pub fn close(&mut self) {
        self.shared().close_reader();
        if let ReaderTransport::File { file, .. } = &mut self.transport {
            file.release();
        }
    }

    /// Returns `true` once the reader end has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared().is_reader_closed()
    }

    /// Returns a handle that can close this reader from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            channel: self.shared(),
        }
    }

    /// Returns a snapshot of the transfer counters.
    pub fn stats(&self) -> PipeStats {
        self.counters.snapshot()
    }

    fn shared(&self) -> SharedChannel {
        match &self.transport {
            ReaderTransport::Memory(channel) => SharedChannel::Memory(channel.clone()),
            ReaderTransport::File { channel, .. } => SharedChannel::File(channel.clone()),
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.read_chunk(buf, 0, len)?.unwrap_or(0))
    }
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader")
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Closes a pipe's reader end from any thread.
///
/// This is the external shutdown signal for a pipe: it wakes a writer
/// blocked on a full buffer (which then fails with
/// [`PipeError::BrokenPipe`]) and a reader blocked on an empty one (which
/// then fails with [`PipeError::Closed`]).
#[derive(Clone)]
pub struct ShutdownHandle {
    channel: SharedChannel,
}

impl ShutdownHandle {
    /// Closes the reader end. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.channel.close_reader()
    }

    /// Returns `true` once the reader end has been closed.
    pub fn is_closed(&self) -> bool {
        self.channel.is_reader_closed()
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}
