//! Error types for piped-buffer.
//!
//! Every failing pipe operation surfaces one [`PipeError`] to its caller.
//! Nothing is retried inside the crate.

use std::io;
use std::path::PathBuf;

/// Errors returned by [`BufferedPipe`](crate::BufferedPipe) and its halves.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// The reader end of the pipe has been closed.
    #[error("pipe closed")]
    Closed,

    /// The writer cannot deliver because the reader end is gone.
    #[error("broken pipe: reader end closed")]
    BrokenPipe,

    /// A chunk range fell outside its buffer.
    #[error("invalid range: offset {offset} + len {len} exceeds buffer of {buf_len} bytes")]
    InvalidArgument {
        /// Start offset into the buffer.
        offset: usize,
        /// Number of bytes requested.
        len: usize,
        /// Length of the buffer.
        buf_len: usize,
    },

    /// An in-memory pipe was requested with zero capacity.
    #[error("pipe capacity must be greater than zero")]
    InvalidCapacity,

    /// The backing file of a file-backed pipe could not be opened.
    #[error("failed to open pipe file {path}: {source}")]
    Open {
        /// Path of the backing file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The storage layer of a file-backed pipe failed.
    #[error("pipe I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipeError {
    /// Creates an open error for the given path.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for errors caused by the reader end going away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Closed | Self::BrokenPipe)
    }
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        match err {
            PipeError::Io(inner) | PipeError::Open { source: inner, .. } => inner,
            PipeError::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            PipeError::BrokenPipe => io::Error::new(io::ErrorKind::BrokenPipe, err),
            PipeError::InvalidArgument { .. } | PipeError::InvalidCapacity => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
        }
    }
}

/// Resolves `offset..offset + len` against a buffer of `buf_len` bytes.
pub(crate) fn chunk_range(
    buf_len: usize,
    offset: usize,
    len: usize,
) -> Result<std::ops::Range<usize>, PipeError> {
    match offset.checked_add(len) {
        Some(end) if end <= buf_len => Ok(offset..end),
        _ => Err(PipeError::InvalidArgument {
            offset,
            len,
            buf_len,
        }),
    }
}
