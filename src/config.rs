//! Configuration types for pipes.

use std::path::PathBuf;

/// Capacity of an in-memory pipe when none is given, in bytes.
pub const DEFAULT_PIPE_CAPACITY: usize = 1024;

/// Backing storage of a pipe, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeMode {
    /// Bounded ring buffer held in memory.
    ///
    /// Writes block while `capacity` bytes are buffered and unread.
    Memory {
        /// Maximum number of buffered bytes.
        capacity: usize,
    },

    /// Flat file that the writer appends to and the reader reads from
    /// the start.
    ///
    /// Capacity is bounded only by storage.
    File {
        /// Path of the backing file. Created if missing.
        path: PathBuf,
    },
}

impl Default for PipeMode {
    fn default() -> Self {
        Self::Memory {
            capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

impl PipeMode {
    /// Returns the buffer capacity, or `None` for file-backed pipes.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Memory { capacity } => Some(*capacity),
            Self::File { .. } => None,
        }
    }

    /// Returns the backing file path, or `None` for in-memory pipes.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::File { path } => Some(path),
            Self::Memory { .. } => None,
        }
    }

    /// Returns `true` if the pipe is backed by a file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }
}

/// Configuration for constructing a [`BufferedPipe`](crate::BufferedPipe).
///
/// # Example
///
/// ```
/// use piped_buffer::{PipeConfig, PipeMode};
///
/// let config = PipeConfig::memory(4096);
/// assert_eq!(config.mode, PipeMode::Memory { capacity: 4096 });
///
/// let config = PipeConfig::default();
/// assert_eq!(config.mode.capacity(), Some(1024));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeConfig {
    /// Backing storage.
    ///
    /// Default: in-memory, [`DEFAULT_PIPE_CAPACITY`] bytes
    pub mode: PipeMode,
}

impl PipeConfig {
    /// In-memory pipe holding at most `capacity` unread bytes.
    #[must_use]
    pub fn memory(capacity: usize) -> Self {
        Self {
            mode: PipeMode::Memory { capacity },
        }
    }

    /// File-backed pipe at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: PipeMode::File { path: path.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_config_default() {
        let config = PipeConfig::default();
        assert_eq!(
            config.mode,
            PipeMode::Memory {
                capacity: DEFAULT_PIPE_CAPACITY
            }
        );
        assert!(!config.mode.is_file());
    }

    #[test]
    fn test_pipe_config_file() {
        let config = PipeConfig::file("/tmp/test.pcm");
        assert!(config.mode.is_file());
        assert_eq!(config.mode.capacity(), None);
    }

    #[test]
    fn test_pipe_config_memory() {
        assert_eq!(PipeConfig::memory(4).mode.capacity(), Some(4));
    }
}
