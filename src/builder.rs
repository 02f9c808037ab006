//! Builder pattern for `BufferedPipe`.

use std::path::PathBuf;

use crate::{observer, BufferedPipe, Observer, PipeConfig, PipeError, PipeMode};

/// Builder for configuring and creating a [`BufferedPipe`].
///
/// # Example
///
/// ```
/// use piped_buffer::BufferedPipe;
///
/// let pipe = BufferedPipe::builder()
///     .capacity(8192)
///     .observer(|chunk| println!("{} PCM bytes", chunk.len()))
///     .build()
///     .unwrap();
///
/// assert_eq!(pipe.mode().capacity(), Some(8192));
/// ```
#[must_use]
#[derive(Default)]
pub struct PipeBuilder {
    config: PipeConfig,
    observer: Option<Observer>,
}

impl PipeBuilder {
    /// Creates a builder for a default in-memory pipe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an in-memory ring of `capacity` bytes.
    ///
    /// Default: [`DEFAULT_PIPE_CAPACITY`](crate::DEFAULT_PIPE_CAPACITY)
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.mode = PipeMode::Memory { capacity };
        self
    }

    /// Back the pipe with the file at `path` instead of memory.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mode = PipeMode::File { path: path.into() };
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: PipeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the initial observer.
    ///
    /// The observer can still be replaced after the pipe is built.
    pub fn observer<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        self.observer = Some(observer(f));
        self
    }

    /// Creates the pipe.
    ///
    /// # Errors
    ///
    /// - [`PipeError::InvalidCapacity`] for a zero-capacity in-memory pipe
    /// - [`PipeError::Open`] if the backing file cannot be opened
    pub fn build(self) -> Result<BufferedPipe, PipeError> {
        let pipe = BufferedPipe::from_config(&self.config)?;
        if self.observer.is_some() {
            pipe.set_observer(self.observer);
        }
        Ok(pipe)
    }
}

impl std::fmt::Debug for PipeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeBuilder")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_builder_defaults() {
        let pipe = PipeBuilder::new().build().unwrap();
        assert_eq!(pipe.mode(), &PipeMode::default());
        assert!(!pipe.observer_slot().is_set());
    }

    #[test]
    fn test_builder_zero_capacity() {
        let result = BufferedPipe::builder().capacity(0).build();
        assert!(matches!(result, Err(PipeError::InvalidCapacity)));
    }

    #[test]
    fn test_builder_observer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let pipe = BufferedPipe::builder()
            .capacity(4)
            .observer(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let (mut writer, _reader) = pipe.split();
        writer.write_bytes(&[1, 2]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.pcm");

        let pipe = BufferedPipe::builder().file(&path).build().unwrap();
        assert!(pipe.mode().is_file());
    }

    #[test]
    fn test_builder_last_mode_wins() {
        let builder = BufferedPipe::builder()
            .file("/tmp/unused.pcm")
            .with_config(PipeConfig::memory(16));
        let pipe = builder.build().unwrap();
        assert_eq!(pipe.mode().capacity(), Some(16));
    }
}
