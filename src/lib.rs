//! # piped-buffer
//!
//! Blocking byte pipe between an audio-capture producer and an encoder
//! consumer, with an observer tap on every write.
//!
//! The capture thread writes serialized PCM into a [`PipeWriter`]; the
//! encoder thread pulls it out of the matching [`PipeReader`] at its own
//! pace. An optional [`Observer`] gets a copy of every written chunk, for
//! live meters or visualizers, without taking bytes away from the reader.
//!
//! ## Quick Start
//!
//! ```rust
//! use piped_buffer::BufferedPipe;
//! use std::thread;
//!
//! let pipe = BufferedPipe::builder()
//!     .capacity(4096)
//!     .observer(|chunk| tracing::trace!(len = chunk.len(), "pcm in"))
//!     .build()?;
//! let (mut writer, mut reader) = pipe.split();
//!
//! let capture = thread::spawn(move || -> Result<(), piped_buffer::PipeError> {
//!     for frame in 0..10u8 {
//!         writer.write_bytes(&[frame; 320])?;
//!     }
//!     Ok(())
//! });
//!
//! // Encoder loop
//! let mut buf = [0u8; 1152];
//! let mut total = 0;
//! let len = buf.len();
//! while let Some(n) = reader.read_chunk(&mut buf, 0, len)? {
//!     total += n;
//! }
//! assert_eq!(total, 3200);
//!
//! capture.join().unwrap()?;
//! reader.close();
//! # Ok::<(), piped_buffer::PipeError>(())
//! ```
//!
//! ## Architecture
//!
//! - **Writer**: blocks while the ring is full, then notifies the observer
//!   on its own thread
//! - **Storage**: bounded `ringbuf` ring in memory, or an append-only file
//! - **Reader**: blocks while empty; sees end-of-stream once the writer is
//!   dropped and everything is drained
//!
//! Closing the reader is the teardown signal: a blocked writer wakes with
//! [`PipeError::BrokenPipe`] instead of hanging.

#![warn(missing_docs)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod error;
mod observer;
mod pipe;
mod stats;

pub use builder::PipeBuilder;
pub use config::{PipeConfig, PipeMode, DEFAULT_PIPE_CAPACITY};
pub use error::PipeError;
pub use observer::{observer, Observer, ObserverSlot};
pub use pipe::{BufferedPipe, PipeReader, PipeWriter, ShutdownHandle};
pub use stats::PipeStats;
