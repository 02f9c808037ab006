//! File-backed transport.
//!
//! The writer appends to the file through one handle and the reader walks
//! it from the start through another. The shared state only tracks how far
//! the file has been written, so the reader knows when to park.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Condvar, Mutex};

use crate::stats::PipeCounters;
use crate::PipeError;

struct FileState {
    /// Readable length of the file: its size at open plus appended bytes.
    end: u64,
    writer_closed: bool,
    reader_closed: bool,
}

/// Progress shared by the writer and reader of a file-backed pipe.
pub(crate) struct FileChannel {
    path: PathBuf,
    state: Mutex<FileState>,
    readable: Condvar,
}

/// Write half: the append handle.
pub(crate) struct FileWriter {
    file: File,
}

/// Read half: the sequential read handle and its position.
pub(crate) struct FileReader {
    file: Option<File>,
    position: u64,
}

/// Opens `path` for append and for read.
///
/// Bytes already in the file are readable, followed by everything appended
/// through the returned writer.
pub(crate) fn open(path: &Path) -> Result<(FileChannel, FileWriter, FileReader), PipeError> {
    let write_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipeError::open(path, e))?;
    let read_file = File::open(path).map_err(|e| PipeError::open(path, e))?;
    let end = write_file
        .metadata()
        .map_err(|e| PipeError::open(path, e))?
        .len();

    let channel = FileChannel {
        path: path.to_path_buf(),
        state: Mutex::new(FileState {
            end,
            writer_closed: false,
            reader_closed: false,
        }),
        readable: Condvar::new(),
    };

    Ok((
        channel,
        FileWriter { file: write_file },
        FileReader {
            file: Some(read_file),
            position: 0,
        },
    ))
}

impl FileChannel {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes the reader can see in total, read or not.
    pub fn readable_len(&self) -> u64 {
        self.state.lock().end
    }

    /// Appends `data` and publishes it to the reader.
    ///
    /// If the append fails partway, the bytes that did reach the file are
    /// still published so later appends stay aligned with `end`.
    pub fn write(
        &self,
        writer: &mut FileWriter,
        data: &[u8],
        counters: &PipeCounters,
    ) -> Result<(), PipeError> {
        if self.state.lock().reader_closed {
            return Err(PipeError::BrokenPipe);
        }

        let (appended, result) = append(&mut writer.file, data);

        if appended > 0 {
            let mut state = self.state.lock();
            state.end += appended as u64;
            counters.record_written(appended);
            self.readable.notify_one();
        }
        if let Err(err) = &result {
            tracing::warn!(
                path = %self.path.display(),
                appended,
                len = data.len(),
                error = %err,
                "pipe file append failed"
            );
        }
        result.map_err(PipeError::from)
    }

    /// Forces appended bytes down to storage.
    pub fn flush(&self, writer: &mut FileWriter) -> Result<(), PipeError> {
        writer.file.flush()?;
        writer.file.sync_data()?;
        Ok(())
    }

    /// Reads up to `buf.len()` bytes, parking until the writer appends more.
    ///
    /// Returns `None` once the writer is gone and the file is exhausted.
    pub fn read(
        &self,
        reader: &mut FileReader,
        buf: &mut [u8],
        counters: &PipeCounters,
    ) -> Result<Option<usize>, PipeError> {
        let want = {
            let mut state = self.state.lock();
            loop {
                if state.reader_closed {
                    return Err(PipeError::Closed);
                }
                let ready = state.end.saturating_sub(reader.position);
                if ready > 0 {
                    break usize::try_from(ready).map_or(buf.len(), |r| r.min(buf.len()));
                }
                if state.writer_closed {
                    return Ok(None);
                }
                self.readable.wait(&mut state);
            }
        };

        let Some(file) = reader.file.as_mut() else {
            return Err(PipeError::Closed);
        };
        let read = file.read(&mut buf[..want])?;
        if read == 0 {
            // Someone truncated the file under us.
            return Err(PipeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "pipe file shorter than bytes written",
            )));
        }

        reader.position += read as u64;
        counters.record_read(read);
        Ok(Some(read))
    }

    pub fn available(&self, reader: &FileReader) -> u64 {
        self.state.lock().end.saturating_sub(reader.position)
    }

    pub fn close_writer(&self) {
        let mut state = self.state.lock();
        state.writer_closed = true;
        self.readable.notify_all();
    }

    /// Marks the reader end closed. Returns `false` if it already was.
    pub fn close_reader(&self) -> bool {
        let mut state = self.state.lock();
        if state.reader_closed {
            return false;
        }
        state.reader_closed = true;
        self.readable.notify_all();
        true
    }

    pub fn is_reader_closed(&self) -> bool {
        self.state.lock().reader_closed
    }
}

/// Writes as much of `data` as `out` accepts, returning how many bytes made
/// it alongside the outcome.
fn append(out: &mut impl Write, data: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < data.len() {
        match out.write(&data[written..]) {
            Ok(0) => return (written, Err(io::ErrorKind::WriteZero.into())),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

impl FileReader {
    /// Drops the read handle.
    pub fn release(&mut self) {
        self.file = None;
    }
}
