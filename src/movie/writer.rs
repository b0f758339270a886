//! Append-only `.m64` writer.
//!
//! A writer owns its output file for the whole session:
//!
//! ```text
//! Created --(header written)--> Recording --close()--> Closed
//! ```
//!
//! Each appended sample is written as its 4 raw bytes and flushed straight
//! away, so a crash leaves a file that is valid up to the last record.
//!
//! The destination is any [`MovieSink`]; [`MovieWriter::create`] uses a
//! [`File`].

use super::header::{MovieHeader, FRAME_COUNT_OFFSET, HEADER_SIZE};
use crate::error::{AppResult, CaptureError};
use crate::sample::{RawSample, SAMPLE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What `close` does with the header's frame-count field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCountPatch {
    /// Seek to the field but leave the placeholder from the header untouched.
    /// Existing tooling expects files produced this way.
    #[default]
    Legacy,
    /// Overwrite the field with the number of samples actually recorded.
    Corrected,
}

/// Lifecycle of a movie writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// File opened, header not yet complete.
    Created,
    /// Header written; samples may be appended.
    Recording,
    /// File released.
    Closed,
}

impl WriterState {
    fn describe(self) -> &'static str {
        match self {
            WriterState::Created => "created",
            WriterState::Recording => "recording",
            WriterState::Closed => "closed",
        }
    }
}

/// Seekable byte destination of a movie.
pub trait MovieSink: Write + Seek {
    /// Make everything written so far durable. Called once, at close.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl MovieSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl MovieSink for io::Cursor<Vec<u8>> {}

/// Exclusive owner of one movie file.
#[derive(Debug)]
pub struct MovieWriter<W: MovieSink = File> {
    path: PathBuf,
    file: Option<BufWriter<W>>,
    state: WriterState,
    patch: FrameCountPatch,
    samples_written: u32,
}

impl MovieWriter<File> {
    /// Create (or truncate) `path`, write the header and start recording.
    ///
    /// # Errors
    /// Any I/O failure opening the file or writing the header. A partially
    /// written file is left on disk.
    pub fn create(
        path: impl AsRef<Path>,
        header: &MovieHeader,
        patch: FrameCountPatch,
    ) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Self::from_sink(file, path, header, patch)
    }
}

impl<W: MovieSink> MovieWriter<W> {
    /// Write the header to an already opened `sink` and start recording.
    /// `path` is only used to name the movie in logs and summaries.
    pub fn from_sink(
        sink: W,
        path: impl Into<PathBuf>,
        header: &MovieHeader,
        patch: FrameCountPatch,
    ) -> AppResult<Self> {
        let mut writer = Self {
            path: path.into(),
            file: Some(BufWriter::new(sink)),
            state: WriterState::Created,
            patch,
            samples_written: 0,
        };
        writer.write_header(header)?;
        writer.state = WriterState::Recording;

        info!(
            path = %writer.path.display(),
            uid = header.uid,
            patch = ?patch,
            "Movie recording started"
        );
        Ok(writer)
    }

    fn write_header(&mut self, header: &MovieHeader) -> AppResult<()> {
        let file = self.file_mut("write header")?;
        file.write_all(&header.to_bytes())?;
        file.flush()?;
        debug!(bytes = HEADER_SIZE, "Movie header written");
        Ok(())
    }

    fn file_mut(&mut self, operation: &'static str) -> AppResult<&mut BufWriter<W>> {
        let state = self.state.describe();
        self.file
            .as_mut()
            .ok_or(CaptureError::InvalidState { operation, state })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples appended so far.
    pub fn samples_written(&self) -> u32 {
        self.samples_written
    }

    /// Bytes the file should hold: header plus one record per sample.
    pub fn expected_len(&self) -> u64 {
        HEADER_SIZE as u64 + SAMPLE_SIZE as u64 * u64::from(self.samples_written)
    }

    /// Append one sample as the next 4-byte record.
    ///
    /// # Errors
    /// [`CaptureError::InvalidState`] outside `Recording`; I/O errors are
    /// returned as-is and end the session.
    pub fn append_sample(&mut self, raw: RawSample) -> AppResult<()> {
        if self.state != WriterState::Recording {
            return Err(CaptureError::InvalidState {
                operation: "append sample",
                state: self.state.describe(),
            });
        }

        let file = self.file_mut("append sample")?;
        file.write_all(&raw.bytes())?;
        file.flush()?;
        self.samples_written = self.samples_written.saturating_add(1);
        Ok(())
    }

    /// Finish the movie and release the file. A no-op unless recording.
    ///
    /// With [`FrameCountPatch::Legacy`] the writer seeks to the frame-count
    /// field and leaves it as is. With [`FrameCountPatch::Corrected`] the
    /// field is overwritten with [`samples_written`](Self::samples_written).
    pub fn close(&mut self) -> AppResult<()> {
        if self.state != WriterState::Recording {
            return Ok(());
        }
        self.state = WriterState::Closed;
        // Taken before any I/O so the handle is dropped on every path out.
        let Some(buffered) = self.file.take() else {
            return Ok(());
        };

        let mut file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
        match self.patch {
            FrameCountPatch::Legacy => {
                debug!("Frame count left at header placeholder");
            }
            FrameCountPatch::Corrected => {
                file.write_all(&self.samples_written.to_le_bytes())?;
                debug!(frames = self.samples_written, "Frame count patched");
            }
        }
        file.sync()?;

        info!(
            path = %self.path.display(),
            samples = self.samples_written,
            "Movie recording closed"
        );
        Ok(())
    }
}

impl<W: MovieSink> Drop for MovieWriter<W> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = %self.path.display(), error = %err, "Failed to close movie on drop");
        }
    }
}
