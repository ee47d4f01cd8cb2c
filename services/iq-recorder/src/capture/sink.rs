//! Output sink - ordered, exact persistence of captured chunks

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CaptureError;

/// Destination for captured bytes. Owns the writer; `finish` flushes it and
/// releases it, and dropping an unfinished sink closes it as well.
pub struct OutputSink<W: Write> {
    writer: W,
    path: PathBuf,
    chunks_written: u64,
    bytes_written: u64,
}

impl OutputSink<File> {
    /// Create (or truncate) the output file
    pub fn create(path: &Path) -> Result<Self, CaptureError> {
        let file = File::create(path).map_err(|source| CaptureError::SinkOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened {} for writing", path.display());
        Ok(Self::new(file, path))
    }
}

impl<W: Write> OutputSink<W> {
    pub fn new(writer: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
            chunks_written: 0,
            bytes_written: 0,
        }
    }

    /// Persist one chunk in a single call. No retry on failure.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writer.write_all(chunk)?;
        self.chunks_written += 1;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and hand back the writer; dropping it closes the resource
    pub fn finish(mut self) -> Result<W, CaptureError> {
        if let Err(source) = self.writer.flush() {
            return Err(CaptureError::SinkClose {
                path: self.path,
                source,
            });
        }
        debug!(
            "Closed {} after {} chunks ({} bytes)",
            self.path.display(),
            self.chunks_written,
            self.bytes_written
        );
        Ok(self.writer)
    }
}
