//! Output sink writer: emits forwarded frames to a byte stream.

use std::io::Write;

use crate::traits::{CaptureError, Result};

/// Writes forwarded frames to the destination stream.
///
/// Each frame is written in full and explicitly flushed so a piped
/// downstream reader observes it promptly instead of waiting on internal
/// buffering. Frames are emitted back to back with no delimiters; consumers
/// split the stream on JPEG start/end-of-image markers.
#[derive(Debug)]
pub struct FrameSink<W: Write> {
    inner: W,
    frames_written: u64,
    bytes_written: u64,
}

impl<W: Write> FrameSink<W> {
    /// Wrap a destination stream.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            frames_written: 0,
            bytes_written: 0,
        }
    }

    /// Write one frame and flush.
    ///
    /// Any I/O error (e.g., a broken pipe) is fatal and propagated as
    /// [`CaptureError::SinkWrite`]; no retry is attempted.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.inner.write_all(frame).map_err(CaptureError::SinkWrite)?;
        self.inner.flush().map_err(CaptureError::SinkWrite)?;

        self.frames_written += 1;
        self.bytes_written += frame.len() as u64;
        Ok(())
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Number of frame bytes written so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
