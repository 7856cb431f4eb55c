//! Async frame scanner over a receiver connection

use futures::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::trace;

use super::sync::{FrameSync, SyncOptions, SyncStats};
use crate::types::Frame;
use crate::{ExporterError, Result};

/// Pulls bytes from a connection and cuts them into frames.
///
/// A scanner lives exactly as long as one connection. Frames come out in wire order; the end
/// of the byte source (including a short read in the middle of a frame) ends the sequence.
pub struct FrameScanner<R> {
    reader: BufReader<R>,
    sync: FrameSync,
}

impl<R: AsyncRead + Unpin> FrameScanner<R> {
    /// Create a scanner with default options (no checksum verification).
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, SyncOptions::default())
    }

    pub fn with_options(reader: R, options: SyncOptions) -> Self {
        Self { reader: BufReader::new(reader), sync: FrameSync::new(options) }
    }

    /// Get the next frame from the connection.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - A frame was synchronized and read completely
    /// - `Ok(None)` - The source ended (normal termination)
    /// - `Err(e)` - The source failed with a read error
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            let buf = match self.reader.fill_buf().await {
                Ok(buf) => buf,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(ExporterError::stream_failed(self.sync.stats().frames, e)),
            };

            if buf.is_empty() {
                if self.sync.is_mid_frame() {
                    trace!("Source ended in the middle of a frame");
                }
                return Ok(None);
            }

            let (consumed, frame) = self.sync.feed(buf);
            self.reader.consume(consumed);

            if frame.is_some() {
                return Ok(frame);
            }
        }
    }

    /// Diagnostic counters for this connection.
    pub fn stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Turn the scanner into a lazy stream of frames.
    ///
    /// The stream ends after the source ends or after yielding the first read error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Frame>> {
        futures::stream::unfold(Some(self), |state| async move {
            let mut scanner = state?;
            match scanner.next_frame().await {
                Ok(Some(frame)) => Some((Ok(frame), Some(scanner))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
