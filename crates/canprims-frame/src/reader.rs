use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::codec::{parse_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads frames from a candump-style text stream.
///
/// Accepts one frame per line, either bare (`123#0102`) or as a candump log
/// line (`(1436509052.249713) vcan0 123#0102`). Blank lines are skipped.
/// Handles partial reads internally.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    discarding: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            discarding: false,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// A malformed line is consumed and its parse error returned, so the
    /// caller may keep reading. Returns `Err(FrameError::EndOfStream)` at EOF.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            let line = self.read_line()?;
            let Some(token) = frame_token(&line) else {
                continue;
            };
            return parse_frame(token);
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let max = self.config.max_line_length;
        let mut eof = false;
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line = self.buf.split_to(pos);
                self.buf.advance(1);
                if std::mem::take(&mut self.discarding) {
                    continue;
                }
                if line.len() > max {
                    return Err(FrameError::LineTooLong {
                        len: line.len(),
                        max,
                    });
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            if self.buf.len() > max {
                // Drop the partial line and resync on the next newline.
                let len = self.buf.len();
                self.buf.clear();
                if !self.discarding {
                    self.discarding = true;
                    return Err(FrameError::LineTooLong { len, max });
                }
            }

            if eof {
                if self.buf.is_empty() {
                    self.discarding = false;
                    return Err(FrameError::EndOfStream);
                }
                let line = self.buf.split();
                if std::mem::take(&mut self.discarding) {
                    continue;
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                eof = true;
                continue;
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames and per-line errors until the stream ends.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::EndOfStream) => None,
            other => Some(other),
        }
    }
}

/// The frame text on a line: the last whitespace-separated token.
fn frame_token(line: &str) -> Option<&str> {
    line.split_whitespace().next_back()
}
