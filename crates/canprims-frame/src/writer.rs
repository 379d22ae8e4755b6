use std::io::{ErrorKind, Write};

use crate::codec::{frame_to_text, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes frames to any `Write` stream, one `<id>#<data>` line per frame.
pub struct FrameWriter<T> {
    inner: T,
    line: String,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            line: String::with_capacity(32),
            config,
        }
    }

    /// Write one frame line (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.line.clear();
        self.line.push_str(&frame_to_text(frame, self.config.lowercase));
        self.line.push('\n');

        let bytes = self.line.as_bytes();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::header::Header;
    use crate::reader::FrameReader;

    fn frame(id: u32, payload: &[u8]) -> Frame {
        Frame::with_data(Header::standard(id, false), payload).unwrap()
    }

    #[test]
    fn write_lines() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.write_frame(&frame(0x123, &[0xab, 0x01])).unwrap();
        writer
            .write_frame(&Frame::new(Header::extended(0x1abcdef0, false)))
            .unwrap();

        let out = writer.into_inner().into_inner();
        assert_eq!(out, b"123#ab01\n1abcdef0#\n");
    }

    #[test]
    fn uppercase_config() {
        let cfg = FrameConfig {
            lowercase: false,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        writer.write_frame(&frame(0x7ab, &[0xcd])).unwrap();
        assert_eq!(writer.into_inner().into_inner(), b"7AB#CD\n");
    }

    #[test]
    fn written_lines_read_back() {
        let frames = [frame(0x1, &[]), frame(0x7ff, &[1, 2, 3, 4, 5, 6, 7, 8])];
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        for f in &frames {
            writer.write_frame(f).unwrap();
        }

        let wire = writer.into_inner().into_inner();
        let read: Vec<Frame> = FrameReader::new(Cursor::new(wire))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(read, frames);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.write_frame(&frame(1, &[])).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.write_frame(&frame(5, &[0x55])).unwrap();

        assert_eq!(writer.into_inner().data, b"5#55\n");
    }

    #[test]
    fn write_zero_is_an_error() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.write_frame(&frame(1, &[])).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WriteZero));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
