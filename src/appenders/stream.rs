//! Line-stream sink (standard output by default)

use crate::core::{Result, Sink};
use std::io::Write;

pub struct StreamSink {
    name: String,
    writer: Box<dyn Write + Send>,
}

impl StreamSink {
    /// Sink over an arbitrary writer
    pub fn new(name: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            name: name.into(),
            writer: Box::new(writer),
        }
    }

    /// Console sink writing to standard output
    pub fn stdout() -> Self {
        Self::new("console", std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new("stderr", std::io::stderr())
    }
}

impl Default for StreamSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Sink for StreamSink {
    fn write(&mut self, line: &str, _severity: u8) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_lines_verbatim() {
        let buf = SharedBuf::default();
        let mut sink = StreamSink::new("buf", buf.clone());

        sink.write("info hello\n", 6).unwrap();
        sink.flush().unwrap();

        assert_eq!(String::from_utf8(buf.0.lock().clone()).unwrap(), "info hello\n");
        assert_eq!(sink.name(), "buf");
    }

    #[test]
    fn test_write_error_is_reported() {
        let mut sink = StreamSink::new("pipe", ClosedPipe);
        assert!(sink.write("x\n", 3).is_err());
    }

    #[test]
    fn test_stdout_name() {
        assert_eq!(StreamSink::stdout().name(), "console");
    }
}
