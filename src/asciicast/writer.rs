//! Append-only asciicast v2 writer.
//!
//! The writer emits the header line at creation and appends one event per
//! line after that. It moves through exactly one state transition,
//! Open → Closed; any write after close is an error, and `close` itself is
//! idempotent. The capture engine relies on both properties.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

use super::{Event, Header};

/// Writer for a single recording file.
pub struct CastWriter<W: Write> {
    inner: W,
    closed: bool,
    event_count: usize,
    last_time: f64,
}

impl CastWriter<BufWriter<File>> {
    /// Create a recording at `path`, truncating any existing file, and
    /// write the header line.
    pub fn create(path: &Path, header: &Header) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), header)
    }
}

impl<W: Write> CastWriter<W> {
    /// Wrap a writer and emit the header line.
    pub fn new(mut inner: W, header: &Header) -> Result<Self> {
        header.validate()?;
        let json = serde_json::to_string(header)
            .map_err(|e| Error::Format(format!("unserializable header: {}", e)))?;
        writeln!(inner, "{}", json)?;
        Ok(Self {
            inner,
            closed: false,
            event_count: 0,
            last_time: 0.0,
        })
    }

    /// Append one event.
    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        if self.closed {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "writer is closed",
            )));
        }
        writeln!(self.inner, "{}", event.to_json())?;
        self.event_count += 1;
        self.last_time = event.time;
        Ok(())
    }

    /// Number of events written so far.
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Timestamp of the most recently written event.
    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    /// Flush and mark the writer closed. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.inner.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}

impl<W: Write> Drop for CastWriter<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asciicast::CastReader;
    use std::io::Cursor;

    fn header() -> Header {
        Header::new(120, 30)
    }

    #[test]
    fn writes_header_then_events() {
        let mut buf = Vec::new();
        {
            let mut writer = CastWriter::new(&mut buf, &header()).unwrap();
            writer.write_event(&Event::output(0.0, "hi\r\n")).unwrap();
            writer.write_event(&Event::output(0.5, "world\r\n")).unwrap();
            writer.write_event(&Event::marker(1.0, "done")).unwrap();
            writer.close().unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"version\":2"));
        assert_eq!(lines[1], "[0.0,\"o\",\"hi\\r\\n\"]");
        assert_eq!(lines[2], "[0.5,\"o\",\"world\\r\\n\"]");
        assert_eq!(lines[3], "[1.0,\"m\",\"done\"]");
    }

    #[test]
    fn tracks_count_and_last_time() {
        let mut buf = Vec::new();
        let mut writer = CastWriter::new(&mut buf, &header()).unwrap();
        assert_eq!(writer.event_count(), 0);

        writer.write_event(&Event::output(0.25, "a")).unwrap();
        writer.write_event(&Event::output(1.75, "b")).unwrap();
        assert_eq!(writer.event_count(), 2);
        assert!((writer.last_time() - 1.75).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_write_after_close() {
        let mut buf = Vec::new();
        let mut writer = CastWriter::new(&mut buf, &header()).unwrap();
        writer.close().unwrap();
        assert!(writer.write_event(&Event::output(0.0, "x")).is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let mut buf = Vec::new();
        let mut writer = CastWriter::new(&mut buf, &header()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn rejects_invalid_header() {
        let mut buf = Vec::new();
        let mut bad = header();
        bad.width = 0;
        assert!(CastWriter::new(&mut buf, &bad).is_err());
    }

    #[test]
    fn written_file_parses_back() {
        let mut buf = Vec::new();
        {
            let mut writer = CastWriter::new(&mut buf, &header()).unwrap();
            writer.write_event(&Event::output(0.0, "echo hi\r\n")).unwrap();
            writer.write_event(&Event::resize(1.0, 100, 40)).unwrap();
        }

        let reader = CastReader::new(Cursor::new(&buf[..])).unwrap();
        assert_eq!(reader.header().width, 120);
        let events: Vec<Event> = reader.events().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].parse_resize(), Some((100, 40)));
    }
}
