//! Streaming asciicast v2 reader.
//!
//! The reader consumes the header at construction and then yields events
//! one at a time; nothing beyond the current line is held in memory, so
//! arbitrarily long recordings replay in constant space.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{Error, Result};

use super::{Event, Header};

/// Summary of a recording, computed in a single pass.
#[derive(Debug, Clone)]
pub struct CastInfo {
    pub header: Header,
    pub event_count: usize,
    pub duration: f64,
}

/// Streaming reader over an asciicast v2 file.
pub struct CastReader<R: BufRead> {
    header: Header,
    lines: Lines<R>,
}

impl CastReader<BufReader<File>> {
    /// Open a recording from a filesystem path.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> CastReader<R> {
    /// Construct a reader, consuming and validating the header line.
    ///
    /// The first non-empty line must be a version-2 header with positive
    /// dimensions.
    pub fn new(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header_line = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(Error::Format("file is empty".into())),
            }
        };

        let header: Header = serde_json::from_str(&header_line)
            .map_err(|e| Error::Format(format!("invalid header: {}", e)))?;
        header.validate()?;

        Ok(Self { header, lines })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Consume the reader, returning an iterator over events.
    ///
    /// Lines that fail to parse as events are skipped silently (comment and
    /// extension lines from future format revisions); I/O errors surface.
    pub fn events(self) -> Events<R> {
        Events { lines: self.lines }
    }
}

/// Event iterator returned by [`CastReader::events`].
pub struct Events<R: BufRead> {
    lines: Lines<R>,
}

impl<R: BufRead> Iterator for Events<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Err(e) => return Some(Err(e.into())),
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Event::from_json(&line) {
                        Ok(event) => return Some(Ok(event)),
                        // Forward compatibility: unknown record shapes are
                        // not an error for a reader.
                        Err(_) => continue,
                    }
                }
            }
        }
    }
}

/// Read a recording's summary in one pass.
///
/// Duration comes from the header when recorded there, otherwise from the
/// last event's timestamp.
pub fn read_info(path: &Path) -> Result<CastInfo> {
    let reader = CastReader::open(path)?;
    let header = reader.header().clone();

    let mut event_count = 0usize;
    let mut last_time = 0.0f64;
    for event in reader.events() {
        let event = event?;
        event_count += 1;
        last_time = event.time;
    }

    let duration = header.duration.unwrap_or(last_time);
    Ok(CastInfo {
        header,
        event_count,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asciicast::EventKind;
    use std::io::Cursor;

    fn reader_for(content: &str) -> CastReader<Cursor<&[u8]>> {
        CastReader::new(Cursor::new(content.as_bytes())).unwrap()
    }

    #[test]
    fn parses_header_and_events() {
        let content = "{\"version\":2,\"width\":80,\"height\":24}\n[0.1,\"o\",\"hello\"]\n[0.2,\"o\",\" world\"]\n";
        let reader = reader_for(content);
        assert_eq!(reader.header().width, 80);

        let events: Vec<Event> = reader.events().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].kind, EventKind::Output);
    }

    #[test]
    fn rejects_wrong_version() {
        let content = "{\"version\":3,\"width\":80,\"height\":24}\n";
        assert!(CastReader::new(Cursor::new(content.as_bytes())).is_err());
    }

    #[test]
    fn rejects_missing_dimensions() {
        let content = "{\"version\":2}\n";
        assert!(CastReader::new(Cursor::new(content.as_bytes())).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        assert!(CastReader::new(Cursor::new(b"" as &[u8])).is_err());
    }

    #[test]
    fn skips_leading_blank_lines_before_header() {
        let content = "\n\n{\"version\":2,\"width\":80,\"height\":24}\n[0.1,\"o\",\"x\"]\n";
        let reader = reader_for(content);
        assert_eq!(reader.events().count(), 1);
    }

    #[test]
    fn skips_malformed_event_lines() {
        let content = "{\"version\":2,\"width\":80,\"height\":24}\n[0.1,\"o\",\"ok\"]\n# a comment line\n{\"not\":\"an event\"}\n[0.2,\"o\",\"also ok\"]\n";
        let reader = reader_for(content);
        let events: Vec<Event> = reader.events().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].data, "also ok");
    }

    #[test]
    fn skips_blank_event_lines() {
        let content = "{\"version\":2,\"width\":80,\"height\":24}\n[0.1,\"o\",\"a\"]\n\n[0.2,\"o\",\"b\"]\n";
        let reader = reader_for(content);
        assert_eq!(reader.events().count(), 2);
    }

    #[test]
    fn info_counts_events_and_takes_last_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cast");
        std::fs::write(
            &path,
            "{\"version\":2,\"width\":80,\"height\":24}\n[0.5,\"o\",\"a\"]\n[2.5,\"m\",\"mark\"]\n",
        )
        .unwrap();

        let info = read_info(&path).unwrap();
        assert_eq!(info.event_count, 2);
        assert!((info.duration - 2.5).abs() < 1e-9);
    }

    #[test]
    fn info_prefers_header_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cast");
        std::fs::write(
            &path,
            "{\"version\":2,\"width\":80,\"height\":24,\"duration\":10.0}\n[0.5,\"o\",\"a\"]\n",
        )
        .unwrap();

        let info = read_info(&path).unwrap();
        assert!((info.duration - 10.0).abs() < 1e-9);
    }
}
