//! asciicast v2 format support.
//!
//! The recording file is UTF-8 NDJSON: the first line is a JSON header
//! object, every following line is a `[time, code, data]` event array with
//! an absolute timestamp in seconds since the start of the recording.
//!
//! Reference: <https://docs.asciinema.org/manual/asciicast/v2/>
//!
//! ```text
//! {"version":2,"width":120,"height":30,"timestamp":1700000000}
//! [0.0,"o","hi\r\n"]
//! [0.5,"o","world\r\n"]
//! [1.0,"m","done"]
//! ```
//!
//! # Structure
//!
//! - `reader` - Streaming parser and the `info` fast path
//! - `writer` - Append-only writer used by the capture engine

mod reader;
mod writer;

pub use reader::{read_info, CastInfo, CastReader, Events};
pub use writer::CastWriter;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Header
// ============================================================================

/// asciicast v2 header.
///
/// `version`, `width`, and `height` are required; everything else is
/// optional metadata. `env` uses a sorted map so serialization is stable,
/// and `theme` is forwarded verbatim as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: u8,
    pub width: u16,
    pub height: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_time_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<serde_json::Value>,
}

impl Header {
    /// Create a minimal header with the given terminal dimensions.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            version: 2,
            width,
            height,
            timestamp: None,
            duration: None,
            idle_time_limit: None,
            command: None,
            title: None,
            env: None,
            theme: None,
        }
    }

    /// Validate the invariants a reader relies on.
    pub fn validate(&self) -> Result<()> {
        if self.version != 2 {
            return Err(Error::Format(format!(
                "unsupported version {} (expected 2)",
                self.version
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::Format(format!(
                "dimensions must be positive (got {}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Event kind codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Output ("o"): data written to the terminal.
    Output,
    /// Input ("i"): data read from the terminal.
    Input,
    /// Resize ("r"): dimensions changed, data is "COLSxROWS".
    Resize,
    /// Marker ("m"): an annotation at a point in time.
    Marker,
}

impl EventKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "o" => Some(EventKind::Output),
            "i" => Some(EventKind::Input),
            "r" => Some(EventKind::Resize),
            "m" => Some(EventKind::Marker),
            _ => None,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            EventKind::Output => "o",
            EventKind::Input => "i",
            EventKind::Resize => "r",
            EventKind::Marker => "m",
        }
    }
}

/// A single event.
///
/// `time` is absolute: seconds since the recording started. A valid file
/// has non-decreasing times.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
    pub data: String,
}

impl Event {
    pub fn new(time: f64, kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            data: data.into(),
        }
    }

    pub fn output(time: f64, data: impl Into<String>) -> Self {
        Self::new(time, EventKind::Output, data)
    }

    pub fn marker(time: f64, label: impl Into<String>) -> Self {
        Self::new(time, EventKind::Marker, label)
    }

    pub fn resize(time: f64, cols: u16, rows: u16) -> Self {
        Self::new(time, EventKind::Resize, format!("{}x{}", cols, rows))
    }

    pub fn is_output(&self) -> bool {
        self.kind == EventKind::Output
    }

    pub fn is_marker(&self) -> bool {
        self.kind == EventKind::Marker
    }

    /// Parse resize data into (cols, rows).
    ///
    /// Returns `None` for non-resize events or malformed data.
    pub fn parse_resize(&self) -> Option<(u16, u16)> {
        if self.kind != EventKind::Resize {
            return None;
        }
        let (cols, rows) = self.data.split_once('x')?;
        Some((cols.parse().ok()?, rows.parse().ok()?))
    }

    /// Parse an event from one JSON line.
    pub fn from_json(line: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| Error::Format(format!("event is not valid JSON: {}", e)))?;
        let arr = value
            .as_array()
            .ok_or_else(|| Error::Format("event must be a JSON array".into()))?;
        if arr.len() < 3 {
            return Err(Error::Format("event array needs 3 elements".into()));
        }

        let time = arr[0]
            .as_f64()
            .ok_or_else(|| Error::Format("event time must be a number".into()))?;
        if time < 0.0 {
            return Err(Error::Format("event time must be non-negative".into()));
        }
        let code = arr[1]
            .as_str()
            .ok_or_else(|| Error::Format("event code must be a string".into()))?;
        let kind = EventKind::from_code(code)
            .ok_or_else(|| Error::Format(format!("unknown event code {:?}", code)))?;
        let data = arr[2]
            .as_str()
            .ok_or_else(|| Error::Format("event data must be a string".into()))?
            .to_string();

        Ok(Event { time, kind, data })
    }

    /// Serialize the event to its single-line JSON form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&serde_json::json!([
            self.time,
            self.kind.to_code(),
            self.data
        ]))
        .expect("event fields are JSON-safe")
    }
}

// ============================================================================
// Cast (in-memory convenience)
// ============================================================================

/// A recording loaded into memory: header plus ordered events.
///
/// The export pipeline uses this where whole-file views are needed
/// (concatenation, thumbnails); replay paths stream instead.
#[derive(Debug, Clone)]
pub struct Cast {
    pub header: Header,
    pub events: Vec<Event>,
}

impl Cast {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            events: Vec::new(),
        }
    }

    /// Load a recording from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = CastReader::open(path.as_ref())?;
        let header = reader.header().clone();
        let events = reader.events().collect::<Result<Vec<_>>>()?;
        Ok(Self { header, events })
    }

    /// Total duration: the header's when present, else the last event time.
    pub fn duration(&self) -> f64 {
        self.header
            .duration
            .unwrap_or_else(|| self.events.last().map(|e| e.time).unwrap_or(0.0))
    }

    /// Concatenated output payloads up to and including `time`.
    pub fn output_until(&self, time: f64) -> String {
        let mut out = String::new();
        for event in &self.events {
            if event.time > time {
                break;
            }
            if event.is_output() {
                out.push_str(&event.data);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_preserves_fields() {
        let mut header = Header::new(120, 30);
        header.timestamp = Some(1_700_000_000);
        header.title = Some("demo".into());
        header.idle_time_limit = Some(2.0);
        let mut env = BTreeMap::new();
        env.insert("SHELL".to_string(), "cmd.exe".to_string());
        header.env = Some(env);

        let json = serde_json::to_string(&header).unwrap();
        let parsed: Header = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn header_serializes_required_fields_only_when_minimal() {
        let header = Header::new(80, 24);
        let json = serde_json::to_string(&header).unwrap();
        assert_eq!(json, r#"{"version":2,"width":80,"height":24}"#);
    }

    #[test]
    fn header_validate_rejects_wrong_version() {
        let mut header = Header::new(80, 24);
        header.version = 3;
        assert!(header.validate().is_err());
    }

    #[test]
    fn header_validate_rejects_zero_dimensions() {
        let header = Header::new(0, 24);
        assert!(header.validate().is_err());
    }

    #[test]
    fn event_kind_codes_roundtrip() {
        for code in ["o", "i", "r", "m"] {
            let kind = EventKind::from_code(code).unwrap();
            assert_eq!(kind.to_code(), code);
        }
        assert_eq!(EventKind::from_code("x"), None);
    }

    #[test]
    fn event_json_roundtrip() {
        let event = Event::output(1.5, "ls -la\r\n");
        let parsed = Event::from_json(&event.to_json()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn event_to_json_format() {
        assert_eq!(Event::output(0.5, "hi").to_json(), r#"[0.5,"o","hi"]"#);
        assert_eq!(Event::marker(1.0, "done").to_json(), r#"[1.0,"m","done"]"#);
        assert_eq!(
            Event::resize(0.0, 100, 40).to_json(),
            r#"[0.0,"r","100x40"]"#
        );
    }

    #[test]
    fn event_rejects_negative_time() {
        assert!(Event::from_json(r#"[-0.5,"o","x"]"#).is_err());
    }

    #[test]
    fn parse_resize_extracts_dimensions() {
        let event = Event::resize(0.1, 100, 50);
        assert_eq!(event.parse_resize(), Some((100, 50)));
    }

    #[test]
    fn parse_resize_rejects_malformed() {
        let event = Event::new(0.1, EventKind::Resize, "wide");
        assert_eq!(event.parse_resize(), None);
        assert_eq!(Event::output(0.1, "80x24").parse_resize(), None);
    }

    #[test]
    fn cast_duration_prefers_header() {
        let mut header = Header::new(80, 24);
        header.duration = Some(9.5);
        let mut cast = Cast::new(header);
        cast.events.push(Event::output(3.0, "x"));
        assert!((cast.duration() - 9.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cast_duration_falls_back_to_last_event() {
        let mut cast = Cast::new(Header::new(80, 24));
        cast.events.push(Event::output(0.5, "a"));
        cast.events.push(Event::output(2.25, "b"));
        assert!((cast.duration() - 2.25).abs() < f64::EPSILON);
    }

    #[test]
    fn output_until_stops_at_timestamp() {
        let mut cast = Cast::new(Header::new(80, 24));
        cast.events.push(Event::output(0.0, "a"));
        cast.events.push(Event::marker(0.5, "mid"));
        cast.events.push(Event::output(1.0, "b"));
        cast.events.push(Event::output(2.0, "c"));

        assert_eq!(cast.output_until(0.0), "a");
        assert_eq!(cast.output_until(1.5), "ab");
        assert_eq!(cast.output_until(5.0), "abc");
    }
}
