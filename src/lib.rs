//! wincast library
//!
//! Records Windows console sessions into asciicast v2 files and renders
//! recordings back out as text, SVG, HTML, or video.

pub mod asciicast;
pub mod console;
pub mod error;
pub mod export;
pub mod logging;
pub mod player;
pub mod recorder;
pub mod render;
pub mod terminal;
pub mod theme;

pub use asciicast::{Cast, CastInfo, CastReader, CastWriter, Event, EventKind, Header};
pub use console::Snapshot;
pub use error::{Error, Result};
pub use recorder::{Recorder, RecorderConfig};
pub use terminal::TerminalBuffer;
pub use theme::Theme;
