//! Cast-to-cast transforms.
//!
//! Re-emits a recording with a speed factor, trim window, and idle cap, and
//! concatenates recordings end-to-end. Transforms stream events from source
//! to destination and never mutate the input; outputs go through the
//! temp-and-rename discipline in the parent module.

use std::path::{Path, PathBuf};

use crate::asciicast::{CastReader, CastWriter, Event};
use crate::error::{Error, Result};

use super::write_atomic;

/// Parameters for [`export_cast`].
#[derive(Debug, Clone)]
pub struct CastTransform {
    /// Playback speed factor; 2.0 halves every interval.
    pub speed: f64,
    /// Maximum inter-event gap in the output; `None`, zero, or negative
    /// disables capping.
    pub idle_cap: Option<f64>,
    /// Events before this offset are dropped; times rebase to it.
    pub trim_start: f64,
    /// Events after this offset are dropped.
    pub trim_end: Option<f64>,
    /// Replacement title; the source title is kept when `None`.
    pub title: Option<String>,
}

impl Default for CastTransform {
    fn default() -> Self {
        Self {
            speed: 1.0,
            idle_cap: None,
            trim_start: 0.0,
            trim_end: None,
            title: None,
        }
    }
}

/// Re-emit a recording with `t' = (t - trim_start) / speed`, dropped
/// out-of-window events, and the idle cap re-applied.
///
/// Header width, height, timestamp, command, and env are preserved; the
/// duration is rescaled when present. With default parameters the output
/// is equivalent to the input.
pub fn export_cast(input: &Path, output: &Path, transform: &CastTransform) -> Result<()> {
    if !(transform.speed > 0.0 && transform.speed.is_finite()) {
        return Err(Error::Export(format!(
            "speed must be positive and finite, got {}",
            transform.speed
        )));
    }

    let reader = CastReader::open(input)?;
    let mut header = reader.header().clone();
    if let Some(title) = &transform.title {
        header.title = Some(title.clone());
    }
    if let Some(duration) = header.duration {
        let clipped = transform
            .trim_end
            .map(|end| duration.min(end))
            .unwrap_or(duration);
        header.duration = Some(((clipped - transform.trim_start).max(0.0)) / transform.speed);
    }

    let cap = transform.idle_cap.filter(|&c| c > 0.0 && c.is_finite());

    write_atomic(output, |file| {
        let mut writer = CastWriter::new(file, &header)?;

        // Gaps are measured in scaled source time and capped on the way
        // out; `prev` starts at zero to mirror the capture engine.
        let mut prev_scaled = 0.0f64;
        let mut out_time = 0.0f64;

        for event in reader.events() {
            let event = event?;
            if event.time < transform.trim_start {
                continue;
            }
            if let Some(end) = transform.trim_end {
                if event.time > end {
                    break;
                }
            }

            let scaled = ((event.time - transform.trim_start) / transform.speed).max(0.0);
            match cap {
                // Without a cap the scaled time is used directly, so an
                // identity transform reproduces its input exactly.
                None => out_time = scaled.max(out_time),
                Some(cap) => {
                    let gap = (scaled - prev_scaled).max(0.0).min(cap);
                    out_time += gap;
                }
            }
            prev_scaled = scaled;

            writer.write_event(&Event::new(out_time, event.kind, event.data))?;
        }

        writer.close()?;
        Ok(())
    })
}

/// Concatenate recordings end-to-end with `gap` seconds between them.
///
/// The output header takes the maximum width and height across sources and
/// the first source's timestamp. Every join carries a marker labeled with
/// the joined file's basename, placed mid-gap so it lands in the silence
/// between recordings.
pub fn concat(inputs: &[PathBuf], output: &Path, gap: f64) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::Export("nothing to concatenate".into()));
    }
    if !(gap >= 0.0 && gap.is_finite()) {
        return Err(Error::Export(format!("gap must be non-negative, got {}", gap)));
    }

    // First pass over the headers for the output dimensions.
    let mut width = 0u16;
    let mut height = 0u16;
    let mut timestamp = None;
    for (i, path) in inputs.iter().enumerate() {
        let reader = CastReader::open(path)?;
        let header = reader.header();
        width = width.max(header.width);
        height = height.max(header.height);
        if i == 0 {
            timestamp = header.timestamp;
        }
    }

    let mut header = crate::asciicast::Header::new(width, height);
    header.timestamp = timestamp;

    write_atomic(output, |file| {
        let mut writer = CastWriter::new(file, &header)?;
        let mut offset = 0.0f64;

        for (i, path) in inputs.iter().enumerate() {
            if i > 0 {
                let label = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                writer.write_event(&Event::marker(offset - gap / 2.0, label))?;
            }

            let mut last = 0.0f64;
            for event in CastReader::open(path)?.events() {
                let event = event?;
                last = event.time.max(last);
                writer.write_event(&Event::new(offset + event.time, event.kind, event.data))?;
            }

            offset += last + gap;
        }

        writer.close()?;
        Ok(())
    })
}
