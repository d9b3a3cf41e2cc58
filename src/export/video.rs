//! Video export through an external muxer.
//!
//! Frames are rendered at a fixed FPS into a scratch directory as PPM
//! files, then handed to ffmpeg in one blocking invocation per pass. The
//! muxer binary comes from `FFMPEG_PATH` or the search path; its stderr is
//! surfaced verbatim on failure.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::asciicast::{Cast, EventKind};
use crate::error::{Error, Result};
use crate::render;
use crate::terminal::TerminalBuffer;
use crate::theme::Theme;

/// Supported video containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Gif,
    Mp4,
    Webm,
}

/// Resolve the muxer executable and verify it runs.
pub fn find_muxer() -> Result<PathBuf> {
    let candidate = std::env::var("FFMPEG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ffmpeg"));

    match Command::new(&candidate).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(candidate),
        Ok(_) => Err(Error::Export(format!(
            "muxer at {} is not usable",
            candidate.display()
        ))),
        Err(_) => Err(Error::Export(
            "ffmpeg not found; install it or set FFMPEG_PATH".into(),
        )),
    }
}

/// Render a recording to video.
pub fn export_video(
    input: &Path,
    output: &Path,
    format: VideoFormat,
    fps: u32,
    theme: &Theme,
) -> Result<()> {
    if fps == 0 {
        return Err(Error::Export("fps must be positive".into()));
    }
    let muxer = find_muxer()?;

    let cast = Cast::load(input)?;
    let frames_dir = tempfile::tempdir()?;
    let frame_count = write_frames(&cast, fps, theme, frames_dir.path())?;
    debug!(frame_count, "frames rendered");

    let pattern = frames_dir.path().join("frame_%06d.ppm");
    let result = mux(&muxer, &pattern, frames_dir.path(), output, format, fps);

    if result.is_err() && output.exists() {
        // Never leave a partial container behind.
        let _ = std::fs::remove_file(output);
    }
    result
}

/// Render one PPM per frame; identical consecutive frames are hard-linked
/// (copied when the filesystem refuses) instead of re-encoded.
fn write_frames(cast: &Cast, fps: u32, theme: &Theme, dir: &Path) -> Result<usize> {
    let mut term = TerminalBuffer::new(cast.header.width as usize, cast.header.height as usize);
    let duration = cast.duration();
    let frame_count = (duration * fps as f64).ceil() as usize + 1;

    let mut event_idx = 0;
    let mut prev: Option<(u64, PathBuf)> = None;

    for frame in 0..frame_count {
        let t = frame as f64 / fps as f64;

        while event_idx < cast.events.len() && cast.events[event_idx].time <= t {
            let event = &cast.events[event_idx];
            match event.kind {
                EventKind::Output => term.process(&event.data),
                EventKind::Resize => {
                    if let Some((cols, rows)) = event.parse_resize() {
                        term.resize(cols as usize, rows as usize);
                    }
                }
                _ => {}
            }
            event_idx += 1;
        }

        let path = dir.join(format!("frame_{:06}.ppm", frame));
        let image = render::render_frame(term.rows(), term.width(), theme);

        let mut hasher = DefaultHasher::new();
        image.pixels().hash(&mut hasher);
        let digest = hasher.finish();

        match &prev {
            Some((prev_digest, prev_path)) if *prev_digest == digest => {
                if std::fs::hard_link(prev_path, &path).is_err() {
                    std::fs::copy(prev_path, &path)?;
                }
            }
            _ => {
                std::fs::write(&path, image.to_ppm())?;
            }
        }
        prev = Some((digest, path));
    }

    Ok(frame_count)
}

fn mux(
    muxer: &Path,
    pattern: &Path,
    scratch: &Path,
    output: &Path,
    format: VideoFormat,
    fps: u32,
) -> Result<()> {
    let fps = fps.to_string();
    match format {
        VideoFormat::Gif => {
            // Two passes: derive an optimized palette, then apply it.
            let palette = scratch.join("palette.png");
            run_muxer(
                muxer,
                &[
                    "-y",
                    "-framerate",
                    &fps,
                    "-i",
                    &pattern.to_string_lossy(),
                    "-vf",
                    "palettegen",
                    &palette.to_string_lossy(),
                ],
            )?;
            run_muxer(
                muxer,
                &[
                    "-y",
                    "-framerate",
                    &fps,
                    "-i",
                    &pattern.to_string_lossy(),
                    "-i",
                    &palette.to_string_lossy(),
                    "-lavfi",
                    "paletteuse",
                    &output.to_string_lossy(),
                ],
            )
        }
        VideoFormat::Mp4 => run_muxer(
            muxer,
            &[
                "-y",
                "-framerate",
                &fps,
                "-i",
                &pattern.to_string_lossy(),
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
                &output.to_string_lossy(),
            ],
        ),
        VideoFormat::Webm => run_muxer(
            muxer,
            &[
                "-y",
                "-framerate",
                &fps,
                "-i",
                &pattern.to_string_lossy(),
                "-c:v",
                "libvpx-vp9",
                "-b:v",
                "0",
                "-crf",
                "32",
                &output.to_string_lossy(),
            ],
        ),
    }
}

fn run_muxer(muxer: &Path, args: &[&str]) -> Result<()> {
    debug!(?args, "invoking muxer");
    let output = Command::new(muxer)
        .args(args)
        .output()
        .map_err(|e| Error::Export(format!("failed to run muxer: {}", e)))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Export(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}
