//! Export pipeline.
//!
//! Every transform reads a source recording and writes a new file — the
//! source is never touched. Text-shaped outputs are written through a
//! temp-and-rename so a failed export never leaves a partial file behind.
//!
//! Formats are a closed enum with one small function per arm; the CLI
//! infers the format from the output extension.

pub mod cast;
pub mod video;

pub use cast::{concat, export_cast, CastTransform};
pub use video::{export_video, find_muxer, VideoFormat};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::asciicast::{Cast, EventKind};
use crate::error::{Error, Result};
use crate::render;
use crate::terminal::TerminalBuffer;
use crate::theme::Theme;

/// Output formats the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Cast,
    Txt,
    Json,
    Html,
    Svg,
    Gif,
    Mp4,
    Webm,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cast" => Some(Self::Cast),
            "txt" | "text" => Some(Self::Txt),
            "json" => Some(Self::Json),
            "html" => Some(Self::Html),
            "svg" => Some(Self::Svg),
            "gif" => Some(Self::Gif),
            "mp4" => Some(Self::Mp4),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Cast => "cast",
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Html => "html",
            Self::Svg => "svg",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

/// Where in the recording a thumbnail is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThumbnailTime {
    First,
    Middle,
    Last,
    At(f64),
}

impl ThumbnailTime {
    fn resolve(&self, duration: f64) -> f64 {
        match self {
            Self::First => 0.0,
            Self::Middle => duration / 2.0,
            Self::Last => duration,
            Self::At(secs) => secs.clamp(0.0, duration),
        }
    }
}

/// Options for [`export`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub title: Option<String>,
    pub fps: u32,
    pub theme: String,
    pub scale: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: None,
            output: None,
            title: None,
            fps: 15,
            theme: "asciinema".into(),
            scale: 1.0,
        }
    }
}

/// Export a recording; returns the path written.
pub fn export(input: &Path, options: &ExportOptions) -> Result<PathBuf> {
    let format = match (options.format, &options.output) {
        (Some(format), _) => format,
        (None, Some(output)) => OutputFormat::from_extension(output).ok_or_else(|| {
            Error::Export(format!(
                "cannot infer format from {}",
                output.display()
            ))
        })?,
        (None, None) => {
            return Err(Error::Export(
                "pass --format or an --output with a known extension".into(),
            ))
        }
    };

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension(format.extension()));
    if output == input {
        return Err(Error::Export(
            "output would overwrite the source recording; pass --output".into(),
        ));
    }
    let theme = Theme::by_name(&options.theme);

    match format {
        OutputFormat::Cast => {
            let transform = CastTransform {
                title: options.title.clone(),
                ..Default::default()
            };
            export_cast(input, &output, &transform)?;
        }
        OutputFormat::Txt => {
            let cast = Cast::load(input)?;
            let term = emulate_until(&cast, f64::INFINITY);
            write_atomic(&output, |file| {
                writeln!(file, "{}", term)?;
                Ok(())
            })?;
        }
        OutputFormat::Json => {
            let cast = Cast::load(input)?;
            let doc = json_document(&cast);
            write_atomic(&output, |file| {
                serde_json::to_writer_pretty(&mut *file, &doc)
                    .map_err(|e| Error::Format(e.to_string()))?;
                writeln!(file)?;
                Ok(())
            })?;
        }
        OutputFormat::Html => {
            let page = html_page(input, options, theme)?;
            write_atomic(&output, |file| {
                file.write_all(page.as_bytes())?;
                Ok(())
            })?;
        }
        OutputFormat::Svg => {
            let svg = thumbnail_svg(input, ThumbnailTime::Last, theme, options.scale)?;
            write_atomic(&output, |file| {
                file.write_all(svg.as_bytes())?;
                Ok(())
            })?;
        }
        OutputFormat::Gif => export_video(input, &output, VideoFormat::Gif, options.fps, theme)?,
        OutputFormat::Mp4 => export_video(input, &output, VideoFormat::Mp4, options.fps, theme)?,
        OutputFormat::Webm => export_video(input, &output, VideoFormat::Webm, options.fps, theme)?,
    }

    Ok(output)
}

/// Render one SVG frame of the recording at the given point in time.
pub fn thumbnail_svg(
    input: &Path,
    time: ThumbnailTime,
    theme: &Theme,
    scale: f64,
) -> Result<String> {
    let cast = Cast::load(input)?;
    let at = time.resolve(cast.duration());
    let term = emulate_until(&cast, at);
    let title = cast.header.title.as_deref();

    if (scale - 1.0).abs() > f64::EPSILON {
        let (w, h) = render::svg_size(term.width(), term.height());
        Ok(render::render_thumbnail(
            term.rows(),
            term.width(),
            theme,
            (w * scale).round() as u32,
            (h * scale).round() as u32,
        ))
    } else {
        Ok(render::render_svg(term.rows(), term.width(), theme, title))
    }
}

/// Replay a recording into an emulator up to and including `until`.
pub fn emulate_until(cast: &Cast, until: f64) -> TerminalBuffer {
    let mut term = TerminalBuffer::new(cast.header.width as usize, cast.header.height as usize);
    for event in &cast.events {
        if event.time > until {
            break;
        }
        match event.kind {
            EventKind::Output => term.process(&event.data),
            EventKind::Resize => {
                if let Some((cols, rows)) = event.parse_resize() {
                    term.resize(cols as usize, rows as usize);
                }
            }
            _ => {}
        }
    }
    term
}

fn json_document(cast: &Cast) -> serde_json::Value {
    serde_json::json!({
        "header": cast.header,
        "events": cast
            .events
            .iter()
            .map(|e| {
                serde_json::json!({
                    "time": e.time,
                    "type": e.kind.to_code(),
                    "data": e.data,
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn html_page(input: &Path, options: &ExportOptions, theme: &Theme) -> Result<String> {
    let cast = Cast::load(input)?;
    let title = options
        .title
        .clone()
        .or_else(|| cast.header.title.clone())
        .unwrap_or_else(|| {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "recording".into())
        });

    let svg = thumbnail_svg(input, ThumbnailTime::Last, theme, options.scale)?;
    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\nbody {{ margin: 0; min-height: 100vh; display: flex; align-items: center; \
         justify-content: center; background: {bg}; }}\n</style>\n</head>\n<body>\n{svg}</body>\n</html>\n",
        title = crate::export::html_escape(&title),
        bg = theme.background.hex(),
        svg = svg
    ))
}

/// Escape text for HTML contexts.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Write `output` through a sibling temp file and an atomic rename.
///
/// On any error the temp file is removed and the destination is left
/// untouched.
pub(crate) fn write_atomic<F>(output: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut temp = output.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let result = (|| {
        let mut file = BufWriter::new(File::create(&temp)?);
        write(&mut file)?;
        file.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            if let Err(e) = std::fs::rename(&temp, output) {
                let _ = std::fs::remove_file(&temp);
                return Err(e.into());
            }
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&temp);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asciicast::{CastWriter, Event, Header};

    fn sample_cast(dir: &Path) -> PathBuf {
        let path = dir.join("sample.cast");
        let mut header = Header::new(20, 4);
        header.title = Some("demo".into());
        let mut writer = CastWriter::create(&path, &header).unwrap();
        writer
            .write_event(&Event::output(0.0, "hello\r\n"))
            .unwrap();
        writer
            .write_event(&Event::output(1.0, "\x1b[31mred\x1b[0m"))
            .unwrap();
        writer.write_event(&Event::marker(1.5, "end")).unwrap();
        writer.close().unwrap();
        path
    }

    #[test]
    fn format_inference_from_extension() {
        assert_eq!(
            OutputFormat::from_extension(Path::new("a.svg")),
            Some(OutputFormat::Svg)
        );
        assert_eq!(
            OutputFormat::from_extension(Path::new("a.MP4")),
            Some(OutputFormat::Mp4)
        );
        assert_eq!(OutputFormat::from_extension(Path::new("a.xyz")), None);
        assert_eq!(OutputFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn format_names_roundtrip_extensions() {
        for format in [
            OutputFormat::Cast,
            OutputFormat::Txt,
            OutputFormat::Json,
            OutputFormat::Html,
            OutputFormat::Svg,
            OutputFormat::Gif,
            OutputFormat::Mp4,
            OutputFormat::Webm,
        ] {
            assert_eq!(OutputFormat::from_name(format.extension()), Some(format));
        }
    }

    #[test]
    fn thumbnail_time_resolution() {
        assert_eq!(ThumbnailTime::First.resolve(10.0), 0.0);
        assert_eq!(ThumbnailTime::Middle.resolve(10.0), 5.0);
        assert_eq!(ThumbnailTime::Last.resolve(10.0), 10.0);
        assert_eq!(ThumbnailTime::At(3.0).resolve(10.0), 3.0);
        assert_eq!(ThumbnailTime::At(99.0).resolve(10.0), 10.0);
        assert_eq!(ThumbnailTime::At(-1.0).resolve(10.0), 0.0);
    }

    #[test]
    fn txt_export_writes_final_screen() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let options = ExportOptions {
            output: Some(dir.path().join("out.txt")),
            ..Default::default()
        };

        let written = export(&input, &options).unwrap();
        let text = std::fs::read_to_string(written).unwrap();
        assert!(text.contains("hello"));
        assert!(text.contains("red"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn json_export_contains_header_and_events() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let options = ExportOptions {
            output: Some(dir.path().join("out.json")),
            ..Default::default()
        };

        let written = export(&input, &options).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
        assert_eq!(doc["header"]["width"], 20);
        assert_eq!(doc["events"].as_array().unwrap().len(), 3);
        assert_eq!(doc["events"][2]["type"], "m");
    }

    #[test]
    fn svg_export_renders_final_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let options = ExportOptions {
            output: Some(dir.path().join("out.svg")),
            theme: "dracula".into(),
            ..Default::default()
        };

        let written = export(&input, &options).unwrap();
        let svg = std::fs::read_to_string(written).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("hello"));
        assert!(svg.contains("#282a36"));
    }

    #[test]
    fn html_export_embeds_svg() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let options = ExportOptions {
            output: Some(dir.path().join("out.html")),
            ..Default::default()
        };

        let written = export(&input, &options).unwrap();
        let html = std::fs::read_to_string(written).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<svg"));
        assert!(html.contains("<title>demo</title>"));
    }

    #[test]
    fn default_output_path_swaps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let options = ExportOptions {
            format: Some(OutputFormat::Txt),
            ..Default::default()
        };

        let written = export(&input, &options).unwrap();
        assert_eq!(written, dir.path().join("sample.txt"));
    }

    #[test]
    fn unknown_extension_without_format_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let options = ExportOptions {
            output: Some(dir.path().join("out.bin")),
            ..Default::default()
        };
        assert!(export(&input, &options).is_err());
    }

    #[test]
    fn thumbnail_middle_shows_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let theme = Theme::by_name("asciinema");

        // Middle of a 1.5s recording is 0.75s: before the red output.
        let svg = thumbnail_svg(&input, ThumbnailTime::Middle, theme, 1.0).unwrap();
        assert!(svg.contains("hello"));
        assert!(!svg.contains("red"));
    }

    #[test]
    fn thumbnail_scale_changes_output_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_cast(dir.path());
        let theme = Theme::by_name("asciinema");

        let svg = thumbnail_svg(&input, ThumbnailTime::Last, theme, 2.0).unwrap();
        let (w, _) = render::svg_size(20, 4);
        assert!(svg.contains(&format!("width=\"{}\"", (w * 2.0).round() as u32)));
    }

    #[test]
    fn write_atomic_removes_temp_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let result = write_atomic(&output, |_| Err(Error::Export("boom".into())));
        assert!(result.is_err());
        assert!(!output.exists());
        assert!(!dir.path().join("out.txt.tmp").exists());
    }

    #[test]
    fn write_atomic_leaves_existing_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        std::fs::write(&output, "original").unwrap();

        let _ = write_atomic(&output, |_| Err(Error::Export("boom".into())));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "original");
    }
}
