//! wincast - CLI entry point

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use crossterm::event::{self, Event as InputEvent, KeyCode, KeyEventKind, KeyModifiers};

use wincast::asciicast::{read_info, CastReader};
use wincast::export::{export, ExportOptions, OutputFormat};
use wincast::player::{PlayOptions, PlaybackClock, PlaybackController};
use wincast::recorder::{Recorder, RecorderConfig};
use wincast::{logging, Error};

#[derive(Parser)]
#[command(name = "wincast")]
#[command(about = "Record Windows console sessions and export them as images or video")]
#[command(
    long_about = "wincast records an interactive Windows console session into an
asciicast v2 file by sampling the console screen buffer, and turns
recordings into text, SVG, HTML, GIF, MP4, or WebM.

QUICK START:
    wincast rec demo.cast                Record until Ctrl+D (Ctrl+K marks)
    wincast rec -c \"dir /s\" demo.cast    Record a single command
    wincast play demo.cast               Replay at original speed
    wincast export demo.cast -o demo.gif Render an animated GIF

Set DEBUG=1 for verbose diagnostics on stderr."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a console session
    #[command(long_about = "Record the current console into an asciicast v2 file.

Without --command the session is interactive: your shell keeps running
and wincast samples the screen until you press Ctrl+D. Ctrl+K drops a
marker at the current offset. With --command the given command is
launched and recording stops when it exits.

EXAMPLES:
    wincast rec session.cast
    wincast rec --command \"cargo build\" build.cast
    wincast rec --idle-time-limit 2 --title demo session.cast")]
    Rec {
        /// Output .cast path
        path: PathBuf,
        /// Recording title stored in the header
        #[arg(long)]
        title: Option<String>,
        /// Command to record instead of an interactive session
        #[arg(long, short = 'c')]
        command: Option<String>,
        /// Cap recorded idle time between events, in seconds
        #[arg(long)]
        idle_time_limit: Option<f64>,
        /// Overwrite the output file if it exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Replay a recording to the terminal
    #[command(long_about = "Replay a recording to stdout with original timing.

Space pauses and resumes, q stops. --pause-on-markers holds playback at
every marker until you press space.

EXAMPLES:
    wincast play session.cast
    wincast play --speed 2 session.cast
    wincast play --idle-time-limit 1 --pause-on-markers session.cast")]
    Play {
        /// Recording to play
        path: PathBuf,
        /// Speed factor (2.0 plays twice as fast)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Cap replayed idle time between events, in seconds
        #[arg(long)]
        idle_time_limit: Option<f64>,
        /// Pause at every marker until resumed
        #[arg(long)]
        pause_on_markers: bool,
    },

    /// Dump a recording's output instantly
    #[command(long_about = "Write every output event to stdout with no pacing and no
terminal mode changes. Equivalent to play --speed infinity.")]
    Cat {
        /// Recording to dump
        path: PathBuf,
    },

    /// Show recording metadata
    #[command(long_about = "Print header fields, duration, and event count.

EXAMPLE:
    wincast info session.cast")]
    Info {
        /// Recording to inspect
        path: PathBuf,
    },

    /// Convert a recording to another format
    #[command(long_about = "Convert a recording. The format comes from --format or the
output extension: .cast .txt .json .html .svg .gif .mp4 .webm.

Video formats need ffmpeg on PATH (or FFMPEG_PATH pointing at it).

EXAMPLES:
    wincast export session.cast -o session.svg
    wincast export session.cast -o session.gif --fps 20 --theme dracula
    wincast export session.cast --format txt")]
    Export {
        /// Recording to convert
        path: PathBuf,
        /// Output format (overrides extension inference)
        #[arg(long, short = 'f')]
        format: Option<String>,
        /// Output path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Replacement title
        #[arg(long)]
        title: Option<String>,
        /// Frames per second for video formats
        #[arg(long, default_value_t = 15)]
        fps: u32,
        /// Color theme for rendered formats
        #[arg(long, default_value = "asciinema")]
        theme: String,
        /// Scale factor for SVG output
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },

    /// Print version information
    Version,
}

fn main() -> ExitCode {
    logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            // Single error line on stderr, usage on stdout, exit 1.
            eprintln!("wincast: {}", e.kind());
            let _ = Cli::command().print_help();
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if logging::diagnostics_enabled() {
                eprintln!("wincast: {:?}", e);
            } else {
                eprintln!("wincast: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Rec {
            path,
            title,
            command,
            idle_time_limit,
            overwrite,
        } => cmd_rec(path, title, command, idle_time_limit, overwrite),
        Commands::Play {
            path,
            speed,
            idle_time_limit,
            pause_on_markers,
        } => cmd_play(path, speed, idle_time_limit, pause_on_markers),
        Commands::Cat { path } => cmd_cat(path),
        Commands::Info { path } => cmd_info(path),
        Commands::Export {
            path,
            format,
            output,
            title,
            fps,
            theme,
            scale,
        } => cmd_export(path, format, output, title, fps, theme, scale),
        Commands::Version => {
            println!("wincast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cmd_rec(
    path: PathBuf,
    title: Option<String>,
    command: Option<String>,
    idle_time_limit: Option<f64>,
    overwrite: bool,
) -> Result<()> {
    if path.exists() && !overwrite {
        bail!(
            "{} already exists (pass --overwrite to replace it)",
            path.display()
        );
    }

    let config = RecorderConfig {
        title,
        command: command.clone(),
        idle_cap: idle_time_limit,
        ..Default::default()
    };
    let mut recorder = Recorder::new(config);

    if command.is_some() {
        let code = recorder
            .record_command(&path)
            .context("recording failed")?;
        eprintln!("wrote {} (command exited with {})", path.display(), code);
    } else {
        eprintln!("recording; Ctrl+D stops, Ctrl+K drops a marker");
        recorder
            .record_interactive(&path)
            .context("recording failed")?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_play(
    path: PathBuf,
    speed: f64,
    idle_time_limit: Option<f64>,
    pause_on_markers: bool,
) -> Result<()> {
    if !(speed > 0.0) {
        bail!("speed must be positive");
    }

    let reader = CastReader::open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let options = PlayOptions {
        speed,
        idle_cap: idle_time_limit,
        pause_on_markers,
    };

    let mut clock = PlaybackClock::new();
    let controller = clock.controller();
    let keys = spawn_key_watch(controller.clone());

    let mut stdout = std::io::stdout();
    let result = clock.play(reader, &mut stdout, &options);
    let _ = stdout.flush();

    // Release the watcher: it polls the stop flag every 50 ms.
    controller.stop();
    if let Some(handle) = keys {
        let _ = handle.join();
    }
    result.map_err(Into::into)
}

/// Watch for space (pause/resume) and q / Ctrl+C (stop) while playing.
///
/// Silently does nothing when the terminal cannot enter raw mode, so piped
/// playback keeps working.
fn spawn_key_watch(controller: PlaybackController) -> Option<std::thread::JoinHandle<()>> {
    if crossterm::terminal::enable_raw_mode().is_err() {
        return None;
    }

    Some(std::thread::spawn(move || {
        while !controller.is_stopped() {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => {
                    if let Ok(InputEvent::Key(key)) = event::read() {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        match key.code {
                            KeyCode::Char(' ') => controller.toggle_pause(),
                            KeyCode::Char('q') => controller.stop(),
                            KeyCode::Char('c')
                                if key.modifiers.contains(KeyModifiers::CONTROL) =>
                            {
                                controller.stop();
                            }
                            _ => {}
                        }
                    }
                }
                Ok(false) => {}
                Err(_) => break,
            }
        }
        let _ = crossterm::terminal::disable_raw_mode();
    }))
}

fn cmd_cat(path: PathBuf) -> Result<()> {
    let reader = CastReader::open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let options = PlayOptions {
        speed: f64::INFINITY,
        idle_cap: None,
        pause_on_markers: false,
    };
    let mut stdout = std::io::stdout();
    PlaybackClock::new()
        .play(reader, &mut stdout, &options)
        .map_err(Into::into)
}

fn cmd_info(path: PathBuf) -> Result<()> {
    let info = read_info(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let header = &info.header;

    println!("version:   {}", header.version);
    println!("size:      {}x{}", header.width, header.height);
    println!("duration:  {:.2}s", info.duration);
    println!("events:    {}", info.event_count);
    if let Some(title) = &header.title {
        println!("title:     {}", title);
    }
    if let Some(command) = &header.command {
        println!("command:   {}", command);
    }
    if let Some(timestamp) = header.timestamp {
        println!("timestamp: {}", timestamp);
    }
    if let Some(limit) = header.idle_time_limit {
        println!("idle cap:  {}s", limit);
    }
    if let Some(env) = &header.env {
        for (key, value) in env {
            println!("env:       {}={}", key, value);
        }
    }
    Ok(())
}

fn cmd_export(
    path: PathBuf,
    format: Option<String>,
    output: Option<PathBuf>,
    title: Option<String>,
    fps: u32,
    theme: String,
    scale: f64,
) -> Result<()> {
    let format = match format {
        Some(name) => Some(
            OutputFormat::from_name(&name)
                .ok_or_else(|| Error::Export(format!("unknown format {:?}", name)))?,
        ),
        None => None,
    };

    let options = ExportOptions {
        format,
        output,
        title,
        fps,
        theme,
        scale,
    };
    let written = export(&path, &options)
        .with_context(|| format!("cannot export {}", path.display()))?;
    eprintln!("wrote {}", written.display());
    Ok(())
}
