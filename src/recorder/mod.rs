//! Capture engine.
//!
//! A background sampler polls the console screen buffer on a fixed cadence,
//! turns each sample into an ANSI patch against the previous one, and
//! appends timestamped events to the recording. The foreground thread
//! (keyboard watch or launched command) talks to the sampler only through
//! two atomic flags and a single pending-marker slot, so no lock is ever
//! held across I/O.
//!
//! State machine: `Idle -> Recording <-> Paused -> Stopped`; Stopped is
//! terminal.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as InputEvent, KeyCode, KeyEventKind, KeyModifiers};
use tracing::{debug, warn};

use crate::asciicast::{CastWriter, Event, Header};
use crate::console::{ConsoleSession, Snapshot};
use crate::error::{Error, Result};

/// Sampling floor; polling the console faster than ~30 Hz only burns CPU.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(33);

/// How long `stop` waits for the sampler's final tick before detaching.
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Environment keys captured into the header by default.
const DEFAULT_ENV_KEYS: &[&str] = &["SHELL", "TERM"];

/// Recording configuration.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub title: Option<String>,
    pub command: Option<String>,
    /// Maximum inter-event gap preserved in the recording. `None`, zero,
    /// or negative values disable capping.
    pub idle_cap: Option<f64>,
    /// Sampling cadence, clamped to [`MIN_SAMPLE_INTERVAL`].
    pub sample_interval: Duration,
    pub captured_env_keys: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            title: None,
            command: None,
            idle_cap: None,
            sample_interval: Duration::from_millis(100),
            captured_env_keys: DEFAULT_ENV_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Capture engine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

/// Rendezvous between the foreground thread and the sampler.
struct Shared {
    stop: AtomicBool,
    paused: AtomicBool,
    pending_marker: Mutex<Option<String>>,
}

/// Records a console session to an asciicast file.
pub struct Recorder {
    config: RecorderConfig,
    state: RecorderState,
    shared: Arc<Shared>,
    sampler: Option<JoinHandle<()>>,
    done_rx: Option<mpsc::Receiver<Result<()>>>,
    marker_count: usize,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            state: RecorderState::Idle,
            shared: Arc::new(Shared {
                stop: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                pending_marker: Mutex::new(None),
            }),
            sampler: None,
            done_rx: None,
            marker_count: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Open the recording file, write the header, and launch the sampler.
    pub fn start(&mut self, path: &Path) -> Result<()> {
        if self.state != RecorderState::Idle {
            return Err(invalid_state("start", self.state));
        }

        let console = ConsoleSession::acquire()?;
        let (cols, rows) = console.window_size()?;
        let header = self.build_header(cols, rows);
        let writer = CastWriter::create(path, &header)?;

        let interval = self.config.sample_interval.max(MIN_SAMPLE_INTERVAL);
        let idle_cap = effective_cap(self.config.idle_cap);
        let shared = Arc::clone(&self.shared);
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("wincast-sampler".into())
            .spawn(move || {
                let result = run_sampler(console, writer, shared, interval, idle_cap);
                let _ = done_tx.send(result);
            })?;

        self.sampler = Some(handle);
        self.done_rx = Some(done_rx);
        self.state = RecorderState::Recording;
        debug!(cols, rows, "recording started");
        Ok(())
    }

    /// Suspend sampling; the cadence keeps running.
    pub fn pause(&mut self) {
        if self.state == RecorderState::Recording {
            self.shared.paused.store(true, Ordering::Release);
            self.state = RecorderState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == RecorderState::Paused {
            self.shared.paused.store(false, Ordering::Release);
            self.state = RecorderState::Recording;
        }
    }

    /// Deposit a marker label; the sampler emits it on its next tick.
    pub fn mark(&mut self, label: impl Into<String>) -> Result<()> {
        match self.state {
            RecorderState::Recording | RecorderState::Paused => {
                let mut slot = self.shared.pending_marker.lock().unwrap();
                *slot = Some(label.into());
                Ok(())
            }
            state => Err(invalid_state("mark", state)),
        }
    }

    /// Signal the sampler, wait for its final tick, and close out.
    ///
    /// Any I/O error the sampler hit surfaces here. A sampler that fails
    /// to exit within one second is detached rather than joined.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == RecorderState::Stopped || self.state == RecorderState::Idle {
            self.state = RecorderState::Stopped;
            return Ok(());
        }

        self.shared.stop.store(true, Ordering::Release);
        self.state = RecorderState::Stopped;

        let result = match self.done_rx.take() {
            Some(rx) => match rx.recv_timeout(STOP_TIMEOUT) {
                Ok(result) => {
                    if let Some(handle) = self.sampler.take() {
                        let _ = handle.join();
                    }
                    result
                }
                Err(_) => {
                    warn!("sampler did not stop in time; detaching");
                    self.sampler.take();
                    Ok(())
                }
            },
            None => Ok(()),
        };
        result
    }

    /// Record while a launched command runs; returns its exit code.
    ///
    /// The engine never kills the child: recording ends after the child
    /// exits, plus a drain window of three sample intervals so trailing
    /// output is captured.
    pub fn record_command(&mut self, path: &Path) -> Result<i32> {
        let command = self
            .config
            .command
            .clone()
            .ok_or_else(|| Error::Export("no command configured".into()))?;

        self.start(path)?;
        let status = spawn_shell(&command).and_then(|mut child| Ok(child.wait()?));

        let interval = self.config.sample_interval.max(MIN_SAMPLE_INTERVAL);
        thread::sleep(interval * 3);

        let stop_result = self.stop();
        let status = status?;
        stop_result?;
        Ok(status.code().unwrap_or(-1))
    }

    /// Record interactively until the user presses Ctrl+D.
    ///
    /// Ctrl+K drops a marker at the current offset. Input is watched with
    /// a non-blocking 50 ms poll so pause/stop stay responsive.
    pub fn record_interactive(&mut self, path: &Path) -> Result<()> {
        self.start(path)?;

        crossterm::terminal::enable_raw_mode()?;
        let watch = self.watch_keys();
        let _ = crossterm::terminal::disable_raw_mode();

        let stop_result = self.stop();
        watch?;
        stop_result
    }

    fn watch_keys(&mut self) -> Result<()> {
        loop {
            if self.shared.stop.load(Ordering::Acquire) {
                return Ok(());
            }
            if !event::poll(Duration::from_millis(50))? {
                continue;
            }
            if let InputEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                match key.code {
                    KeyCode::Char('d') if ctrl => return Ok(()),
                    KeyCode::Char('k') if ctrl => {
                        self.marker_count += 1;
                        let label = format!("marker {}", self.marker_count);
                        self.mark(label)?;
                    }
                    _ => {}
                }
            }
        }
    }

    fn build_header(&self, cols: u16, rows: u16) -> Header {
        let mut header = Header::new(cols, rows);
        header.timestamp = Some(chrono::Utc::now().timestamp());
        header.title = self.config.title.clone();
        header.command = self.config.command.clone();
        header.idle_time_limit = effective_cap(self.config.idle_cap);

        let env: BTreeMap<String, String> = self
            .config
            .captured_env_keys
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.clone(), v)))
            .collect();
        if !env.is_empty() {
            header.env = Some(env);
        }
        header
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.state == RecorderState::Recording || self.state == RecorderState::Paused {
            let _ = self.stop();
        }
    }
}

/// Sampler body: one tick per interval until stopped, then a final tick.
fn run_sampler(
    console: ConsoleSession,
    mut writer: CastWriter<std::io::BufWriter<std::fs::File>>,
    shared: Arc<Shared>,
    interval: Duration,
    idle_cap: Option<f64>,
) -> Result<()> {
    let started = Instant::now();
    let mut previous: Option<Snapshot> = None;
    let mut last_time = 0.0f64;
    let mut capture_warned = false;

    let run = loop {
        if shared.stop.load(Ordering::Acquire) {
            // Final tick so output between the last sample and stop is kept.
            let last = tick(
                &console,
                &mut writer,
                &shared,
                started,
                idle_cap,
                &mut previous,
                &mut last_time,
                &mut capture_warned,
            );
            break last;
        }

        thread::sleep(interval);

        if shared.paused.load(Ordering::Acquire) {
            continue;
        }

        if let Err(e) = tick(
            &console,
            &mut writer,
            &shared,
            started,
            idle_cap,
            &mut previous,
            &mut last_time,
            &mut capture_warned,
        ) {
            break Err(e);
        }
    };

    let close = writer.close();
    run.and(close)
}

/// One sampling tick: marker, resize, then the output delta.
#[allow(clippy::too_many_arguments)]
fn tick(
    console: &ConsoleSession,
    writer: &mut CastWriter<std::io::BufWriter<std::fs::File>>,
    shared: &Shared,
    started: Instant,
    idle_cap: Option<f64>,
    previous: &mut Option<Snapshot>,
    last_time: &mut f64,
    capture_warned: &mut bool,
) -> Result<()> {
    // The lock is released before any write happens.
    let pending = shared.pending_marker.lock().unwrap().take();
    if let Some(label) = pending {
        let time = capped_time(started.elapsed().as_secs_f64(), *last_time, idle_cap);
        writer.write_event(&Event::marker(time, label))?;
        *last_time = time;
    }

    let snapshot = match console.capture() {
        Ok(snapshot) => {
            *capture_warned = false;
            snapshot
        }
        Err(e) => {
            // Transient console trouble is retried next tick.
            if !*capture_warned {
                warn!(error = %e, "capture failed; will retry");
                *capture_warned = true;
            }
            return Ok(());
        }
    };

    if let Some(prev) = previous.as_ref() {
        if !snapshot.same_dimensions(prev) {
            let time = capped_time(started.elapsed().as_secs_f64(), *last_time, idle_cap);
            writer.write_event(&Event::resize(
                time,
                snapshot.width() as u16,
                snapshot.height() as u16,
            ))?;
            *last_time = time;
        }
    }

    let patch = snapshot.diff(previous.as_ref());
    if !patch.is_empty() {
        let time = capped_time(started.elapsed().as_secs_f64(), *last_time, idle_cap);
        writer.write_event(&Event::output(time, patch))?;
        *last_time = time;
    }

    *previous = Some(snapshot);
    Ok(())
}

/// Apply the idle cap to a monotonic offset.
///
/// Times never decrease; a gap larger than a positive cap is compressed to
/// exactly the cap.
fn capped_time(elapsed: f64, last: f64, idle_cap: Option<f64>) -> f64 {
    let time = elapsed.max(last);
    match idle_cap {
        Some(cap) if time - last > cap => last + cap,
        _ => time,
    }
}

/// Normalize the configured cap: zero and negative values disable capping.
fn effective_cap(cap: Option<f64>) -> Option<f64> {
    cap.filter(|&c| c > 0.0 && c.is_finite())
}

fn spawn_shell(command: &str) -> Result<std::process::Child> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    Ok(cmd.spawn()?)
}

fn invalid_state(operation: &str, state: RecorderState) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("cannot {} while {:?}", operation, state),
    ))
}
