//! Playback clock.
//!
//! Streams a recording's output events to a writer, sleeping the gap
//! between consecutive event times divided by the speed factor. Sleeps are
//! sliced into 50 ms quanta so pause and stop requests from another thread
//! take effect promptly. An infinite speed disables sleeping entirely,
//! which is what `cat` uses.
//!
//! State machine: `Idle -> Playing <-> Paused -> Stopped`.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::asciicast::{CastReader, EventKind};
use crate::error::Result;

/// Slice size for interruptible sleeps.
const SLEEP_QUANTUM: Duration = Duration::from_millis(50);

/// Playback options.
#[derive(Debug, Clone)]
pub struct PlayOptions {
    /// Speed factor; `f64::INFINITY` dumps without pacing.
    pub speed: f64,
    /// Cap on the real-time gap between events, applied before speed.
    pub idle_cap: Option<f64>,
    /// Hold playback at marker events until resumed.
    pub pause_on_markers: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            idle_cap: None,
            pause_on_markers: false,
        }
    }
}

/// Playback states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Cross-thread control surface for a running playback.
#[derive(Clone)]
pub struct PlaybackController {
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl PlaybackController {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn toggle_pause(&self) {
        self.paused.fetch_xor(true, Ordering::AcqRel);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Event-paced replayer.
pub struct PlaybackClock {
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    state: PlayerState,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            state: PlayerState::Idle,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Handle for pausing or stopping from another thread.
    pub fn controller(&self) -> PlaybackController {
        PlaybackController {
            stop: Arc::clone(&self.stop),
            paused: Arc::clone(&self.paused),
        }
    }

    /// Play a recording to `out`.
    ///
    /// Returns once the recording ends or a stop is requested; either way
    /// the clock ends up Stopped.
    pub fn play<R: BufRead, W: Write>(
        &mut self,
        reader: CastReader<R>,
        out: &mut W,
        options: &PlayOptions,
    ) -> Result<()> {
        self.state = PlayerState::Playing;
        let mut last_time = 0.0f64;

        for event in reader.events() {
            let event = event?;

            let mut gap = (event.time - last_time).max(0.0);
            if let Some(cap) = options.idle_cap.filter(|&c| c > 0.0) {
                gap = gap.min(cap);
            }
            last_time = event.time;

            if options.speed.is_finite() && options.speed > 0.0 {
                let wait = Duration::from_secs_f64(gap / options.speed);
                if !self.sleep_interruptible(wait) {
                    break;
                }
            }

            if !self.wait_while_paused() {
                break;
            }

            match event.kind {
                EventKind::Output => {
                    out.write_all(event.data.as_bytes())?;
                    out.flush()?;
                }
                EventKind::Marker if options.pause_on_markers => {
                    self.paused.store(true, Ordering::Release);
                    if !self.wait_while_paused() {
                        break;
                    }
                }
                _ => {}
            }
        }

        self.state = PlayerState::Stopped;
        Ok(())
    }

    /// Sleep in quanta; false means a stop arrived.
    fn sleep_interruptible(&mut self, mut remaining: Duration) -> bool {
        while remaining > Duration::ZERO {
            if self.stop.load(Ordering::Acquire) {
                return false;
            }
            let slice = remaining.min(SLEEP_QUANTUM);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        !self.stop.load(Ordering::Acquire)
    }

    /// Hold while paused; false means a stop arrived.
    fn wait_while_paused(&mut self) -> bool {
        while self.paused.load(Ordering::Acquire) {
            if self.stop.load(Ordering::Acquire) {
                return false;
            }
            self.state = PlayerState::Paused;
            std::thread::sleep(SLEEP_QUANTUM);
        }
        self.state = PlayerState::Playing;
        !self.stop.load(Ordering::Acquire)
    }
}
