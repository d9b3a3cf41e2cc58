//! Console adapter.
//!
//! Reads cells, attributes, and the cursor straight out of the host
//! console's screen buffer — no pseudo-terminal sits between the recorded
//! shell and the recorder. The adapter is the only platform-specific code
//! in the crate; everything downstream works on [`Snapshot`] values.

pub mod attr;
mod snapshot;

pub use attr::{attributes_from_style, style_from_attributes};
pub use snapshot::{sgr_sequence, Snapshot, FULL_REDRAW_RATIO};

use crate::error::Result;

/// A scoped handle to the host console.
///
/// Acquisition opens the output handle and enables virtual-terminal
/// processing; drop restores the original console mode best-effort. The
/// handle itself is process-global and not owned.
pub struct ConsoleSession {
    #[cfg(windows)]
    inner: windows::WinConsole,
}

impl ConsoleSession {
    /// Acquire the console for the current process.
    ///
    /// Fails with [`crate::Error::Platform`] on non-Windows builds and with
    /// [`crate::Error::ConsoleUnavailable`] when the process has no
    /// console (redirected output, detached service).
    pub fn acquire() -> Result<Self> {
        #[cfg(windows)]
        {
            Ok(Self {
                inner: windows::WinConsole::acquire()?,
            })
        }
        #[cfg(not(windows))]
        {
            Err(crate::error::Error::Platform)
        }
    }

    /// Current visible window size as (cols, rows).
    pub fn window_size(&self) -> Result<(u16, u16)> {
        #[cfg(windows)]
        {
            self.inner.window_size()
        }
        #[cfg(not(windows))]
        {
            unreachable!("ConsoleSession cannot be constructed off Windows")
        }
    }

    /// Read the visible window as one logical sample.
    ///
    /// Window dimensions are measured before and after the cell read; if a
    /// racing resize changes them the sample is discarded and retried once
    /// before the mismatch surfaces as an error.
    pub fn capture(&self) -> Result<Snapshot> {
        #[cfg(windows)]
        {
            self.inner.capture()
        }
        #[cfg(not(windows))]
        {
            unreachable!("ConsoleSession cannot be constructed off Windows")
        }
    }
}

#[cfg(windows)]
mod windows {
    //! Win32 console plumbing.

    use tracing::debug;
    use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Console::{
        GetConsoleMode, GetConsoleScreenBufferInfo, GetStdHandle, ReadConsoleOutputW,
        SetConsoleMode, CHAR_INFO, CONSOLE_SCREEN_BUFFER_INFO, COORD,
        ENABLE_VIRTUAL_TERMINAL_PROCESSING, SMALL_RECT, STD_OUTPUT_HANDLE,
    };

    use crate::error::{Error, Result};
    use crate::terminal::Cell;

    use super::attr::style_from_attributes;
    use super::Snapshot;

    pub(super) struct WinConsole {
        handle: HANDLE,
        original_mode: Option<u32>,
    }

    // The std handle is process-global; reading buffer state from another
    // thread is what the sampler exists to do.
    unsafe impl Send for WinConsole {}

    impl WinConsole {
        pub(super) fn acquire() -> Result<Self> {
            let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
            if handle == INVALID_HANDLE_VALUE || handle.is_null() {
                return Err(Error::ConsoleUnavailable(
                    "no standard output handle".into(),
                ));
            }

            let mut console = Self {
                handle,
                original_mode: None,
            };
            console.enable_vt_output();
            // Probe once so a redirected handle fails at acquisition, not
            // mid-recording.
            console.buffer_info()?;
            Ok(console)
        }

        /// Put the output handle into virtual-terminal mode.
        ///
        /// Idempotent; already-enabled is not a failure, and neither is a
        /// console old enough to reject the flag.
        fn enable_vt_output(&mut self) {
            let mut mode: u32 = 0;
            if unsafe { GetConsoleMode(self.handle, &mut mode) } == 0 {
                return;
            }
            if mode & ENABLE_VIRTUAL_TERMINAL_PROCESSING != 0 {
                return;
            }
            if unsafe { SetConsoleMode(self.handle, mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING) }
                != 0
            {
                self.original_mode = Some(mode);
            }
        }

        fn buffer_info(&self) -> Result<CONSOLE_SCREEN_BUFFER_INFO> {
            let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
            if unsafe { GetConsoleScreenBufferInfo(self.handle, &mut info) } == 0 {
                return Err(Error::ConsoleUnavailable(format!(
                    "GetConsoleScreenBufferInfo failed (os error {})",
                    std::io::Error::last_os_error()
                        .raw_os_error()
                        .unwrap_or(0)
                )));
            }
            Ok(info)
        }

        pub(super) fn window_size(&self) -> Result<(u16, u16)> {
            let info = self.buffer_info()?;
            let cols = (info.srWindow.Right - info.srWindow.Left + 1).max(1) as u16;
            let rows = (info.srWindow.Bottom - info.srWindow.Top + 1).max(1) as u16;
            Ok((cols, rows))
        }

        pub(super) fn capture(&self) -> Result<Snapshot> {
            match self.capture_once() {
                Ok(Some(snapshot)) => Ok(snapshot),
                Ok(None) => {
                    // Window resized underneath the read; one retry.
                    debug!("discarding torn capture after resize, retrying");
                    match self.capture_once()? {
                        Some(snapshot) => Ok(snapshot),
                        None => Err(Error::ConsoleUnavailable(
                            "console resizing during capture".into(),
                        )),
                    }
                }
                Err(e) => Err(e),
            }
        }

        /// One capture attempt; `Ok(None)` means a resize tore the sample.
        fn capture_once(&self) -> Result<Option<Snapshot>> {
            let before = self.buffer_info()?;
            let window = before.srWindow;
            let width = (window.Right - window.Left + 1).max(1) as usize;
            let height = (window.Bottom - window.Top + 1).max(1) as usize;

            let mut chars: Vec<CHAR_INFO> = vec![unsafe { std::mem::zeroed() }; width * height];
            let buffer_size = COORD {
                X: width as i16,
                Y: height as i16,
            };
            let buffer_coord = COORD { X: 0, Y: 0 };
            let mut read_region = SMALL_RECT {
                Left: window.Left,
                Top: window.Top,
                Right: window.Right,
                Bottom: window.Bottom,
            };

            let ok = unsafe {
                ReadConsoleOutputW(
                    self.handle,
                    chars.as_mut_ptr(),
                    buffer_size,
                    buffer_coord,
                    &mut read_region,
                )
            };
            if ok == 0 {
                return Err(Error::ConsoleUnavailable(
                    "ReadConsoleOutputW failed".into(),
                ));
            }

            let after = self.buffer_info()?;
            if after.srWindow.Right - after.srWindow.Left != window.Right - window.Left
                || after.srWindow.Bottom - after.srWindow.Top != window.Bottom - window.Top
            {
                return Ok(None);
            }

            let cells: Vec<Cell> = chars
                .iter()
                .map(|ci| {
                    let code = unsafe { ci.Char.UnicodeChar };
                    let glyph = char::from_u32(code as u32).unwrap_or(' ');
                    let glyph = if glyph == '\0' { ' ' } else { glyph };
                    Cell::new(glyph, style_from_attributes(ci.Attributes))
                })
                .collect();

            let cursor_x = (after.dwCursorPosition.X - window.Left)
                .clamp(0, width as i16 - 1) as usize;
            let cursor_y = (after.dwCursorPosition.Y - window.Top)
                .clamp(0, height as i16 - 1) as usize;

            Ok(Some(Snapshot::new(width, height, cursor_x, cursor_y, cells)))
        }
    }

    impl Drop for WinConsole {
        fn drop(&mut self) {
            if let Some(mode) = self.original_mode {
                unsafe { SetConsoleMode(self.handle, mode) };
            }
        }
    }
}
