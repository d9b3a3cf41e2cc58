//! Error types for wincast operations.

use thiserror::Error;

/// Main error type.
///
/// The capture engine and export pipeline are the propagation boundaries;
/// the emulator and renderers never fail on ordinary input.
#[derive(Debug, Error)]
pub enum Error {
    /// The process has no console, or the handle is not a console.
    #[error("console unavailable: {0}")]
    ConsoleUnavailable(String),

    /// Capture was requested on a platform without a Windows console.
    #[error("console capture requires Windows")]
    Platform,

    /// Malformed header or unsupported recording version.
    #[error("invalid cast file: {0}")]
    Format(String),

    /// Read or write failure on a recording or output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported output format, missing muxer, or muxer failure.
    #[error("export failed: {0}")]
    Export(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
