//! Diagnostics setup.
//!
//! Logging is off by default; setting the `DEBUG` environment variable to any
//! non-empty value turns on debug-level stderr output and backtraces. A
//! `RUST_LOG` filter, when present, overrides the default directive.

use tracing_subscriber::EnvFilter;

/// True when the `DEBUG` environment variable is set to a non-empty value.
pub fn diagnostics_enabled() -> bool {
    std::env::var("DEBUG").map(|v| !v.is_empty()).unwrap_or(false)
}

/// Initialize the tracing subscriber from the environment.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    if !diagnostics_enabled() {
        return;
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wincast=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
