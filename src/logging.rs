//! Optional `tracing` subscriber setup for binaries and tests.
//!
//! The library itself only emits `tracing` events; wiring a subscriber
//! is the application's job. This helper covers the common case of a
//! CLI or tool server that wants `RUST_LOG`-controlled stderr output
//! without pulling `tracing-subscriber` in itself.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs.
///
/// # Examples
///
/// ```
/// fsbridge::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
