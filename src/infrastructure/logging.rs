//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr.
///
/// `verbosity` is the count of `-v` flags and raises the level above
/// the configured default; `RUST_LOG` wins over both when set.
pub fn init(default_level: &str, verbosity: u8) {
    let level = match verbosity {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
