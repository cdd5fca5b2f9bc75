//! Log output for the `cine` binary.
//!
//! Logs go to stderr through a `tracing-subscriber` fmt layer. `RUST_LOG`
//! wins when set; otherwise the level comes from `--verbose` or the
//! `[logging] level` config key.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
