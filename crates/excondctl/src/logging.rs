//! Diagnostics logging for excondctl
//!
//! Logs go to stderr so stdout carries nothing but the report.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Precedence: explicit `--log-level`, then `$RUST_LOG`, then the configured
/// level. Calling this twice is harmless; the first subscriber stays.
pub fn init(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
