//! Console logging setup

use crate::runner::Verbosity;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the verbosity flags
pub const LOG_ENV_VAR: &str = "RUST_LOG";

/// Filter for the given verbosity unless `RUST_LOG` is set
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber, writing to stderr
///
/// Calling this twice is harmless; the second call keeps the first subscriber.
pub fn init_logging(verbosity: Verbosity) {
    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(console_layer)
        .try_init();
}
