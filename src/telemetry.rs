//! Diagnostic logging via `tracing`.
//!
//! The human-readable agent trace goes to stdout and is not affected by this
//! module. Diagnostics go to stderr, filtered by `RALPH_LOG` (default `warn`).
//! Set `RALPH_LOG_FORMAT=json` for one JSON object per event.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "RALPH_LOG";
pub const LOG_FORMAT_ENV: &str = "RALPH_LOG_FORMAT";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: tracing already initialized: {e}");
    }
}
