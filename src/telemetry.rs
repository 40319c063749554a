//! Tracing subscriber setup for binaries.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "TOOLPLEX_LOG";

/// Filter applied when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the log filter from [`LOG_ENV`], falling back to `fallback`.
#[must_use]
pub fn env_filter(fallback: &str) -> EnvFilter {
    filter_from(std::env::var(LOG_ENV).ok().as_deref(), fallback)
}

/// Parses `directive`, using `fallback` when it is absent or invalid.
fn filter_from(directive: Option<&str>, fallback: &str) -> EnvFilter {
    directive
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Installs a formatted subscriber writing to stderr.
///
/// Stdout stays free for command output. Calling this twice keeps the first
/// subscriber.
pub fn init_tracing(fallback: &str) {
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter(fallback))
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
