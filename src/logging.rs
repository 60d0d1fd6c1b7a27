//! Tracing subscriber setup for binaries and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the application. [`init_logging`] is a convenience for the
//! common case.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a global fmt subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Calling this
/// again after a subscriber is installed has no effect.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with `default_filter` used when `RUST_LOG` is unset.
pub fn init_logging_with_default(default_filter: &str) {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::trace!("Tracing subscriber already installed");
    }
}
