//! Logging setup for hosts embedding the completion core.
//!
//! The core only emits `tracing` events; installing a subscriber is left to
//! the host. This helper installs the same `fmt` subscriber the shell uses,
//! driven by [`LoggingConfig`].

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a global `fmt` subscriber configured from `config`.
///
/// `RUST_LOG` overrides the configured level when set. Returns `false` if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_tracing_level().to_string()));

    // Build subscriber with level filter
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // Configure timestamps
    if config.timestamps {
        subscriber.try_init().is_ok()
    } else {
        subscriber.without_time().try_init().is_ok()
    }
}
