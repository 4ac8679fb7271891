//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,segue=debug,wgpu=warn,naga=warn";

/// Initialize the global tracing subscriber.
///
/// Filtering comes from `RUST_LOG` when present, otherwise [`DEFAULT_FILTER`].
/// Calling this twice is harmless; the second call leaves the first subscriber
/// in place.
///
/// # Example
/// ```no_run
/// segue::init_logging();
/// tracing::info!("ready");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
