//! Logging utilities

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted when `RUST_LOG` is unset
pub const LOG_LEVEL_ENV: &str = "PATSIM_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";

/// Build the filter: `RUST_LOG` first, then `PATSIM_LOG_LEVEL`, then `info`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    })
}

/// Initialize logging with tracing
///
/// Output goes to stderr so stdout stays free for the run summary. Calling
/// this more than once is harmless; later calls keep the first subscriber.
pub fn init_logging() {
    let result = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
