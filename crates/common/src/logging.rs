//! Tracing setup for an embedding host.
//!
//! A session is usually one component of a larger application, so the filter
//! comes from [`LoggingConfig::level`] alone and `RUST_LOG` is ignored: the
//! host's config file decides how chatty the engine is. Output goes to
//! stderr, leaving stdout to the host.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

const FALLBACK_LEVEL: &str = "info";

/// Install the global subscriber. Later calls keep the first subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let (filter, rejected) = level_filter(&config.level);

    let installed = if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };

    if let (true, Some(level)) = (installed, rejected) {
        tracing::warn!(level = %level, fallback = FALLBACK_LEVEL, "Invalid log filter");
    }
}

/// Parse a filter directive. An unparsable one yields the fallback level and
/// is handed back so it can be reported once a subscriber exists.
fn level_filter(level: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new(FALLBACK_LEVEL), Some(level.to_string())),
    }
}
