//! Structured logging glue.
//!
//! Engine crates log through the `tracing` macros re-exported here so that the
//! whole workspace agrees on one facade. Hosts that do not install a
//! subscriber pay only the disabled-callsite check.
//!
//! With the `tracing-json` feature, [`init_json_logging`] installs a JSON
//! subscriber filtered by `RUST_LOG` (defaulting to `warn`).

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Error returned when a global subscriber is already installed.
#[cfg(feature = "tracing-json")]
#[derive(Debug)]
pub struct LoggingInitError(Box<dyn std::error::Error + Send + Sync + 'static>);

#[cfg(feature = "tracing-json")]
impl std::fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to install tracing subscriber: {}", self.0)
    }
}

#[cfg(feature = "tracing-json")]
impl std::error::Error for LoggingInitError {}

/// Install a process-wide JSON subscriber.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> Result<(), LoggingInitError> {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init()
        .map_err(LoggingInitError)
}
