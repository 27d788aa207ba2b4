use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Errors that terminate the relay process. Per-message transient failures
/// never surface here; they are folded into the batch outcome and logged.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("could not install statsd recorder: {0}")]
    Metrics(String),

    #[error("could not start runtime: {0}")]
    Runtime(String),
}
