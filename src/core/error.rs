//! Application-wide error types.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    /// Identifier failed local validation — dropped before any side effect.
    #[error("invalid identifier: {0}")]
    InvalidInn(String),

    /// Hard timeout elapsed with zero inbound messages.
    #[error("no response from the risk responder")]
    NoResponse,

    /// Transport-wide throttle. The dispatch loop pauses; the job is dropped.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("notify error: {0}")]
    Notify(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn invalid_inn_display() {
        let e = AppError::InvalidInn("abc".into());
        assert!(e.to_string().contains("abc"));
    }

    #[test]
    fn rate_limited_display() {
        let e = AppError::RateLimited {
            retry_after: Duration::from_secs(30),
        };
        assert!(e.to_string().contains("rate limited"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        // satisfies std::error::Error trait
        let _: &dyn Error = &e;
    }
}
