//! LM provider error taxonomy (spec §6: "LM Provider Adapter").

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

impl LmError {
    /// Retryable set: `RateLimited`, `Timeout`, `Network`, `Server(5xx)`.
    pub fn is_retryable(&self) -> bool {
        match self {
            LmError::RateLimited { .. } => true,
            LmError::Timeout(_) => true,
            LmError::Network(_) => true,
            LmError::Server { status, .. } => *status >= 500,
            LmError::Auth(_) => false,
            LmError::BadRequest(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LmError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_and_server_5xx_are_retryable() {
        assert!(LmError::RateLimited { retry_after: None }.is_retryable());
        assert!(LmError::Server { status: 503, message: "down".into() }.is_retryable());
        assert!(!LmError::Server { status: 400, message: "bad".into() }.is_retryable());
    }

    #[test]
    fn auth_and_bad_request_are_not_retryable() {
        assert!(!LmError::Auth("bad key".into()).is_retryable());
        assert!(!LmError::BadRequest("malformed".into()).is_retryable());
    }

    #[test]
    fn retry_after_only_set_on_rate_limited() {
        let err = LmError::RateLimited { retry_after: Some(Duration::from_secs(5)) };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(LmError::Timeout(Duration::from_secs(1)).retry_after(), None);
    }
}
