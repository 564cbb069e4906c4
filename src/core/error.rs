use std::io;

#[derive(thiserror::Error, Debug)]
pub enum ShieldError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("empty batch: at least one url is required")]
    EmptyBatch,
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("timeout")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShieldError {
    /// Errors caused by what the caller passed in; retrying the same call cannot succeed.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ShieldError::InvalidInput(_) | ShieldError::EmptyBatch)
    }

    /// Errors a caller may retry with backoff. The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShieldError::ServiceUnavailable(_) | ShieldError::Timeout)
    }
}

impl From<reqwest::Error> for ShieldError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ShieldError::Timeout
        } else if err.is_connect() {
            ShieldError::ServiceUnavailable(err.to_string())
        } else if let Some(status) = err.status() {
            if status.is_server_error() {
                ShieldError::ServiceUnavailable(err.to_string())
            } else {
                ShieldError::Backend(err.to_string())
            }
        } else if err.is_decode() {
            ShieldError::Backend(err.to_string())
        } else {
            ShieldError::ServiceUnavailable(err.to_string())
        }
    }
}
