use thiserror::Error;

/// Errors surfaced by the forecast fetch pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The refresh cycle was cancelled while a request was in flight.
    #[error("fetch aborted")]
    Aborted,

    /// The upstream returned 429 on every attempt.
    #[error("upstream rate limit (status 429)")]
    RateLimited,

    /// The upstream reported the daily request quota as exhausted.
    /// Retrying cannot help until the quota resets.
    #[error("daily api request limit exceeded")]
    DailyLimit,

    /// A non-retryable or retry-exhausted upstream failure.
    #[error("upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }

    pub fn is_daily_limit(&self) -> bool {
        matches!(self, FetchError::DailyLimit)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}
