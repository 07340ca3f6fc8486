use thiserror::Error;

/// Error kinds as laid out by the adapter contract: transient upstream
/// failures are retried by the HTTP layer, permanent ones surface
/// immediately, and cancellation is not treated as an error at all.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    #[error("permanent upstream failure: {0}")]
    PermanentUpstream(String),

    #[error("request cancelled")]
    Cancellation,

    #[error("policy violation: {0}")]
    PolicyViolation(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Transient,
    Permanent,
    Cancellation,
}

impl AdapterError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TransientUpstream(_) => ErrorCategory::Transient,
            Self::PermanentUpstream(_) | Self::PolicyViolation(_) => ErrorCategory::Permanent,
            Self::Cancellation => ErrorCategory::Cancellation,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Builds a [`Self::PermanentUpstream`] with the URL and a truncated
    /// body snippet, matching the decode-failure diagnostic convention.
    pub fn decode_failure(url: &str, body: &[u8]) -> Self {
        let snippet: String = String::from_utf8_lossy(body).chars().take(200).collect();
        Self::PermanentUpstream(format!("failed to decode response from {url}: {snippet}"))
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
