use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}: {body}")]
    HttpStatus {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to decode response body from {0}")]
    Decode(String, #[source] reqwest::Error),
}

impl SourceError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SourceError::HttpStatus { status, .. } => Some(*status),
            SourceError::NetworkRequest(_, e) | SourceError::Decode(_, e) => e.status(),
        }
    }

    /// Only rate limiting (429) and server-side failures (5xx) are worth
    /// another attempt. Connection and decode failures are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            SourceError::NetworkRequest(..) | SourceError::Decode(..) => false,
        }
    }
}
