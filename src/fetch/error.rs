use crate::source::error::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    // Anything that is not rate limiting or a server error, surfaced on first sight
    #[error("Request to the data source failed")]
    Transport(#[source] SourceError),

    #[error("Request to the data source still failing after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: SourceError,
    },

    #[error("Cancelled while waiting to retry after {attempts} attempts")]
    Cancelled {
        attempts: u32,
        #[source]
        source: SourceError,
    },
}

impl FetchError {
    /// The underlying data source error, whichever way it surfaced.
    pub fn source_error(&self) -> &SourceError {
        match self {
            FetchError::Transport(source)
            | FetchError::RetryExhausted { source, .. }
            | FetchError::Cancelled { source, .. } => source,
        }
    }
}
