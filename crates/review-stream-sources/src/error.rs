use thiserror::Error;

/// Failure modes of the page transport. Timeouts are deliberately a
/// separate variant but carry the same retry semantics as network errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

impl TransportError {
    /// Whether the fetcher should retry with backoff. Client errors other
    /// than 429 will not get better on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. } | TransportError::Timeout { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}
