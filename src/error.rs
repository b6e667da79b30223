/// Boxed error used at the body and transport seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single physical send.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// Error from any other transport implementation.
    #[error("transport error: {0}")]
    Other(BoxError),
}

impl TransportError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

/// Terminal error of a logical request.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// The request body could not be rewound for another attempt.
    #[error("failed to get request body for retry: {0}")]
    BodyReplay(#[source] BoxError),
    /// Reading a discarded response body to the end failed.
    #[error("failed to discard response body: {0}")]
    Drain(#[source] BoxError),
    /// Closing a discarded response body failed.
    #[error("failed to close response body: {0}")]
    Close(#[source] BoxError),
    /// The last attempt failed before producing a response.
    #[error("all retries failed; last error: {0}")]
    Transport(#[source] TransportError),
    /// The last attempt returned a 5xx response.
    #[error("all retry attempts failed: last attempt failed with status {status}")]
    Exhausted { status: u16 },
    /// Attempts ran out without a recorded outcome.
    #[error("all retry attempts failed")]
    AllRetriesFailed,
    /// The request deadline passed during a send or a wait.
    #[error("request deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: usize },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Reading a returned response body failed.
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),
}
