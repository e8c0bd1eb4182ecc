use thiserror::Error;

/// Error taxonomy for the completion pipeline.
///
/// Every failed request surfaces as exactly one of these; malformed
/// intermediate stream frames are logged and dropped at the decoder
/// boundary instead (see `services::stream_decoder`).
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401 from the completion endpoint.
    #[error("invalid API key: {0}")]
    Authentication(String),

    /// HTTP 429 from the completion endpoint.
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// HTTP 5xx from the completion endpoint.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// Connection or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-2xx status, or a response body with an unexpected shape.
    #[error("unexpected response (status {status}): {message}")]
    Protocol { status: u16, message: String },

    /// Out-of-range parameter, empty model identifier, or a missing credential.
    #[error("invalid request: {0}")]
    Validation(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
