use thiserror::Error;

/// Failures surfaced by the client. None of them is fatal to the process:
/// each one degrades a single feature of the session.
#[derive(Debug, Error)]
pub enum AppError {
    /// A collaborator HTTP call failed (network, status or body).
    #[error("request failed: {0}")]
    FetchFailed(String),

    /// The endpoint or runtime cannot carry a real-time socket.
    #[error("real-time connections are not supported: {0}")]
    UnsupportedTransport(String),

    #[error("not connected")]
    NotConnected,

    /// An inbound frame could not be decoded into a chat message.
    #[error("malformed frame: {0}")]
    DecodeFailed(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
