use cam_console_shared::HttpClientError;
use thiserror::Error;

/// Classified outcome of a failed settings dispatch.
///
/// This is the engine's error taxonomy: every transport or protocol failure
/// a dispatch can hit collapses into one of these three, and stream faults
/// never appear here at all (the watchdog owns those).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The request never completed: connect failure, DNS, or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered and said no: a `success: false` body or a
    /// non-2xx status with error text.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// The response body did not parse as the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<HttpClientError> for DispatchError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Timeout => DispatchError::Network("request timed out".to_string()),
            HttpClientError::Connection(msg) | HttpClientError::Http(msg) => {
                DispatchError::Network(msg)
            }
            HttpClientError::ServerError { status, message } => {
                DispatchError::Rejected(format!("status {status}: {message}"))
            }
            HttpClientError::Parse(msg) => DispatchError::Malformed(msg),
        }
    }
}

/// Fatal engine conditions.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The update consumer went away while the engine was running.
    #[error("update channel closed")]
    UpdatesClosed,

    /// The engine task ended abnormally.
    #[error("engine task failed: {0}")]
    Task(String),
}
