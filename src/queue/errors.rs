use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: status code {status_code}, message: {message}")]
    ServerError {
        status_code: u16,
        message: String,
    },

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("interrupted")]
    Interrupted,

    #[error("Transfer was cancelled")]
    Cancelled,

    #[error("Queue shutdown")]
    Shutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status_code,
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Error alias
pub type Result<T, E = QueueError> = std::result::Result<T, E>;
