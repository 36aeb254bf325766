//! Publish error types.

/// Errors produced while publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("collection error: {0}")]
    Collection(String),

    #[error("cannot prepare upload: {0}")]
    Prepare(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("cancelled")]
    Cancelled,
}
