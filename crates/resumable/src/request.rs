//! The transfer-request seam and the error classification rules.

use std::future::Future;
use std::pin::Pin;

use crate::policy::RETRIABLE_STATUS_CODES;

/// Boxed future returned by [`TransferRequest::send_next_chunk`].
pub type ChunkFuture<'a> = Pin<Box<dyn Future<Output = Result<ChunkStatus, ChunkError>> + Send + 'a>>;

/// An in-progress resumable upload.
///
/// Implementations track their own byte offset and chunk granularity. The
/// driver only ever calls [`send_next_chunk`](Self::send_next_chunk), one
/// call at a time, until it yields [`ChunkStatus::Complete`] or an error
/// the driver decides not to retry.
pub trait TransferRequest: Send {
    /// Sends the next chunk (or resumes after a failure) and reports where
    /// the upload stands.
    fn send_next_chunk(&mut self) -> ChunkFuture<'_>;
}

impl<T: TransferRequest + ?Sized> TransferRequest for Box<T> {
    fn send_next_chunk(&mut self) -> ChunkFuture<'_> {
        (**self).send_next_chunk()
    }
}

/// Bytes confirmed by the remote side so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl Progress {
    /// Fraction of the payload confirmed, in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Result of a successful chunk send.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkStatus {
    /// The chunk was accepted and more remain.
    InProgress(Progress),
    /// The remote side reported the upload finished. Carries its final
    /// response body, which should expose an `id` field.
    Complete(serde_json::Value),
}

/// A failed chunk send, as reported by the transfer request.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level fault: reset, refused, timed out, malformed status
    /// line, truncated body, or any error from the HTTP library itself.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the driver treats a [`ChunkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retriable HTTP status (500, 502, 503, 504).
    TransientProtocol,
    /// Connection-level fault. Always retried regardless of any status.
    TransientTransport,
    /// Any other HTTP status. Never retried.
    FatalProtocol,
}

impl ErrorClass {
    pub fn is_transient(self) -> bool {
        !matches!(self, ErrorClass::FatalProtocol)
    }
}

impl ChunkError {
    /// Classifies the error for retry decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            ChunkError::Http { status, .. } if RETRIABLE_STATUS_CODES.contains(status) => {
                ErrorClass::TransientProtocol
            }
            ChunkError::Http { .. } => ErrorClass::FatalProtocol,
            ChunkError::Transport(_) | ChunkError::Io(_) => ErrorClass::TransientTransport,
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChunkError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
