//! Resumable upload driver.
//!
//! Drives an opaque, resumable chunked-upload handle ([`TransferRequest`])
//! to completion. Transient failures (5xx gateway/server errors and
//! transport faults) are retried with exponential backoff and jitter;
//! anything else aborts the session immediately.
//!
//! The driver knows nothing about HTTP, files or chunk sizes. Concrete
//! requests live in `vidup-api`; orchestration across many videos lives
//! in `vidup-publish`.

mod driver;
mod policy;
mod request;
mod session;

pub use driver::{AbortReason, ResumableUploadDriver, UploadEvent, UploadOutcome};
pub use policy::{DEFAULT_MAX_RETRIES, RETRIABLE_STATUS_CODES, RetryPolicy};
pub use request::{ChunkError, ChunkFuture, ChunkStatus, ErrorClass, Progress, TransferRequest};
pub use session::{SessionState, UploadSession};
