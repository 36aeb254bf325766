//! Chunk sizing, byte ranges and file range reading for resumable uploads.
//!
//! Knows nothing about HTTP clients; `vidup-api` turns the ranges and
//! header values produced here into requests.

mod chunked;
mod progress;

pub use chunked::{
    ByteRange, ChunkReader, ChunkSize, content_range, content_type_for, parse_range_header,
};
pub use progress::SpeedCalculator;

/// Chunk sizes must be a multiple of this (256 KiB), except the last chunk.
pub const CHUNK_ALIGNMENT: u64 = 256 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid range header: {0}")]
    InvalidRange(String),

    #[error("range {start}+{len} outside file of {size} bytes")]
    OutOfBounds { start: u64, len: u64, size: u64 },
}
