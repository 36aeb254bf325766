use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::{CHUNK_ALIGNMENT, TransferError};

// ---------------------------------------------------------------------------
// Chunk sizing
// ---------------------------------------------------------------------------

/// How much of the file each request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkSize {
    /// Send everything that remains in a single request.
    #[default]
    Whole,
    /// Fixed-size chunks, a multiple of [`CHUNK_ALIGNMENT`].
    Bytes(u64),
}

impl ChunkSize {
    /// Builds a chunk size from a byte count. `0` means [`ChunkSize::Whole`];
    /// anything else is rounded down to a multiple of [`CHUNK_ALIGNMENT`],
    /// with one alignment unit as the minimum.
    pub fn from_bytes(bytes: u64) -> Self {
        if bytes == 0 {
            return ChunkSize::Whole;
        }
        let aligned = (bytes / CHUNK_ALIGNMENT).max(1) * CHUNK_ALIGNMENT;
        ChunkSize::Bytes(aligned)
    }

    /// Range to send next, starting at `offset`. `None` once `offset`
    /// reaches `total`.
    pub fn next_range(&self, offset: u64, total: u64) -> Option<ByteRange> {
        if offset >= total {
            return None;
        }
        let remaining = total - offset;
        let len = match self {
            ChunkSize::Whole => remaining,
            ChunkSize::Bytes(n) => remaining.min(*n),
        };
        Some(ByteRange { start: offset, len })
    }
}

// ---------------------------------------------------------------------------
// Byte ranges and headers
// ---------------------------------------------------------------------------

/// A non-empty byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub len: u64,
}

impl ByteRange {
    /// Last byte covered (inclusive).
    pub fn last(&self) -> u64 {
        self.start + self.len.saturating_sub(1)
    }

    /// Offset just past the range.
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// `Content-Range` header value.
///
/// With a range: `bytes 0-1023/4096`. Without one it is a status query
/// (or an empty upload): `bytes */4096`.
pub fn content_range(range: Option<ByteRange>, total: u64) -> String {
    match range {
        Some(r) => format!("bytes {}-{}/{total}", r.start, r.last()),
        None => format!("bytes */{total}"),
    }
}

/// Parses the server's `Range` header (`bytes=0-1048575`) into the next
/// offset to send from. A missing header means nothing was persisted.
pub fn parse_range_header(value: Option<&str>) -> Result<u64, TransferError> {
    let Some(value) = value else {
        return Ok(0);
    };

    let spec = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| TransferError::InvalidRange(value.to_string()))?;
    let (_, last) = spec
        .split_once('-')
        .ok_or_else(|| TransferError::InvalidRange(value.to_string()))?;
    let last: u64 = last
        .trim()
        .parse()
        .map_err(|_| TransferError::InvalidRange(value.to_string()))?;

    Ok(last + 1)
}

/// MIME type sent with the upload, inferred from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Opens byte ranges of a local file for streaming.
///
/// Each range gets its own file handle so a request body can own it while
/// a retry later re-opens the same range.
#[derive(Debug, Clone)]
pub struct ChunkReader {
    path: PathBuf,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` and records its size.
    pub async fn open(path: &Path) -> Result<Self, TransferError> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            file_size: metadata.len(),
        })
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a reader limited to `range`.
    pub async fn range(
        &self,
        range: ByteRange,
    ) -> Result<tokio::io::Take<tokio::fs::File>, TransferError> {
        if range.end() > self.file_size {
            return Err(TransferError::OutOfBounds {
                start: range.start,
                len: range.len,
                size: self.file_size,
            });
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(std::io::SeekFrom::Start(range.start)).await?;
        Ok(file.take(range.len))
    }
}
