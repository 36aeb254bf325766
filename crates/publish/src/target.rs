//! Upload target seam.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use vidup_resumable::TransferRequest;

use crate::error::PublishError;
use crate::types::VideoMetadata;

/// Creates resumable transfer requests for local videos.
pub trait UploadTarget: Send + Sync {
    /// Prepares an upload of `video` with `metadata`. Nothing is sent
    /// until the driver asks the request for its first chunk.
    fn prepare<'a>(
        &'a self,
        video: &'a Path,
        metadata: &'a VideoMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn TransferRequest>, PublishError>> + Send + 'a>>;
}
