//! Resumable `videos.insert` uploads.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use vidup_publish::{PublishError, UploadTarget, VideoMetadata};
use vidup_resumable::{ChunkError, ChunkFuture, ChunkStatus, Progress, TransferRequest};
use vidup_transfer::{
    ChunkReader, ChunkSize, SpeedCalculator, content_range, content_type_for, parse_range_header,
};

use crate::client::{ApiClient, ApiError, check_status};
use crate::types::VideoResource;

/// One resumable upload of a local file.
///
/// The first call to [`send_next_chunk`](TransferRequest::send_next_chunk)
/// opens the upload session; each later call sends the next byte range.
/// After a transport fault or a 5xx the session is kept, and the next call
/// asks the server how much it has before sending anything.
#[derive(Debug)]
pub struct ResumableInsert {
    client: ApiClient,
    reader: ChunkReader,
    resource: VideoResource,
    content_type: &'static str,
    chunk_size: ChunkSize,
    session_uri: Option<String>,
    offset: u64,
    needs_status_query: bool,
    speed: SpeedCalculator,
}

impl ResumableInsert {
    pub async fn new(
        client: ApiClient,
        path: &Path,
        metadata: &VideoMetadata,
        chunk_size: ChunkSize,
    ) -> Result<Self, ApiError> {
        let reader = ChunkReader::open(path).await?;
        Ok(Self {
            client,
            reader,
            resource: VideoResource::from(metadata),
            content_type: content_type_for(path),
            chunk_size,
            session_uri: None,
            offset: 0,
            needs_status_query: false,
            speed: SpeedCalculator::default(),
        })
    }

    /// Session URI, once the upload has been initiated.
    pub fn session_uri(&self) -> Option<&str> {
        self.session_uri.as_deref()
    }

    /// Bytes the server has confirmed.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn total_bytes(&self) -> u64 {
        self.reader.file_size()
    }

    async fn step(&mut self) -> Result<ChunkStatus, ApiError> {
        let session_uri = match &self.session_uri {
            Some(uri) => uri.clone(),
            None => {
                let uri = self.initiate().await?;
                self.session_uri = Some(uri.clone());
                uri
            }
        };

        if self.needs_status_query {
            let status = self.query_status(&session_uri).await?;
            self.needs_status_query = false;
            if let ChunkStatus::Complete(_) = status {
                return Ok(status);
            }
        }

        self.send_chunk(&session_uri).await
    }

    async fn initiate(&self) -> Result<String, ApiError> {
        let url = format!("{}/videos", self.client.upload_base_url);
        let total = self.reader.file_size();
        debug!(file = %self.reader.path().display(), total, "opening upload session");

        let resp = self
            .client
            .http
            .post(&url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Length", total)
            .header("X-Upload-Content-Type", self.content_type)
            .json(&self.resource)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        resp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(ApiError::MissingField("Location header"))
    }

    async fn query_status(&mut self, session_uri: &str) -> Result<ChunkStatus, ApiError> {
        let total = self.reader.file_size();
        debug!(total, "querying upload status");
        // Throughput before the failure says nothing about the resumed transfer.
        self.speed.reset();

        let resp = self
            .client
            .http
            .put(session_uri)
            .header(CONTENT_RANGE, content_range(None, total))
            .header(CONTENT_LENGTH, 0)
            .body(Vec::new())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn send_chunk(&mut self, session_uri: &str) -> Result<ChunkStatus, ApiError> {
        let total = self.reader.file_size();
        let range = self.chunk_size.next_range(self.offset, total);

        let request = self
            .client
            .http
            .put(session_uri)
            .header(CONTENT_RANGE, content_range(range, total));
        let request = match range {
            Some(range) => {
                let body = self.reader.range(range).await?;
                request
                    .header(CONTENT_LENGTH, range.len)
                    .body(reqwest::Body::wrap_stream(ReaderStream::new(body)))
            }
            // Empty file, or everything already confirmed.
            None => request.header(CONTENT_LENGTH, 0).body(Vec::new()),
        };

        let resp = request.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response(&mut self, resp: reqwest::Response) -> Result<ChunkStatus, ApiError> {
        let total = self.reader.file_size();

        if resp.status() == StatusCode::PERMANENT_REDIRECT {
            let range = resp.headers().get(RANGE).and_then(|v| v.to_str().ok());
            let confirmed = parse_range_header(range)?.min(total);
            self.speed.add_sample(confirmed.saturating_sub(self.offset));
            self.offset = confirmed;

            let progress = Progress {
                bytes_sent: confirmed,
                total_bytes: total,
            };
            info!(
                percent = (progress.fraction() * 100.0).round() as u64,
                bytes_per_sec = self.speed.bytes_per_second() as u64,
                eta = ?self.speed.eta(total - confirmed),
                "upload progress"
            );
            return Ok(ChunkStatus::InProgress(progress));
        }

        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        self.offset = total;
        // A non-JSON final body is handed over verbatim; it carries no id.
        let value = serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
        });
        Ok(ChunkStatus::Complete(value))
    }
}

/// Whether the next attempt should resynchronise with the server first.
fn needs_resync(err: &ApiError) -> bool {
    match err {
        ApiError::Api { status, .. } => *status >= 500,
        ApiError::Http(_) | ApiError::Transfer(_) => true,
        _ => false,
    }
}

impl TransferRequest for ResumableInsert {
    fn send_next_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move {
            let result = self.step().await;
            if let Err(err) = &result
                && self.session_uri.is_some()
                && needs_resync(err)
            {
                self.needs_status_query = true;
            }
            result.map_err(ChunkError::from)
        })
    }
}

/// [`UploadTarget`] producing [`ResumableInsert`] requests.
#[derive(Debug, Clone)]
pub struct VideoUploader {
    client: ApiClient,
    chunk_size: ChunkSize,
}

impl VideoUploader {
    pub fn new(client: ApiClient, chunk_size: ChunkSize) -> Self {
        Self { client, chunk_size }
    }
}

impl UploadTarget for VideoUploader {
    fn prepare<'a>(
        &'a self,
        video: &'a Path,
        metadata: &'a VideoMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn TransferRequest>, PublishError>> + Send + 'a>>
    {
        Box::pin(async move {
            let insert = ResumableInsert::new(self.client.clone(), video, metadata, self.chunk_size)
                .await
                .map_err(|e| PublishError::Prepare(e.to_string()))?;
            Ok::<Box<dyn TransferRequest>, PublishError>(Box::new(insert))
        })
    }
}
