//! Authenticated API client.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use vidup_resumable::ChunkError;
use vidup_transfer::TransferError;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Errors from the API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("response missing {0}")]
    MissingField(&'static str),

    #[error("invalid access token")]
    InvalidToken,
}

/// Status errors keep their code; everything else happened below HTTP
/// semantics and counts as a transport fault.
impl From<ApiError> for ChunkError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Api { status, body } => ChunkError::Http { status, body },
            ApiError::Transfer(TransferError::Io(e)) => ChunkError::Io(e),
            other => ChunkError::Transport(other.to_string()),
        }
    }
}

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base_url: String,
    pub upload_base_url: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.into(),
            timeout: None,
        }
    }
}

/// API client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) api_base_url: String,
    pub(crate) upload_base_url: String,
}

impl ApiClient {
    /// Creates a client authenticating with `access_token`.
    pub fn new(access_token: &str, options: ClientOptions) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        // 308 means "resume incomplete" to the upload protocol, never a redirect.
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            api_base_url: options.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: options.upload_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Performs an authenticated GET and decodes the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.api_base_url, endpoint);
        let resp = self.http.get(&url).query(params).send().await?;
        decode(resp).await
    }

    /// Performs an authenticated POST with a JSON body and decodes the
    /// JSON response.
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.api_base_url, endpoint);
        let resp = self.http.post(&url).query(params).json(body).send().await?;
        decode(resp).await
    }
}

/// Turns a non-success status into [`ApiError::Api`].
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let resp = check_status(resp).await?;
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
