//! Uploader configuration.
//!
//! Read from `~/.config/vidup/config.json` unless another path is given.
//! Every field is optional; a missing default file means all defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vidup_api::ClientOptions;
use vidup_api::client::{DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL};
use vidup_publish::{CollectionSpec, FailurePolicy, PrivacyStatus, PublishConfig};
use vidup_resumable::{DEFAULT_MAX_RETRIES, RetryPolicy};
use vidup_transfer::ChunkSize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub access_token: String,
    pub api_base_url: String,
    pub upload_base_url: String,
    pub collection_title: String,
    pub collection_description: String,
    /// Description given to every uploaded video.
    pub description: String,
    pub category_id: String,
    pub privacy_status: PrivacyStatus,
    /// Bytes per request; `0` sends the whole file at once.
    pub chunk_size: u64,
    pub max_retries: u32,
    pub reset_retries_on_progress: bool,
    pub on_failure: FailurePolicy,
    /// `0` disables the per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let publish = PublishConfig::default();
        let retry = RetryPolicy::default();
        Self {
            access_token: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.into(),
            collection_title: publish.collection.title,
            collection_description: publish.collection.description,
            description: publish.description,
            category_id: publish.category_id,
            privacy_status: publish.privacy,
            chunk_size: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            reset_retries_on_progress: retry.reset_on_progress,
            on_failure: publish.on_failure,
            request_timeout_secs: 0,
        }
    }
}

impl Config {
    /// Loads the config. An explicit `path` must exist; the default one
    /// may be absent.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = default_config_path()?;
                if !path.exists() {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                Self::read(&path)
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn publish_config(&self) -> PublishConfig {
        PublishConfig {
            collection: CollectionSpec {
                title: self.collection_title.clone(),
                description: self.collection_description.clone(),
            },
            description: self.description.clone(),
            category_id: self.category_id.clone(),
            privacy: self.privacy_status,
            on_failure: self.on_failure,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            reset_on_progress: self.reset_retries_on_progress,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_base_url: self.api_base_url.clone(),
            upload_base_url: self.upload_base_url.clone(),
            timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }

    pub fn chunk_size(&self) -> ChunkSize {
        ChunkSize::from_bytes(self.chunk_size)
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("vidup").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
