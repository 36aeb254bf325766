//! Data types for the publish flow.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vidup_library::VideoEntry;

use crate::error::PublishError;

/// Visibility of an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "private" => Ok(PrivacyStatus::Private),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            other => Err(PublishError::InvalidValue(format!(
                "privacy status must be public, private or unlisted, got {other:?}"
            ))),
        }
    }
}

/// What to do with the remaining videos after one fails to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next video.
    #[default]
    Continue,
    /// Stop; the remaining videos are reported as skipped.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(PublishError::InvalidValue(format!(
                "failure policy must be continue or abort, got {other:?}"
            ))),
        }
    }
}

/// The collection uploads are grouped into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub title: String,
    pub description: String,
}

impl Default for CollectionSpec {
    fn default() -> Self {
        Self {
            title: "cybertech".into(),
            description: "Playlist for cybertech videos".into(),
        }
    }
}

/// Metadata sent with each upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    /// Omitted from the request when empty.
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
}

/// Settings for a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub collection: CollectionSpec,
    /// Description given to every uploaded video.
    pub description: String,
    pub category_id: String,
    pub privacy: PrivacyStatus,
    pub on_failure: FailurePolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            collection: CollectionSpec::default(),
            description: "Test Description".into(),
            category_id: "22".into(),
            privacy: PrivacyStatus::Public,
            on_failure: FailurePolicy::Continue,
        }
    }
}

impl PublishConfig {
    /// Builds the upload metadata for a scanned video.
    pub fn metadata_for(&self, video: &VideoEntry) -> VideoMetadata {
        VideoMetadata {
            title: video.sidecar.title.clone(),
            description: self.description.clone(),
            tags: video.sidecar.tags(),
            category_id: self.category_id.clone(),
            privacy: self.privacy,
        }
    }
}

/// Progress event emitted while publishing.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    /// Upload of a video is starting.
    Started { video: PathBuf, title: String },
    /// The remote side confirmed `bytes_sent` of `total_bytes`.
    Progress {
        video: PathBuf,
        bytes_sent: u64,
        total_bytes: u64,
    },
    /// A transient failure; the upload resumes after `delay`.
    Retrying {
        video: PathBuf,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// The video was uploaded and has a remote id.
    Uploaded { video: PathBuf, item_id: String },
    /// The uploaded item was added to the collection.
    Attached {
        video: PathBuf,
        item_id: String,
        collection_id: String,
    },
    /// The upload succeeded but adding it to the collection did not.
    AttachFailed {
        video: PathBuf,
        item_id: String,
        error: String,
    },
    /// The upload failed.
    Failed { video: PathBuf, error: String },
    /// The video was not attempted.
    Skipped { video: PathBuf, reason: String },
}

/// How one video fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    Uploaded {
        item_id: String,
        /// Set when adding to the collection failed. Not retried.
        attach_error: Option<String>,
    },
    Failed { error: String },
    Skipped { reason: String },
}

/// Result for a single video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub video: PathBuf,
    pub title: String,
    pub outcome: VideoOutcome,
}

/// Result of a whole publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub collection_id: String,
    pub results: Vec<VideoResult>,
}

impl PublishReport {
    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Uploaded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Skipped { .. }))
    }

    /// True when every video was uploaded (attach failures aside).
    pub fn all_uploaded(&self) -> bool {
        self.uploaded() == self.results.len()
    }

    fn count(&self, pred: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}
