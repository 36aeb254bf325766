//! Publish flow: resolve collection, upload, attach.
//!
//! This crate holds the orchestration above the resumable upload driver.
//! It has no HTTP dependency: the remote service is reached through the
//! [`UploadTarget`] and [`CollectionClient`] traits, implemented by
//! `vidup-api` (and by mocks in tests).
//!
//! # Pipeline
//!
//! 1. **Resolve**: find or create the named collection, once
//! 2. **Prepare**: open a resumable transfer request per video
//! 3. **Upload**: drive it with retry and backoff
//! 4. **Attach**: add the uploaded item to the collection

pub mod collection;
pub mod error;
pub mod publish;
pub mod target;
pub mod types;

pub use collection::CollectionClient;
pub use error::PublishError;
pub use publish::PublishOrchestrator;
pub use target::UploadTarget;
pub use types::{
    CollectionSpec, FailurePolicy, PrivacyStatus, PublishConfig, PublishEvent, PublishReport,
    VideoMetadata, VideoOutcome, VideoResult,
};
