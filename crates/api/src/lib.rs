//! HTTP client for the video hosting API.
//!
//! Async client using `reqwest` with Bearer token authentication. Provides
//! the concrete collaborators the publish flow needs:
//!
//! - [`ResumableInsert`]: a [`TransferRequest`](vidup_resumable::TransferRequest)
//!   speaking the resumable upload protocol for `videos.insert`
//! - [`VideoUploader`]: an [`UploadTarget`](vidup_publish::UploadTarget)
//!   producing those requests
//! - [`PlaylistClient`]: a [`CollectionClient`](vidup_publish::CollectionClient)
//!   backed by playlists

pub mod client;
pub mod playlists;
pub mod types;
pub mod videos;

#[cfg(test)]
mod mock;

pub use client::{ApiClient, ApiError, ClientOptions};
pub use playlists::PlaylistClient;
pub use videos::{ResumableInsert, VideoUploader};
