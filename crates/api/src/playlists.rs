//! Playlists as upload collections.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, warn};
use vidup_publish::{CollectionClient, CollectionSpec, PublishError};

use crate::client::{ApiClient, ApiError};
use crate::types::{Created, Playlist, PlaylistInsert, PlaylistItemInsert, PlaylistListResponse};

const PAGE_SIZE: &str = "50";

/// [`CollectionClient`] backed by the caller's playlists.
#[derive(Debug, Clone)]
pub struct PlaylistClient {
    client: ApiClient,
}

impl PlaylistClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Finds one of the caller's playlists by exact title, walking every page.
    pub async fn find(&self, title: &str) -> Result<Option<Playlist>, ApiError> {
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("part", "snippet"), ("mine", "true"), ("maxResults", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: PlaylistListResponse = self.client.get_json("/playlists", &params).await?;
            if let Some(found) = page.items.into_iter().find(|p| p.title() == Some(title)) {
                return Ok(Some(found));
            }

            match page.next_page_token {
                Some(next) if !next.is_empty() && page_token.as_deref() != Some(next.as_str()) => {
                    page_token = Some(next);
                }
                Some(next) if !next.is_empty() => {
                    warn!(page_token = %next, "playlist listing repeated its page token, stopping");
                    return Ok(None);
                }
                _ => return Ok(None),
            }
        }
    }

    /// Creates a playlist and returns its id.
    pub async fn create(&self, spec: &CollectionSpec) -> Result<String, ApiError> {
        let created: Created = self
            .client
            .post_json("/playlists", &[("part", "snippet")], &PlaylistInsert::from(spec))
            .await?;
        info!(playlist_id = %created.id, title = %spec.title, "created playlist");
        Ok(created.id)
    }

    /// Adds a video to a playlist.
    pub async fn add_video(&self, playlist_id: &str, video_id: &str) -> Result<(), ApiError> {
        let _: Created = self
            .client
            .post_json(
                "/playlistItems",
                &[("part", "snippet")],
                &PlaylistItemInsert::video(playlist_id, video_id),
            )
            .await?;
        Ok(())
    }
}

impl CollectionClient for PlaylistClient {
    fn find_or_create<'a>(
        &'a self,
        spec: &'a CollectionSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, PublishError>> + Send + 'a>> {
        Box::pin(async move {
            let existing = self
                .find(&spec.title)
                .await
                .map_err(|e| PublishError::Collection(e.to_string()))?;
            if let Some(playlist) = existing {
                debug!(playlist_id = %playlist.id, title = %spec.title, "using existing playlist");
                return Ok(playlist.id);
            }
            self.create(spec)
                .await
                .map_err(|e| PublishError::Collection(e.to_string()))
        })
    }

    fn attach_item<'a>(
        &'a self,
        collection_id: &'a str,
        item_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'a>> {
        Box::pin(async move {
            self.add_video(collection_id, item_id)
                .await
                .map_err(|e| PublishError::Collection(e.to_string()))
        })
    }
}
