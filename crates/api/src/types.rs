//! Wire types for the video hosting API.

use serde::{Deserialize, Serialize};
use vidup_publish::{CollectionSpec, VideoMetadata};

/// `videos.insert` request body (parts `snippet` and `status`).
#[derive(Debug, Clone, Serialize)]
pub struct VideoResource {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: String,
}

impl From<&VideoMetadata> for VideoResource {
    fn from(meta: &VideoMetadata) -> Self {
        Self {
            snippet: VideoSnippet {
                title: meta.title.clone(),
                description: meta.description.clone(),
                tags: meta.tags.clone(),
                category_id: meta.category_id.clone(),
            },
            status: VideoStatus {
                privacy_status: meta.privacy.as_str().to_string(),
            },
        }
    }
}

/// One page of `playlists.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistListResponse {
    #[serde(default)]
    pub items: Vec<Playlist>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistSnippet>,
}

impl Playlist {
    pub fn title(&self) -> Option<&str> {
        self.snippet.as_ref().map(|s| s.title.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// `playlists.insert` request body.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistInsert {
    pub snippet: PlaylistSnippet,
}

impl From<&CollectionSpec> for PlaylistInsert {
    fn from(spec: &CollectionSpec) -> Self {
        Self {
            snippet: PlaylistSnippet {
                title: spec.title.clone(),
                description: spec.description.clone(),
            },
        }
    }
}

/// `playlistItems.insert` request body.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistItemInsert {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub playlist_id: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    pub video_id: String,
}

impl PlaylistItemInsert {
    pub fn video(playlist_id: &str, video_id: &str) -> Self {
        Self {
            snippet: PlaylistItemSnippet {
                playlist_id: playlist_id.to_string(),
                resource_id: ResourceId {
                    kind: "youtube#video".into(),
                    video_id: video_id.to_string(),
                },
            },
        }
    }
}

/// Minimal view of any created resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    pub id: String,
}
