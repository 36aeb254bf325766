//! Recursive scan for publishable videos.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::LibraryError;
use crate::sidecar::{Sidecar, parse_sidecar};

/// Extensions recognised as video files (compared case-insensitively).
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// A video file with its sidecar metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    pub video_path: PathBuf,
    pub sidecar_path: PathBuf,
    /// `<stem>.jpg` next to the video, when present. Not uploaded.
    pub thumbnail_path: Option<PathBuf>,
    pub sidecar: Sidecar,
}

impl VideoEntry {
    pub fn title(&self) -> &str {
        &self.sidecar.title
    }
}

/// Scans `root` recursively for videos that have a sidecar text file.
///
/// Videos without a sidecar, with an unreadable one, or with an empty
/// title are skipped. Entries come back sorted by path.
pub fn scan_videos(root: &Path) -> Result<Vec<VideoEntry>, LibraryError> {
    let mut videos = Vec::new();
    walk_dir(root, &mut videos)?;
    videos.sort_by(|a, b| a.video_path.cmp(&b.video_path));
    Ok(videos)
}

fn walk_dir(current: &Path, videos: &mut Vec<VideoEntry>) -> Result<(), LibraryError> {
    let io_err = |source| LibraryError::Io {
        path: current.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(current).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err)?;

        if file_type.is_dir() {
            walk_dir(&path, videos)?;
        } else if is_video(&path) {
            if let Some(video) = load_entry(path) {
                videos.push(video);
            }
        }
    }

    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

fn load_entry(video_path: PathBuf) -> Option<VideoEntry> {
    let sidecar_path = video_path.with_extension("txt");
    if !sidecar_path.is_file() {
        debug!(video = %video_path.display(), "no sidecar, skipping");
        return None;
    }

    let text = match std::fs::read_to_string(&sidecar_path) {
        Ok(text) => text,
        Err(e) => {
            warn!(sidecar = %sidecar_path.display(), error = %e, "unreadable sidecar, skipping");
            return None;
        }
    };

    let sidecar = parse_sidecar(&text);
    if sidecar.title.is_empty() {
        warn!(sidecar = %sidecar_path.display(), "sidecar has no title, skipping");
        return None;
    }

    let thumbnail = video_path.with_extension("jpg");
    let thumbnail_path = thumbnail.is_file().then_some(thumbnail);

    Some(VideoEntry {
        video_path,
        sidecar_path,
        thumbnail_path,
        sidecar,
    })
}
