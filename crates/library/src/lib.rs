//! Local video library discovery.
//!
//! A video is publishable when a text file with the same stem sits next
//! to it. The text holds the title and, after a `#`, comma-separated
//! keywords:
//!
//! ```text
//! Rust in ten minutes # rust, programming, tutorial
//! ```

mod scanner;
mod sidecar;

pub use scanner::{VIDEO_EXTENSIONS, VideoEntry, scan_videos};
pub use sidecar::{Sidecar, parse_sidecar};

/// Errors produced while scanning the library.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
