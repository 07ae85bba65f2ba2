//! Media library model.
//!
//! # Invariants
//! - `url` is never blank. Uploads carry an object URL, YouTube entries
//!   carry the canonical watch URL.
//! - `size_bytes`, when present, is non-negative.

use super::folder::FolderId;
use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable media identifier.
pub type MediaId = Uuid;

const MAX_URL_CHARS: usize = 2048;

static YOUTUBE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
    )
    .expect("valid youtube regex")
});

/// Asset category in the media library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    /// Linked YouTube video; no bytes are stored.
    Youtube,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Youtube => "youtube",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "document" => Some(Self::Document),
            "youtube" => Some(Self::Youtube),
            _ => None,
        }
    }

    /// Infers the kind of an uploaded file from its mime type, falling back
    /// to the file extension. Unknown types are documents.
    pub fn infer(name: &str, mime_type: Option<&str>) -> Self {
        if let Some(mime) = mime_type {
            let major = mime.split('/').next().unwrap_or_default().trim();
            match major.to_ascii_lowercase().as_str() {
                "image" => return Self::Image,
                "video" => return Self::Video,
                "audio" => return Self::Audio,
                _ => {}
            }
        }

        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "ico" | "avif" => Self::Image,
            "mp4" | "webm" | "mov" | "mkv" | "avi" | "m4v" => Self::Video,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => Self::Audio,
            _ => Self::Document,
        }
    }
}

/// Canonical media library record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: MediaId,
    pub name: String,
    pub kind: MediaKind,
    pub url: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub folder_id: Option<FolderId>,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MediaFile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, MAX_TITLE_CHARS)?;
        require_text("url", &self.url, MAX_URL_CHARS)?;
        if let Some(size) = self.size_bytes {
            if size < 0 {
                return Err(ValidationError::NegativeSize(size));
            }
        }
        Ok(())
    }

    /// Returns the YouTube video id for `Youtube` entries.
    pub fn youtube_id(&self) -> Option<&str> {
        if self.kind != MediaKind::Youtube {
            return None;
        }
        YOUTUBE_ID_RE
            .captures(&self.url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Input for registering an uploaded or linked file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMedia {
    pub name: String,
    pub url: String,
    /// `None` infers the kind from `mime_type` and `name`.
    pub kind: Option<MediaKind>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub folder_id: Option<FolderId>,
    pub description: Option<String>,
}

/// Partial media update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// Extracts the 11-character video id from watch, short, embed or
/// `youtu.be` URLs.
pub fn parse_youtube_id(url: &str) -> Option<String> {
    YOUTUBE_ID_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

pub fn youtube_embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}")
}

pub fn youtube_thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg")
}

#[cfg(test)]
mod tests {
    use super::{parse_youtube_id, youtube_embed_url, youtube_thumbnail_url, MediaKind};

    #[test]
    fn infer_prefers_mime_over_extension() {
        assert_eq!(
            MediaKind::infer("clip.bin", Some("video/mp4")),
            MediaKind::Video
        );
        assert_eq!(MediaKind::infer("photo.JPG", None), MediaKind::Image);
        assert_eq!(
            MediaKind::infer("report.pdf", Some("application/pdf")),
            MediaKind::Document
        );
        assert_eq!(MediaKind::infer("no_extension", None), MediaKind::Document);
    }

    #[test]
    fn parse_youtube_id_accepts_common_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=10",
            "https://youtu.be/dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ?t=42",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://m.youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(
                parse_youtube_id(url).as_deref(),
                Some("dQw4w9WgXcQ"),
                "url: {url}"
            );
        }
    }

    #[test]
    fn parse_youtube_id_rejects_other_hosts() {
        assert_eq!(parse_youtube_id("https://vimeo.com/123456"), None);
        assert_eq!(parse_youtube_id("https://youtube.com/watch?v=short"), None);
    }

    #[test]
    fn embed_and_thumbnail_urls_use_the_video_id() {
        assert_eq!(
            youtube_embed_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(
            youtube_thumbnail_url("dQw4w9WgXcQ"),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }
}
