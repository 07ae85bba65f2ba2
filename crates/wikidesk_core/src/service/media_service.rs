//! Media library use-case service.
//!
//! # Invariants
//! - Kind is inferred from mime type and extension unless given.
//! - YouTube entries always store the canonical watch URL.
//! - Registered sizes never exceed the configured upload bound.

use crate::model::folder::FolderId;
use crate::model::media::{
    parse_youtube_id, youtube_watch_url, MediaFile, MediaId, MediaKind, MediaPatch, NewMedia,
};
use crate::model::ValidationError;
use crate::repo::media_repo::{MediaListQuery, MediaRepository};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for media use-cases.
#[derive(Debug)]
pub enum MediaServiceError {
    /// Media name is blank after trim.
    InvalidName,
    /// Media URL is blank after trim.
    InvalidUrl,
    /// URL is not a recognizable YouTube video link.
    InvalidYoutubeUrl(String),
    /// Declared size exceeds the upload bound.
    UploadTooLarge { size_bytes: i64, max_bytes: u64 },
    /// Target media row does not exist.
    MediaNotFound(MediaId),
    /// Referenced folder does not exist.
    FolderNotFound(FolderId),
    /// Record failed model validation.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for MediaServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "media name must not be blank"),
            Self::InvalidUrl => write!(f, "media url must not be blank"),
            Self::InvalidYoutubeUrl(url) => write!(f, "not a youtube video url: `{url}`"),
            Self::UploadTooLarge {
                size_bytes,
                max_bytes,
            } => write!(
                f,
                "upload of {size_bytes} bytes exceeds the {max_bytes} byte limit"
            ),
            Self::MediaNotFound(id) => write!(f, "media not found: {id}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MediaServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MediaServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "media",
                id,
            } => Self::MediaNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Media library service facade.
pub struct MediaService<R: MediaRepository> {
    repo: R,
    max_upload_bytes: u64,
}

impl<R: MediaRepository> MediaService<R> {
    /// Creates a service without an upload bound.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_upload_bytes: 0,
        }
    }

    /// Rejects uploads larger than `max_bytes`; `0` disables the check.
    pub fn with_max_upload_bytes(mut self, max_bytes: u64) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }

    /// Registers an uploaded or linked file.
    pub fn add_media(&self, new: NewMedia) -> Result<MediaFile, MediaServiceError> {
        let name = normalize_required(&new.name).ok_or(MediaServiceError::InvalidName)?;
        let url = normalize_required(&new.url).ok_or(MediaServiceError::InvalidUrl)?;
        if let Some(size_bytes) = new.size_bytes {
            self.check_upload_size(size_bytes)?;
        }
        if let Some(folder_id) = new.folder_id {
            self.ensure_folder(folder_id)?;
        }

        let mime_type = normalize_optional(new.mime_type);
        let kind = new
            .kind
            .unwrap_or_else(|| MediaKind::infer(&name, mime_type.as_deref()));
        let media = MediaFile {
            id: MediaId::new_v4(),
            name,
            kind,
            url,
            mime_type,
            size_bytes: new.size_bytes,
            folder_id: new.folder_id,
            description: normalize_optional(new.description),
            created_at: 0,
            updated_at: 0,
        };
        Ok(self.repo.insert_media(&media)?)
    }

    /// Registers a YouTube video from any common URL shape. The name
    /// defaults to `YouTube <id>`.
    pub fn add_youtube(
        &self,
        url: &str,
        name: Option<String>,
        folder_id: Option<FolderId>,
    ) -> Result<MediaFile, MediaServiceError> {
        let video_id = parse_youtube_id(url)
            .ok_or_else(|| MediaServiceError::InvalidYoutubeUrl(url.trim().to_string()))?;
        let name = name
            .and_then(|value| normalize_required(&value))
            .unwrap_or_else(|| format!("YouTube {video_id}"));

        self.add_media(NewMedia {
            name,
            url: youtube_watch_url(&video_id),
            kind: Some(MediaKind::Youtube),
            mime_type: None,
            size_bytes: None,
            folder_id,
            description: None,
        })
    }

    pub fn get_media(&self, id: MediaId) -> Result<MediaFile, MediaServiceError> {
        self.repo
            .get_media(id)?
            .ok_or(MediaServiceError::MediaNotFound(id))
    }

    /// Lists media, newest first.
    pub fn list_media(&self, query: &MediaListQuery) -> Result<Vec<MediaFile>, MediaServiceError> {
        Ok(self.repo.list_media(query)?)
    }

    pub fn update_media(
        &self,
        id: MediaId,
        patch: MediaPatch,
    ) -> Result<MediaFile, MediaServiceError> {
        let mut media = self.get_media(id)?;
        if let Some(name) = patch.name {
            media.name = normalize_required(&name).ok_or(MediaServiceError::InvalidName)?;
        }
        if let Some(description) = patch.description {
            media.description = normalize_optional(description);
        }
        self.repo.update_media(&media)?;
        self.get_media(id)
    }

    pub fn move_media(
        &self,
        id: MediaId,
        folder_id: Option<FolderId>,
    ) -> Result<MediaFile, MediaServiceError> {
        let mut media = self.get_media(id)?;
        if let Some(folder_id) = folder_id {
            self.ensure_folder(folder_id)?;
        }
        media.folder_id = folder_id;
        self.repo.update_media(&media)?;
        self.get_media(id)
    }

    pub fn delete_media(&self, id: MediaId) -> Result<(), MediaServiceError> {
        self.repo.delete_media(id)?;
        Ok(())
    }

    pub fn count_media(&self) -> Result<u32, MediaServiceError> {
        Ok(self.repo.count_media()?)
    }

    fn check_upload_size(&self, size_bytes: i64) -> Result<(), MediaServiceError> {
        if size_bytes < 0 {
            return Err(MediaServiceError::Validation(ValidationError::NegativeSize(
                size_bytes,
            )));
        }
        if self.max_upload_bytes > 0 && size_bytes as u64 > self.max_upload_bytes {
            return Err(MediaServiceError::UploadTooLarge {
                size_bytes,
                max_bytes: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    fn ensure_folder(&self, folder_id: FolderId) -> Result<(), MediaServiceError> {
        if self.repo.folder_exists(folder_id)? {
            Ok(())
        } else {
            Err(MediaServiceError::FolderNotFound(folder_id))
        }
    }
}

fn normalize_required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|text| normalize_required(&text))
}
