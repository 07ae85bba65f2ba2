//! Page domain model.
//!
//! # Invariants
//! - `title` is never blank.
//! - `slug` is unique across the store.
//! - `plain_text`, `excerpt` and `cover_image` are derived from `content`
//!   and are never written independently.
//! - `version` starts at 1 and increments on every title/content change.

use super::category::CategoryId;
use super::folder::FolderId;
use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable page identifier.
pub type PageId = Uuid;

/// Publishing state of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Work in progress, not visible to readers.
    #[default]
    Draft,
    /// Visible to readers.
    Published,
    /// Retired but kept for reference.
    Archived,
}

impl PageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Canonical page record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    /// URL-safe unique handle derived from the title.
    pub slug: String,
    /// HTML body produced by the editor.
    pub content: String,
    /// Tag-free text used for search indexing.
    pub plain_text: String,
    /// First 160 characters of `plain_text`, `None` for empty bodies.
    pub excerpt: Option<String>,
    /// First `<img src>` in the body.
    pub cover_image: Option<String>,
    pub folder_id: Option<FolderId>,
    pub status: PageStatus,
    pub author: Option<String>,
    /// Set on first publish and kept across unpublish/republish.
    pub published_at: Option<i64>,
    pub version: i64,
    /// Normalized lowercase tags, sorted.
    pub tags: Vec<String>,
    /// Linked categories, sorted by id.
    pub category_ids: Vec<CategoryId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Page {
    /// Validates writable fields before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, MAX_TITLE_CHARS)?;
        require_text("slug", &self.slug, MAX_TITLE_CHARS)?;
        if self.version < 1 {
            return Err(ValidationError::OutOfRange {
                field: "version",
                min: 1,
                max: i64::MAX,
                actual: self.version,
            });
        }
        Ok(())
    }
}

/// Input for page creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPage {
    pub title: String,
    pub content: String,
    pub folder_id: Option<FolderId>,
    pub author: Option<String>,
    /// `None` means "use the store default".
    pub status: Option<PageStatus>,
    pub tags: Vec<String>,
    pub category_ids: Vec<CategoryId>,
}

impl NewPage {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Partial page update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` clears the author.
    pub author: Option<Option<String>>,
}

/// One historical revision of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVersion {
    pub page_id: PageId,
    /// The page `version` this revision was captured from.
    pub version: i64,
    pub title: String,
    pub content: String,
    pub created_at: i64,
}
