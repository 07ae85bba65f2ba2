//! Folder domain model.

use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable folder identifier.
pub type FolderId = Uuid;

/// Named container for pages, media and child folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// `None` means root-level folder.
    pub parent_id: Option<FolderId>,
    pub description: Option<String>,
    /// Stable child order within one parent.
    pub sort_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, MAX_TITLE_CHARS)?;
        if self.name.contains('/') {
            return Err(ValidationError::InvalidName(self.name.clone()));
        }
        Ok(())
    }
}

/// What happens to a folder's contents when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderDeleteMode {
    /// Refuse to delete a folder that still has folders, pages or media.
    #[default]
    Reject,
    /// Delete the folder only; its contents move up to its parent.
    Dissolve,
    /// Delete the folder, its subtree, and every page and media file in it.
    Cascade,
}
