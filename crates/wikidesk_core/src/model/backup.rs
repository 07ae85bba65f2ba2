//! Backup snapshot and export document model.
//!
//! # Invariants
//! - A snapshot holds every live collection; backups never contain other
//!   backups.
//! - `BackupDocument::format_version` identifies the JSON export layout.
//! - Snapshot folders form a forest: every parent is in the snapshot, no
//!   folder is its own ancestor, sibling names are unique.

use super::category::Category;
use super::ctf::Ctf;
use super::folder::Folder;
use super::media::MediaFile;
use super::page::{Page, PageVersion};
use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Stable backup identifier.
pub type BackupId = Uuid;

/// Export layout version written by this build.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// Full copy of the live store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub folders: Vec<Folder>,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub page_versions: Vec<PageVersion>,
    pub media: Vec<MediaFile>,
    pub ctfs: Vec<Ctf>,
    pub categories: Vec<Category>,
    /// Raw settings rows, JSON-encoded values keyed by setting name.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl StoreSnapshot {
    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            folders: self.folders.len() as u32,
            pages: self.pages.len() as u32,
            media: self.media.len() as u32,
            ctfs: self.ctfs.len() as u32,
            categories: self.categories.len() as u32,
        }
    }

    /// Validates every record in the snapshot and the folder tree shape.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for folder in &self.folders {
            folder.validate()?;
        }
        self.validate_folder_tree()?;
        for page in &self.pages {
            page.validate()?;
        }
        for media in &self.media {
            media.validate()?;
        }
        for ctf in &self.ctfs {
            ctf.validate()?;
        }
        for category in &self.categories {
            category.validate()?;
        }
        Ok(())
    }

    fn validate_folder_tree(&self) -> Result<(), ValidationError> {
        let parents: HashMap<Uuid, Option<Uuid>> = self
            .folders
            .iter()
            .map(|folder| (folder.id, folder.parent_id))
            .collect();

        let mut sibling_names = HashSet::new();
        for folder in &self.folders {
            if let Some(parent_id) = folder.parent_id {
                if !parents.contains_key(&parent_id) {
                    return Err(ValidationError::MissingParent {
                        folder_id: folder.id,
                        parent_id,
                    });
                }
            }
            let key = (folder.parent_id, folder.name.trim().to_ascii_lowercase());
            if !sibling_names.insert(key) {
                return Err(ValidationError::DuplicateSiblingName(folder.name.clone()));
            }
        }

        // Every walk to a root must finish within `folders.len()` steps.
        for folder in &self.folders {
            let mut current = folder.parent_id;
            let mut steps = 0;
            while let Some(ancestor) = current {
                steps += 1;
                if ancestor == folder.id || steps > self.folders.len() {
                    return Err(ValidationError::FolderCycle(folder.id));
                }
                current = parents.get(&ancestor).copied().flatten();
            }
        }
        Ok(())
    }
}

/// Per-collection record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCounts {
    pub folders: u32,
    pub pages: u32,
    pub media: u32,
    pub ctfs: u32,
    pub categories: u32,
}

/// JSON export envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub format_version: u32,
    pub name: String,
    pub created_at: i64,
    pub snapshot: StoreSnapshot,
}

impl BackupDocument {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, MAX_TITLE_CHARS)?;
        self.snapshot.validate()
    }
}

/// Stored backup metadata, without the snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupSummary {
    pub id: BackupId,
    pub name: String,
    pub format_version: u32,
    pub counts: SnapshotCounts,
    pub created_at: i64,
}

/// Stored backup with its decoded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub summary: BackupSummary,
    pub document: BackupDocument,
}
