//! Folder tree use-case service.
//!
//! # Responsibility
//! - Validate hierarchy invariants above the repository layer.
//! - Provide folder create, rename, move, list, path and delete operations.
//!
//! # Invariants
//! - Parent folder must exist when provided.
//! - Sibling names are unique case-insensitively.
//! - Move operations must not create parent-child cycles.
//! - Deletion never leaves a dangling folder reference.

use crate::model::folder::{Folder, FolderDeleteMode, FolderId};
use crate::model::ValidationError;
use crate::repo::folder_repo::{CascadeReport, FolderContents, FolderRepository};
use crate::repo::RepoError;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from folder service operations.
#[derive(Debug)]
pub enum FolderServiceError {
    /// Folder name is blank after trim.
    InvalidName,
    /// Target folder does not exist.
    FolderNotFound(FolderId),
    /// Parent folder does not exist.
    ParentNotFound(FolderId),
    /// A sibling already uses this name.
    DuplicateName(String),
    /// Move operation would create a cycle.
    CycleDetected {
        folder_id: FolderId,
        parent_id: FolderId,
    },
    /// `Reject` delete on a folder that still has contents.
    FolderNotEmpty {
        folder_id: FolderId,
        contents: FolderContents,
    },
    /// Record failed model validation.
    Validation(ValidationError),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for FolderServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "folder name must not be blank"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent folder not found: {id}"),
            Self::DuplicateName(name) => {
                write!(f, "a folder named `{name}` already exists here")
            }
            Self::CycleDetected {
                folder_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: folder {folder_id} under parent {parent_id}"
            ),
            Self::FolderNotEmpty {
                folder_id,
                contents,
            } => write!(
                f,
                "folder {folder_id} is not empty ({} folders, {} pages, {} media)",
                contents.folders, contents.pages, contents.media
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FolderServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FolderServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "folder",
                id,
            } => Self::FolderNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Outcome of a folder delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderDeleteOutcome {
    Deleted,
    /// Contents were moved to the deleted folder's parent.
    Dissolved,
    /// Rows removed with the subtree, the folder itself included.
    Cascaded(CascadeReport),
}

/// Folder tree service facade.
pub struct FolderService<R: FolderRepository> {
    repo: R,
}

impl<R: FolderRepository> FolderService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one folder under optional parent.
    pub fn create_folder(
        &self,
        parent_id: Option<FolderId>,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Folder, FolderServiceError> {
        let name = normalize_name(name.into())?;
        if let Some(parent_id) = parent_id {
            self.ensure_parent(parent_id)?;
        }
        self.ensure_unique_name(parent_id, &name, None)?;

        let description = normalize_description(description);
        Ok(self
            .repo
            .create_folder(parent_id, &name, description.as_deref())?)
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Folder, FolderServiceError> {
        self.repo
            .get_folder(id)?
            .ok_or(FolderServiceError::FolderNotFound(id))
    }

    /// Builds the `/A/B/C` path from the root to `id`.
    pub fn folder_path(&self, id: FolderId) -> Result<String, FolderServiceError> {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                break;
            }
            let folder = self
                .repo
                .get_folder(current)?
                .ok_or(FolderServiceError::FolderNotFound(current))?;
            names.push(folder.name);
            cursor = folder.parent_id;
        }
        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }

    /// Lists direct children of `parent_id` (root when `None`).
    pub fn list_children(
        &self,
        parent_id: Option<FolderId>,
    ) -> Result<Vec<Folder>, FolderServiceError> {
        if let Some(parent_id) = parent_id {
            self.ensure_parent(parent_id)?;
        }
        Ok(self.repo.list_children(parent_id)?)
    }

    pub fn list_folders(&self) -> Result<Vec<Folder>, FolderServiceError> {
        Ok(self.repo.list_folders()?)
    }

    pub fn rename_folder(
        &self,
        id: FolderId,
        name: impl Into<String>,
    ) -> Result<Folder, FolderServiceError> {
        let name = normalize_name(name.into())?;
        let folder = self.get_folder(id)?;
        self.ensure_unique_name(folder.parent_id, &name, Some(id))?;
        self.repo.rename_folder(id, &name)?;
        self.get_folder(id)
    }

    pub fn update_folder_description(
        &self,
        id: FolderId,
        description: Option<String>,
    ) -> Result<Folder, FolderServiceError> {
        let description = normalize_description(description);
        self.repo.set_description(id, description.as_deref())?;
        self.get_folder(id)
    }

    /// Moves one folder under optional parent and optional sibling index.
    pub fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
        target_order: Option<i64>,
    ) -> Result<Folder, FolderServiceError> {
        let folder = self.get_folder(id)?;

        if let Some(parent_id) = new_parent_id {
            if parent_id == id {
                return Err(FolderServiceError::CycleDetected {
                    folder_id: id,
                    parent_id,
                });
            }
            self.ensure_parent(parent_id)?;
            if self.would_create_cycle(id, parent_id)? {
                return Err(FolderServiceError::CycleDetected {
                    folder_id: id,
                    parent_id,
                });
            }
        }
        self.ensure_unique_name(new_parent_id, &folder.name, Some(id))?;

        self.repo
            .move_folder(id, new_parent_id, target_order.map(|value| value.max(0)))?;
        self.get_folder(id)
    }

    /// Deletes a folder by mode. Every mode is atomic.
    pub fn delete_folder(
        &self,
        id: FolderId,
        mode: FolderDeleteMode,
    ) -> Result<FolderDeleteOutcome, FolderServiceError> {
        let folder = self.get_folder(id)?;

        match mode {
            FolderDeleteMode::Reject => {
                let contents = self.repo.contents(id)?;
                if !contents.is_empty() {
                    return Err(FolderServiceError::FolderNotEmpty {
                        folder_id: id,
                        contents,
                    });
                }
                self.repo.delete_empty_folder(id)?;
                Ok(FolderDeleteOutcome::Deleted)
            }
            FolderDeleteMode::Dissolve => {
                for child in self.repo.list_children(Some(id))? {
                    self.ensure_unique_name(folder.parent_id, &child.name, Some(id))?;
                }
                self.repo.delete_folder_dissolve(id)?;
                Ok(FolderDeleteOutcome::Dissolved)
            }
            FolderDeleteMode::Cascade => Ok(FolderDeleteOutcome::Cascaded(
                self.repo.delete_folder_cascade(id)?,
            )),
        }
    }

    pub fn count_folders(&self) -> Result<u32, FolderServiceError> {
        Ok(self.repo.count_folders()?)
    }

    fn ensure_parent(&self, parent_id: FolderId) -> Result<(), FolderServiceError> {
        self.repo
            .get_folder(parent_id)?
            .map(|_| ())
            .ok_or(FolderServiceError::ParentNotFound(parent_id))
    }

    fn ensure_unique_name(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> Result<(), FolderServiceError> {
        if self.repo.sibling_name_taken(parent_id, name, exclude)? {
            return Err(FolderServiceError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn would_create_cycle(
        &self,
        folder_id: FolderId,
        candidate_parent_id: FolderId,
    ) -> Result<bool, FolderServiceError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == folder_id {
                return Ok(true);
            }
            if !visited.insert(current) {
                return Ok(true);
            }

            let folder = self
                .repo
                .get_folder(current)?
                .ok_or(FolderServiceError::ParentNotFound(current))?;
            cursor = folder.parent_id;
        }
        Ok(false)
    }
}

fn normalize_name(value: String) -> Result<String, FolderServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FolderServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
