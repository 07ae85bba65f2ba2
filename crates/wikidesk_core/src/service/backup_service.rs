//! Backup, export and restore service.
//!
//! # Responsibility
//! - Snapshot the live store into stored backups and JSON documents.
//! - Import JSON documents as stored backups.
//! - Restore a stored backup over the live store.
//!
//! # Invariants
//! - Exported documents carry `format_version = BACKUP_FORMAT_VERSION`.
//! - Imports with another format version are rejected before any write.
//! - Snapshot settings must decode and validate like live settings, both on
//!   import and again before restore.
//! - Restore is all-or-nothing.
//! - After every new backup at most `max_backups` are kept (`0` = no limit).

use crate::model::backup::{
    Backup, BackupDocument, BackupId, BackupSummary, SnapshotCounts, BACKUP_FORMAT_VERSION,
};
use crate::model::ValidationError;
use crate::repo::backup_repo::BackupRepository;
use crate::repo::RepoError;
use crate::service::settings_service::{overlay_settings, SettingsServiceError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stored backups kept when no explicit limit is configured.
pub const DEFAULT_MAX_BACKUPS: u32 = 20;

#[derive(Debug)]
pub enum BackupServiceError {
    /// Backup name is blank after trim.
    InvalidName,
    /// Target backup does not exist.
    BackupNotFound(BackupId),
    /// Input is not a parseable backup document.
    InvalidDocument(String),
    /// Document was written by an incompatible layout.
    UnsupportedFormat { found: u32, supported: u32 },
    /// Snapshot content failed validation.
    Validation(ValidationError),
    /// Snapshot settings cannot be decoded.
    InvalidSettings(SettingsServiceError),
    /// Persistence-layer failure, including rolled-back restores.
    Repo(RepoError),
}

impl Display for BackupServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "backup name must not be blank"),
            Self::BackupNotFound(id) => write!(f, "backup not found: {id}"),
            Self::InvalidDocument(message) => write!(f, "invalid backup document: {message}"),
            Self::UnsupportedFormat { found, supported } => write!(
                f,
                "backup format version {found} is not supported (expected {supported})"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidSettings(err) => write!(f, "invalid backup settings: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidSettings(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BackupServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "backup",
                id,
            } => Self::BackupNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Backup service facade.
pub struct BackupService<R: BackupRepository> {
    repo: R,
    max_backups: u32,
}

impl<R: BackupRepository> BackupService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }

    /// Sets the retention bound; `0` keeps every backup.
    pub fn with_max_backups(mut self, max_backups: u32) -> Self {
        self.max_backups = max_backups;
        self
    }

    /// Captures the live store as a new stored backup.
    pub fn create_backup(&self, name: &str) -> Result<BackupSummary, BackupServiceError> {
        let document = self.current_document(name)?;
        self.store_document(&document)
    }

    /// Lists stored backups, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupSummary>, BackupServiceError> {
        Ok(self.repo.list_backups()?)
    }

    pub fn get_backup(&self, id: BackupId) -> Result<Backup, BackupServiceError> {
        self.repo
            .get_backup(id)?
            .ok_or(BackupServiceError::BackupNotFound(id))
    }

    pub fn delete_backup(&self, id: BackupId) -> Result<(), BackupServiceError> {
        self.repo.delete_backup(id)?;
        Ok(())
    }

    /// Renders a stored backup as a pretty JSON document.
    pub fn export_backup(&self, id: BackupId) -> Result<String, BackupServiceError> {
        let backup = self.get_backup(id)?;
        render_document(&backup.document)
    }

    /// Renders the live store as a pretty JSON document without storing it.
    pub fn export_current(&self, name: &str) -> Result<String, BackupServiceError> {
        let document = self.current_document(name)?;
        render_document(&document)
    }

    /// Parses, validates and stores a JSON document. Live data is untouched.
    pub fn import_backup(&self, json: &str) -> Result<BackupSummary, BackupServiceError> {
        let document = parse_backup_document(json)?;
        self.store_document(&document)
    }

    /// Replaces every live collection with the stored backup's snapshot.
    pub fn restore_backup(&self, id: BackupId) -> Result<SnapshotCounts, BackupServiceError> {
        let backup = self.get_backup(id)?;
        validate_document(&backup.document)?;
        Ok(self.repo.replace_snapshot(&backup.document.snapshot)?)
    }

    fn current_document(&self, name: &str) -> Result<BackupDocument, BackupServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BackupServiceError::InvalidName);
        }
        Ok(BackupDocument {
            format_version: BACKUP_FORMAT_VERSION,
            name: name.to_string(),
            created_at: now_epoch_ms(),
            snapshot: self.repo.load_snapshot()?,
        })
    }

    fn store_document(
        &self,
        document: &BackupDocument,
    ) -> Result<BackupSummary, BackupServiceError> {
        let summary = self.repo.insert_backup(BackupId::new_v4(), document)?;
        if self.max_backups > 0 {
            self.repo.prune_to(self.max_backups)?;
        }
        Ok(summary)
    }
}

/// Parses and validates a JSON backup document.
pub fn parse_backup_document(json: &str) -> Result<BackupDocument, BackupServiceError> {
    let document: BackupDocument = serde_json::from_str(json)
        .map_err(|err| BackupServiceError::InvalidDocument(err.to_string()))?;
    if document.format_version != BACKUP_FORMAT_VERSION {
        return Err(BackupServiceError::UnsupportedFormat {
            found: document.format_version,
            supported: BACKUP_FORMAT_VERSION,
        });
    }
    validate_document(&document)?;
    Ok(document)
}

/// Checks records, folder tree shape and the decoded settings.
fn validate_document(document: &BackupDocument) -> Result<(), BackupServiceError> {
    document
        .validate()
        .map_err(BackupServiceError::Validation)?;
    overlay_settings(&document.snapshot.settings)
        .map_err(BackupServiceError::InvalidSettings)?
        .validate()
        .map_err(BackupServiceError::Validation)
}

fn render_document(document: &BackupDocument) -> Result<String, BackupServiceError> {
    serde_json::to_string_pretty(document)
        .map_err(|err| BackupServiceError::InvalidDocument(err.to_string()))
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{parse_backup_document, BackupServiceError};

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_backup_document("{ not json").expect_err("should fail");
        assert!(matches!(err, BackupServiceError::InvalidDocument(_)));
    }

    #[test]
    fn parse_rejects_unknown_format_version() {
        let json = r#"{
            "format_version": 99,
            "name": "future",
            "created_at": 0,
            "snapshot": {"folders": [], "pages": [], "media": [], "ctfs": [], "categories": []}
        }"#;
        let err = parse_backup_document(json).expect_err("should fail");
        assert!(matches!(
            err,
            BackupServiceError::UnsupportedFormat { found: 99, .. }
        ));
    }

    #[test]
    fn parse_accepts_empty_snapshot_without_optional_sections() {
        let json = r#"{
            "format_version": 1,
            "name": "empty",
            "created_at": 0,
            "snapshot": {"folders": [], "pages": [], "media": [], "ctfs": [], "categories": []}
        }"#;
        let document = parse_backup_document(json).expect("should parse");
        assert_eq!(document.name, "empty");
        assert!(document.snapshot.settings.is_empty());
    }

    #[test]
    fn parse_rejects_undecodable_settings() {
        let json = r#"{
            "format_version": 1,
            "name": "bad settings",
            "created_at": 0,
            "snapshot": {
                "folders": [], "pages": [], "media": [], "ctfs": [], "categories": [],
                "settings": {"items_per_page": "\"lots\""}
            }
        }"#;
        let err = parse_backup_document(json).expect_err("should fail");
        assert!(matches!(err, BackupServiceError::InvalidSettings(_)));
    }

    #[test]
    fn parse_rejects_out_of_range_settings() {
        let json = r#"{
            "format_version": 1,
            "name": "zero page size",
            "created_at": 0,
            "snapshot": {
                "folders": [], "pages": [], "media": [], "ctfs": [], "categories": [],
                "settings": {"items_per_page": "0"}
            }
        }"#;
        let err = parse_backup_document(json).expect_err("should fail");
        assert!(matches!(err, BackupServiceError::Validation(_)));
    }
}
