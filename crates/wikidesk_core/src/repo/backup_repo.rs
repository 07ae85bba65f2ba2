//! Backup storage and whole-store snapshot/restore.
//!
//! # Responsibility
//! - Store backup documents as JSON payloads with per-collection counts.
//! - Capture the live store into a `StoreSnapshot`.
//! - Replace every live collection from a snapshot in one transaction.
//!
//! # Invariants
//! - Backup lists are newest first (`created_at DESC`, insertion order as
//!   tiebreak).
//! - `replace_snapshot` either swaps the full store or changes nothing.

use crate::model::backup::{
    Backup, BackupDocument, BackupId, BackupSummary, SnapshotCounts, StoreSnapshot,
};
use crate::repo::category_repo::{load_all_categories, restore_category_row};
use crate::repo::ctf_repo::{load_all_ctfs, restore_ctf_row};
use crate::repo::folder_repo::{load_all_folders, restore_folder_row};
use crate::repo::media_repo::{load_all_media, restore_media_row};
use crate::repo::page_repo::{
    load_all_pages, load_all_versions, restore_page_row, restore_version_row,
};
use crate::repo::settings_repo::{load_settings, write_settings};
use crate::repo::{count_rows, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const BACKUP_SUMMARY_SQL: &str = "SELECT
    id,
    name,
    format_version,
    folder_count,
    page_count,
    media_count,
    ctf_count,
    category_count,
    created_at
FROM backups";

/// Tables cleared before a restore, children before parents.
const LIVE_TABLES: [&str; 10] = [
    "page_versions",
    "page_tags",
    "page_categories",
    "ctf_tags",
    "ctfs",
    "media_files",
    "pages",
    "categories",
    "folders",
    "settings",
];

/// Repository interface for backups.
pub trait BackupRepository {
    /// Stores a document under a new id. The row timestamp is the insert
    /// time, independent of `document.created_at`.
    fn insert_backup(&self, id: BackupId, document: &BackupDocument) -> RepoResult<BackupSummary>;
    fn get_backup(&self, id: BackupId) -> RepoResult<Option<Backup>>;
    /// Lists backup metadata, newest first.
    fn list_backups(&self) -> RepoResult<Vec<BackupSummary>>;
    fn delete_backup(&self, id: BackupId) -> RepoResult<()>;
    /// Keeps the `keep` newest backups and deletes the rest. Returns the
    /// number of deleted rows.
    fn prune_to(&self, keep: u32) -> RepoResult<u32>;
    /// Captures every live collection.
    fn load_snapshot(&self) -> RepoResult<StoreSnapshot>;
    /// Replaces every live collection with `snapshot`.
    fn replace_snapshot(&self, snapshot: &StoreSnapshot) -> RepoResult<SnapshotCounts>;
    fn count_backups(&self) -> RepoResult<u32>;
}

/// SQLite-backed backup repository.
pub struct SqliteBackupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBackupRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["backups", "settings", "pages", "folders"])?;
        Ok(Self { conn })
    }
}

impl BackupRepository for SqliteBackupRepository<'_> {
    fn insert_backup(&self, id: BackupId, document: &BackupDocument) -> RepoResult<BackupSummary> {
        document.validate()?;
        let payload = serde_json::to_string(document)
            .map_err(|err| RepoError::InvalidData(format!("backup payload: {err}")))?;
        let counts = document.snapshot.counts();

        self.conn.execute(
            "INSERT INTO backups (
                id, name, format_version, payload,
                folder_count, page_count, media_count, ctf_count, category_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id.to_string(),
                document.name.as_str(),
                document.format_version,
                payload,
                counts.folders,
                counts.pages,
                counts.media,
                counts.ctfs,
                counts.categories,
            ],
        )?;

        let summary = self.conn.query_row(
            &format!("{BACKUP_SUMMARY_SQL} WHERE id = ?1;"),
            [id.to_string()],
            |row| Ok(parse_summary_row(row)),
        )??;
        Ok(summary)
    }

    fn get_backup(&self, id: BackupId) -> RepoResult<Option<Backup>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id, name, format_version, folder_count, page_count, media_count,
                ctf_count, category_count, created_at, payload
             FROM backups
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let summary = parse_summary_row(row)?;
        let payload: String = row.get("payload")?;
        let document: BackupDocument = serde_json::from_str(&payload).map_err(|err| {
            RepoError::InvalidData(format!("backup {id} payload is not a valid document: {err}"))
        })?;
        Ok(Some(Backup { summary, document }))
    }

    fn list_backups(&self) -> RepoResult<Vec<BackupSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BACKUP_SUMMARY_SQL} ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut backups = Vec::new();
        while let Some(row) = rows.next()? {
            backups.push(parse_summary_row(row)?);
        }
        Ok(backups)
    }

    fn delete_backup(&self, id: BackupId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM backups WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "backup",
                id,
            });
        }
        Ok(())
    }

    fn prune_to(&self, keep: u32) -> RepoResult<u32> {
        let deleted = self.conn.execute(
            "DELETE FROM backups
             WHERE rowid NOT IN (
                SELECT rowid FROM backups
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?1
             );",
            [i64::from(keep)],
        )?;
        Ok(deleted as u32)
    }

    fn load_snapshot(&self) -> RepoResult<StoreSnapshot> {
        Ok(StoreSnapshot {
            folders: load_all_folders(self.conn)?,
            pages: load_all_pages(self.conn)?,
            page_versions: load_all_versions(self.conn)?,
            media: load_all_media(self.conn)?,
            ctfs: load_all_ctfs(self.conn)?,
            categories: load_all_categories(self.conn)?,
            settings: load_settings(self.conn)?,
        })
    }

    fn replace_snapshot(&self, snapshot: &StoreSnapshot) -> RepoResult<SnapshotCounts> {
        snapshot.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

        for table in LIVE_TABLES {
            tx.execute(&format!("DELETE FROM {table};"), [])?;
        }

        for folder in &snapshot.folders {
            restore_folder_row(&tx, folder)?;
        }
        for category in &snapshot.categories {
            restore_category_row(&tx, category)?;
        }
        for page in &snapshot.pages {
            restore_page_row(&tx, page)?;
        }
        for version in &snapshot.page_versions {
            restore_version_row(&tx, version)?;
        }
        for media in &snapshot.media {
            restore_media_row(&tx, media)?;
        }
        for ctf in &snapshot.ctfs {
            restore_ctf_row(&tx, ctf)?;
        }
        write_settings(&tx, &snapshot.settings)?;

        // Deferred violations surface here and roll the whole swap back.
        tx.commit()?;
        Ok(snapshot.counts())
    }

    fn count_backups(&self) -> RepoResult<u32> {
        count_rows(self.conn, "backups")
    }
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<BackupSummary> {
    let id_text: String = row.get("id")?;
    Ok(BackupSummary {
        id: parse_uuid(&id_text, "backups.id")?,
        name: row.get("name")?,
        format_version: row.get("format_version")?,
        counts: SnapshotCounts {
            folders: row.get("folder_count")?,
            pages: row.get("page_count")?,
            media: row.get("media_count")?,
            ctfs: row.get("ctf_count")?,
            categories: row.get("category_count")?,
        },
        created_at: row.get("created_at")?,
    })
}
