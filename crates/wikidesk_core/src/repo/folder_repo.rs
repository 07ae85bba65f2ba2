//! Folder hierarchy repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the folder tree and its ordering.
//! - Apply folder deletion modes atomically, including content relocation
//!   and subtree removal.
//!
//! # Invariants
//! - Child listing is deterministic: `sort_order ASC, id ASC`.
//! - No page, media file or folder ever references a deleted folder.

use crate::model::folder::{Folder, FolderId};
use crate::repo::{
    count_rows, ensure_connection_ready, parse_optional_uuid, parse_uuid, row_exists, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const FOLDER_SELECT_SQL: &str = "SELECT
    id,
    name,
    parent_id,
    description,
    sort_order,
    created_at,
    updated_at
FROM folders";

/// Direct contents of one folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderContents {
    pub folders: u32,
    pub pages: u32,
    pub media: u32,
}

impl FolderContents {
    pub fn is_empty(&self) -> bool {
        self.folders == 0 && self.pages == 0 && self.media == 0
    }
}

/// Rows removed by a cascading folder delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub folders: u32,
    pub pages: u32,
    pub media: u32,
}

/// Repository interface for folder hierarchy operations.
pub trait FolderRepository {
    /// Creates one folder as the last child of `parent_id`.
    fn create_folder(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<Folder>;
    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>>;
    fn list_children(&self, parent_id: Option<FolderId>) -> RepoResult<Vec<Folder>>;
    /// Lists every folder ordered by parent then sibling order.
    fn list_folders(&self) -> RepoResult<Vec<Folder>>;
    /// Whether a sibling under `parent_id` already uses `name`
    /// (case-insensitive), ignoring `exclude`.
    fn sibling_name_taken(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> RepoResult<bool>;
    fn rename_folder(&self, id: FolderId, name: &str) -> RepoResult<()>;
    fn set_description(&self, id: FolderId, description: Option<&str>) -> RepoResult<()>;
    /// Moves a folder under `new_parent_id` at `target_order` (append when
    /// `None`) and resequences the destination siblings.
    fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
        target_order: Option<i64>,
    ) -> RepoResult<()>;
    fn contents(&self, id: FolderId) -> RepoResult<FolderContents>;
    /// Deletes an empty folder.
    fn delete_empty_folder(&self, id: FolderId) -> RepoResult<()>;
    /// Deletes a folder after moving its children, pages and media to its
    /// parent.
    fn delete_folder_dissolve(&self, id: FolderId) -> RepoResult<()>;
    /// Deletes a folder subtree with every page and media file inside it.
    fn delete_folder_cascade(&self, id: FolderId) -> RepoResult<CascadeReport>;
    fn count_folders(&self) -> RepoResult<u32>;
}

/// SQLite-backed folder repository.
pub struct SqliteFolderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFolderRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["folders", "pages", "media_files"])?;
        Ok(Self { conn })
    }
}

impl FolderRepository for SqliteFolderRepository<'_> {
    fn create_folder(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<Folder> {
        let id = FolderId::new_v4();
        let sort_order = next_sort_order(self.conn, parent_id)?;
        let draft = Folder {
            id,
            name: name.to_string(),
            parent_id,
            description: description.map(str::to_string),
            sort_order,
            created_at: 0,
            updated_at: 0,
        };
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO folders (id, name, parent_id, description, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                name,
                parent_id.map(|value| value.to_string()),
                description,
                sort_order,
            ],
        )?;
        load_required_folder(self.conn, id)
    }

    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn list_children(&self, parent_id: Option<FolderId>) -> RepoResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FOLDER_SELECT_SQL}
             WHERE parent_id IS ?1
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([parent_id.map(|value| value.to_string())])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn list_folders(&self) -> RepoResult<Vec<Folder>> {
        load_all_folders(self.conn)
    }

    fn sibling_name_taken(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM folders
                WHERE parent_id IS ?1
                  AND name = ?2 COLLATE NOCASE
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![
                parent_id.map(|value| value.to_string()),
                name,
                exclude.map(|value| value.to_string()),
            ],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }

    fn rename_folder(&self, id: FolderId, name: &str) -> RepoResult<()> {
        let mut folder = load_required_folder(self.conn, id)?;
        folder.name = name.to_string();
        folder.validate()?;

        self.conn.execute(
            "UPDATE folders
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), name],
        )?;
        Ok(())
    }

    fn set_description(&self, id: FolderId, description: Option<&str>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE folders
             SET description = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), description],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
        target_order: Option<i64>,
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "folders", id)? {
            return Err(not_found(id));
        }

        let mut sibling_ids = list_child_ids(&tx, new_parent_id)?;
        sibling_ids.retain(|sibling| *sibling != id);

        let target_index = target_order
            .unwrap_or(sibling_ids.len() as i64)
            .clamp(0, sibling_ids.len() as i64) as usize;
        sibling_ids.insert(target_index, id);

        tx.execute(
            "UPDATE folders
             SET parent_id = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), new_parent_id.map(|value| value.to_string())],
        )?;
        resequence(&tx, &sibling_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn contents(&self, id: FolderId) -> RepoResult<FolderContents> {
        let folder_id = id.to_string();
        let count = |sql: &str| -> RepoResult<u32> {
            Ok(self
                .conn
                .query_row(sql, [folder_id.as_str()], |row| row.get(0))?)
        };
        Ok(FolderContents {
            folders: count("SELECT COUNT(*) FROM folders WHERE parent_id = ?1;")?,
            pages: count("SELECT COUNT(*) FROM pages WHERE folder_id = ?1;")?,
            media: count("SELECT COUNT(*) FROM media_files WHERE folder_id = ?1;")?,
        })
    }

    fn delete_empty_folder(&self, id: FolderId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM folders WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn delete_folder_dissolve(&self, id: FolderId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let folder = load_required_folder(&tx, id)?;
        let parent = folder.parent_id.map(|value| value.to_string());
        let folder_id = id.to_string();

        let children = list_child_ids(&tx, Some(id))?;
        let base_order = next_sort_order(&tx, folder.parent_id)?;
        for (index, child_id) in children.into_iter().enumerate() {
            tx.execute(
                "UPDATE folders
                 SET parent_id = ?2,
                     sort_order = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![child_id.to_string(), parent.as_deref(), base_order + index as i64],
            )?;
        }

        tx.execute(
            "UPDATE pages SET folder_id = ?2 WHERE folder_id = ?1;",
            params![folder_id.as_str(), parent.as_deref()],
        )?;
        tx.execute(
            "UPDATE media_files SET folder_id = ?2 WHERE folder_id = ?1;",
            params![folder_id.as_str(), parent.as_deref()],
        )?;
        tx.execute("DELETE FROM folders WHERE id = ?1;", [folder_id.as_str()])?;

        tx.commit()?;
        Ok(())
    }

    fn delete_folder_cascade(&self, id: FolderId) -> RepoResult<CascadeReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "folders", id)? {
            return Err(not_found(id));
        }
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

        let subtree = list_subtree_deepest_first(&tx, id)?;
        let mut report = CascadeReport::default();
        for folder_id in &subtree {
            let folder_id = folder_id.to_string();
            report.pages += tx.execute(
                "DELETE FROM pages WHERE folder_id = ?1;",
                [folder_id.as_str()],
            )? as u32;
            report.media += tx.execute(
                "DELETE FROM media_files WHERE folder_id = ?1;",
                [folder_id.as_str()],
            )? as u32;
            report.folders +=
                tx.execute("DELETE FROM folders WHERE id = ?1;", [folder_id.as_str()])? as u32;
        }

        tx.commit()?;
        Ok(report)
    }

    fn count_folders(&self) -> RepoResult<u32> {
        count_rows(self.conn, "folders")
    }
}

/// Loads every folder ordered by parent then sibling order. Used for
/// snapshots and full tree listing.
pub(crate) fn load_all_folders(conn: &Connection) -> RepoResult<Vec<Folder>> {
    let mut stmt = conn.prepare(&format!(
        "{FOLDER_SELECT_SQL} ORDER BY parent_id ASC, sort_order ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut folders = Vec::new();
    while let Some(row) = rows.next()? {
        folders.push(parse_folder_row(row)?);
    }
    Ok(folders)
}

/// Writes a folder exactly as given. Callers own the transaction and
/// foreign key deferral.
pub(crate) fn restore_folder_row(conn: &Connection, folder: &Folder) -> RepoResult<()> {
    folder.validate()?;
    conn.execute(
        "INSERT INTO folders (id, name, parent_id, description, sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            folder.id.to_string(),
            folder.name.as_str(),
            folder.parent_id.map(|value| value.to_string()),
            folder.description.as_deref(),
            folder.sort_order,
            folder.created_at,
            folder.updated_at,
        ],
    )?;
    Ok(())
}

fn load_required_folder(conn: &Connection, id: FolderId) -> RepoResult<Folder> {
    let mut stmt = conn.prepare(&format!("{FOLDER_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_folder_row(row);
    }
    Err(not_found(id))
}

fn list_child_ids(conn: &Connection, parent_id: Option<FolderId>) -> RepoResult<Vec<FolderId>> {
    let mut stmt = conn.prepare(
        "SELECT id
         FROM folders
         WHERE parent_id IS ?1
         ORDER BY sort_order ASC, id ASC;",
    )?;
    let mut rows = stmt.query([parent_id.map(|value| value.to_string())])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "folders.id")?);
    }
    Ok(ids)
}

fn list_subtree_deepest_first(conn: &Connection, root: FolderId) -> RepoResult<Vec<FolderId>> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE subtree(id, depth) AS (
            SELECT id, 0
            FROM folders
            WHERE id = ?1
            UNION ALL
            SELECT child.id, parent.depth + 1
            FROM folders child
            INNER JOIN subtree parent ON child.parent_id = parent.id
            WHERE parent.depth < (SELECT COUNT(*) FROM folders)
        )
        SELECT id FROM subtree GROUP BY id ORDER BY MAX(depth) DESC, id ASC;",
    )?;
    let mut rows = stmt.query([root.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "folders.id")?);
    }
    Ok(ids)
}

fn resequence(conn: &Connection, ordered_ids: &[FolderId]) -> RepoResult<()> {
    for (index, id) in ordered_ids.iter().enumerate() {
        conn.execute(
            "UPDATE folders SET sort_order = ?2 WHERE id = ?1;",
            params![id.to_string(), index as i64],
        )?;
    }
    Ok(())
}

fn next_sort_order(conn: &Connection, parent_id: Option<FolderId>) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM folders
         WHERE parent_id IS ?1;",
        [parent_id.map(|value| value.to_string())],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn parse_folder_row(row: &Row<'_>) -> RepoResult<Folder> {
    let id_text: String = row.get("id")?;
    let folder = Folder {
        id: parse_uuid(&id_text, "folders.id")?,
        name: row.get("name")?,
        parent_id: parse_optional_uuid(row.get("parent_id")?, "folders.parent_id")?,
        description: row.get("description")?,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    folder
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("folder {id_text}: {err}")))?;
    Ok(folder)
}

fn not_found(id: FolderId) -> RepoError {
    RepoError::NotFound {
        entity: "folder",
        id,
    }
}
