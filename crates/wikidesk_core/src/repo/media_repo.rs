//! Media library repository contract and SQLite implementation.
//!
//! # Invariants
//! - Media lists are sorted by `created_at DESC, id ASC`.
//! - Rows are hard-deleted; nothing references a media row.

use crate::model::folder::FolderId;
use crate::model::media::{MediaFile, MediaId, MediaKind};
use crate::repo::{
    count_rows, ensure_connection_ready, normalize_limit, parse_optional_uuid, parse_uuid,
    row_exists, FolderScope, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MEDIA_DEFAULT_LIMIT: u32 = 50;
const MEDIA_LIMIT_MAX: u32 = 200;

const MEDIA_SELECT_SQL: &str = "SELECT
    id,
    name,
    kind,
    url,
    mime_type,
    size_bytes,
    folder_id,
    description,
    created_at,
    updated_at
FROM media_files";

/// Query options for media listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaListQuery {
    pub kind: Option<MediaKind>,
    pub folder: FolderScope,
    /// Defaults to 50 and clamps to 200.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for media library operations.
pub trait MediaRepository {
    fn insert_media(&self, media: &MediaFile) -> RepoResult<MediaFile>;
    fn get_media(&self, id: MediaId) -> RepoResult<Option<MediaFile>>;
    fn list_media(&self, query: &MediaListQuery) -> RepoResult<Vec<MediaFile>>;
    /// Persists name, description and folder of an existing row.
    fn update_media(&self, media: &MediaFile) -> RepoResult<()>;
    fn delete_media(&self, id: MediaId) -> RepoResult<()>;
    fn folder_exists(&self, id: FolderId) -> RepoResult<bool>;
    fn count_media(&self) -> RepoResult<u32>;
}

/// SQLite-backed media repository.
pub struct SqliteMediaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMediaRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["media_files", "folders"])?;
        Ok(Self { conn })
    }
}

impl MediaRepository for SqliteMediaRepository<'_> {
    fn insert_media(&self, media: &MediaFile) -> RepoResult<MediaFile> {
        media.validate()?;
        self.conn.execute(
            "INSERT INTO media_files (
                id, name, kind, url, mime_type, size_bytes, folder_id, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                media.id.to_string(),
                media.name.as_str(),
                media.kind.as_str(),
                media.url.as_str(),
                media.mime_type.as_deref(),
                media.size_bytes,
                media.folder_id.map(|id| id.to_string()),
                media.description.as_deref(),
            ],
        )?;
        self.get_media(media.id)?.ok_or_else(|| not_found(media.id))
    }

    fn get_media(&self, id: MediaId) -> RepoResult<Option<MediaFile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEDIA_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_media_row(row)?));
        }
        Ok(None)
    }

    fn list_media(&self, query: &MediaListQuery) -> RepoResult<Vec<MediaFile>> {
        let mut sql = format!("{MEDIA_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        match query.folder {
            FolderScope::All => {}
            FolderScope::Unfiled => sql.push_str(" AND folder_id IS NULL"),
            FolderScope::In(folder_id) => {
                sql.push_str(" AND folder_id = ?");
                bind_values.push(Value::Text(folder_id.to_string()));
            }
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?");
        let limit = normalize_limit(query.limit, MEDIA_DEFAULT_LIMIT, MEDIA_LIMIT_MAX);
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut media = Vec::new();
        while let Some(row) = rows.next()? {
            media.push(parse_media_row(row)?);
        }
        Ok(media)
    }

    fn update_media(&self, media: &MediaFile) -> RepoResult<()> {
        media.validate()?;
        let changed = self.conn.execute(
            "UPDATE media_files
             SET name = ?2,
                 description = ?3,
                 folder_id = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                media.id.to_string(),
                media.name.as_str(),
                media.description.as_deref(),
                media.folder_id.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(media.id));
        }
        Ok(())
    }

    fn delete_media(&self, id: MediaId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM media_files WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn folder_exists(&self, id: FolderId) -> RepoResult<bool> {
        row_exists(self.conn, "folders", id)
    }

    fn count_media(&self) -> RepoResult<u32> {
        count_rows(self.conn, "media_files")
    }
}

pub(crate) fn load_all_media(conn: &Connection) -> RepoResult<Vec<MediaFile>> {
    let mut stmt = conn.prepare(&format!(
        "{MEDIA_SELECT_SQL} ORDER BY created_at ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut media = Vec::new();
    while let Some(row) = rows.next()? {
        media.push(parse_media_row(row)?);
    }
    Ok(media)
}

pub(crate) fn restore_media_row(conn: &Connection, media: &MediaFile) -> RepoResult<()> {
    media.validate()?;
    conn.execute(
        "INSERT INTO media_files (
            id, name, kind, url, mime_type, size_bytes, folder_id, description,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            media.id.to_string(),
            media.name.as_str(),
            media.kind.as_str(),
            media.url.as_str(),
            media.mime_type.as_deref(),
            media.size_bytes,
            media.folder_id.map(|id| id.to_string()),
            media.description.as_deref(),
            media.created_at,
            media.updated_at,
        ],
    )?;
    Ok(())
}

fn parse_media_row(row: &Row<'_>) -> RepoResult<MediaFile> {
    let id_text: String = row.get("id")?;
    let kind_text: String = row.get("kind")?;
    let kind = MediaKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid media kind `{kind_text}` in media_files.kind"))
    })?;

    let media = MediaFile {
        id: parse_uuid(&id_text, "media_files.id")?,
        name: row.get("name")?,
        kind,
        url: row.get("url")?,
        mime_type: row.get("mime_type")?,
        size_bytes: row.get("size_bytes")?,
        folder_id: parse_optional_uuid(row.get("folder_id")?, "media_files.folder_id")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    media
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("media {id_text}: {err}")))?;
    Ok(media)
}

fn not_found(id: MediaId) -> RepoError {
    RepoError::NotFound {
        entity: "media",
        id,
    }
}
