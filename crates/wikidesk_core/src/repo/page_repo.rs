//! Page repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist pages with their tags, category links and revision history.
//! - Keep page list filtering and ordering inside the persistence boundary.
//!
//! # Invariants
//! - Page lists are sorted by `updated_at DESC, id ASC`.
//! - Tag and category sets are replaced atomically.
//! - A content update and its revision row are written in one transaction.
//! - `published_at` is set by the first transition to `published` only.

use crate::model::category::CategoryId;
use crate::model::folder::FolderId;
use crate::model::page::{Page, PageId, PageStatus, PageVersion};
use crate::repo::{
    count_rows, ensure_connection_ready, load_tags, normalize_limit, parse_optional_uuid,
    parse_uuid, replace_tags, row_exists, FolderScope, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const PAGES_DEFAULT_LIMIT: u32 = 20;
const PAGES_LIMIT_MAX: u32 = 100;

const PAGE_SELECT_SQL: &str = "SELECT
    id,
    title,
    slug,
    content,
    plain_text,
    excerpt,
    cover_image,
    folder_id,
    status,
    author,
    published_at,
    version,
    created_at,
    updated_at
FROM pages";

/// Query options for page listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageListQuery {
    pub folder: FolderScope,
    pub status: Option<PageStatus>,
    pub category_id: Option<CategoryId>,
    /// Exact tag match after normalization.
    pub tag: Option<String>,
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for page operations.
pub trait PageRepository {
    /// Inserts one page with its tags and categories, then reads it back.
    fn insert_page(&self, page: &Page) -> RepoResult<Page>;
    /// Replaces title/content/derived fields/author/folder. When `revision`
    /// is set it is appended to history in the same transaction.
    fn update_page(&self, page: &Page, revision: Option<&PageVersion>) -> RepoResult<()>;
    fn set_page_status(&self, id: PageId, status: PageStatus) -> RepoResult<()>;
    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>>;
    fn get_page_by_slug(&self, slug: &str) -> RepoResult<Option<Page>>;
    fn list_pages(&self, query: &PageListQuery) -> RepoResult<Vec<Page>>;
    /// Whether `slug` is used by a page other than `exclude`.
    fn slug_taken(&self, slug: &str, exclude: Option<PageId>) -> RepoResult<bool>;
    fn set_page_tags(&self, id: PageId, tags: &[String]) -> RepoResult<()>;
    fn set_page_categories(&self, id: PageId, category_ids: &[CategoryId]) -> RepoResult<()>;
    /// Lists revisions, newest first.
    fn list_versions(&self, id: PageId) -> RepoResult<Vec<PageVersion>>;
    fn get_version(&self, id: PageId, version: i64) -> RepoResult<Option<PageVersion>>;
    fn delete_page(&self, id: PageId) -> RepoResult<()>;
    fn folder_exists(&self, id: FolderId) -> RepoResult<bool>;
    /// Returns the ids from `category_ids` with no matching category.
    fn missing_categories(&self, category_ids: &[CategoryId]) -> RepoResult<Vec<CategoryId>>;
    fn count_pages(&self) -> RepoResult<u32>;
}

/// SQLite-backed page repository.
pub struct SqlitePageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePageRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["pages", "page_tags", "page_categories", "page_versions"],
        )?;
        Ok(Self { conn })
    }
}

impl PageRepository for SqlitePageRepository<'_> {
    fn insert_page(&self, page: &Page) -> RepoResult<Page> {
        page.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO pages (
                id,
                title,
                slug,
                content,
                plain_text,
                excerpt,
                cover_image,
                folder_id,
                status,
                author,
                published_at,
                version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                CASE WHEN ?9 = 'published' THEN (strftime('%s', 'now') * 1000) ELSE NULL END,
                ?11
            );",
            params![
                page.id.to_string(),
                page.title.as_str(),
                page.slug.as_str(),
                page.content.as_str(),
                page.plain_text.as_str(),
                page.excerpt.as_deref(),
                page.cover_image.as_deref(),
                page.folder_id.map(|id| id.to_string()),
                page.status.as_str(),
                page.author.as_deref(),
                page.version,
            ],
        )?;
        replace_tags(&tx, "page_tags", "page_id", page.id, &page.tags)?;
        replace_category_links(&tx, page.id, &page.category_ids)?;
        tx.commit()?;

        load_required_page(self.conn, page.id)
    }

    fn update_page(&self, page: &Page, revision: Option<&PageVersion>) -> RepoResult<()> {
        page.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE pages
             SET
                title = ?2,
                slug = ?3,
                content = ?4,
                plain_text = ?5,
                excerpt = ?6,
                cover_image = ?7,
                folder_id = ?8,
                author = ?9,
                version = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                page.id.to_string(),
                page.title.as_str(),
                page.slug.as_str(),
                page.content.as_str(),
                page.plain_text.as_str(),
                page.excerpt.as_deref(),
                page.cover_image.as_deref(),
                page.folder_id.map(|id| id.to_string()),
                page.author.as_deref(),
                page.version,
            ],
        )?;
        if changed == 0 {
            return Err(not_found(page.id));
        }
        if let Some(revision) = revision {
            insert_version_row(&tx, revision)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn set_page_status(&self, id: PageId, status: PageStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE pages
             SET
                status = ?2,
                published_at = CASE
                    WHEN ?2 = 'published' AND published_at IS NULL
                        THEN (strftime('%s', 'now') * 1000)
                    ELSE published_at
                END,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>> {
        query_one_page(self.conn, "id", &id.to_string())
    }

    fn get_page_by_slug(&self, slug: &str) -> RepoResult<Option<Page>> {
        query_one_page(self.conn, "slug", slug)
    }

    fn list_pages(&self, query: &PageListQuery) -> RepoResult<Vec<Page>> {
        let mut sql = format!("{PAGE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match query.folder {
            FolderScope::All => {}
            FolderScope::Unfiled => sql.push_str(" AND folder_id IS NULL"),
            FolderScope::In(folder_id) => {
                sql.push_str(" AND folder_id = ?");
                bind_values.push(Value::Text(folder_id.to_string()));
            }
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        if let Some(category_id) = query.category_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1 FROM page_categories pc
                    WHERE pc.page_id = pages.id AND pc.category_id = ?
                )",
            );
            bind_values.push(Value::Text(category_id.to_string()));
        }

        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1 FROM page_tags pt
                    WHERE pt.page_id = pages.id AND pt.name = ?
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY updated_at DESC, id ASC LIMIT ?");
        let limit = normalize_page_limit(query.limit);
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut pages = Vec::new();
        while let Some(row) = rows.next()? {
            pages.push(parse_page_row(self.conn, row)?);
        }
        Ok(pages)
    }

    fn slug_taken(&self, slug: &str, exclude: Option<PageId>) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM pages
                WHERE slug = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![slug, exclude.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }

    fn set_page_tags(&self, id: PageId, tags: &[String]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "pages", id)? {
            return Err(not_found(id));
        }
        replace_tags(&tx, "page_tags", "page_id", id, tags)?;
        touch_page(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    fn set_page_categories(&self, id: PageId, category_ids: &[CategoryId]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "pages", id)? {
            return Err(not_found(id));
        }
        replace_category_links(&tx, id, category_ids)?;
        touch_page(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    fn list_versions(&self, id: PageId) -> RepoResult<Vec<PageVersion>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, version, title, content, created_at
             FROM page_versions
             WHERE page_id = ?1
             ORDER BY version DESC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(parse_version_row(row)?);
        }
        Ok(versions)
    }

    fn get_version(&self, id: PageId, version: i64) -> RepoResult<Option<PageVersion>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, version, title, content, created_at
             FROM page_versions
             WHERE page_id = ?1 AND version = ?2;",
        )?;
        let mut rows = stmt.query(params![id.to_string(), version])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_version_row(row)?));
        }
        Ok(None)
    }

    fn delete_page(&self, id: PageId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM pages WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn folder_exists(&self, id: FolderId) -> RepoResult<bool> {
        row_exists(self.conn, "folders", id)
    }

    fn missing_categories(&self, category_ids: &[CategoryId]) -> RepoResult<Vec<CategoryId>> {
        let mut missing = Vec::new();
        for id in category_ids {
            if !row_exists(self.conn, "categories", *id)? {
                missing.push(*id);
            }
        }
        Ok(missing)
    }

    fn count_pages(&self) -> RepoResult<u32> {
        count_rows(self.conn, "pages")
    }
}

/// Normalizes list limit according to the pages contract.
pub fn normalize_page_limit(limit: Option<u32>) -> u32 {
    normalize_limit(limit, PAGES_DEFAULT_LIMIT, PAGES_LIMIT_MAX)
}

/// Loads every page, oldest first. Used for snapshots.
pub(crate) fn load_all_pages(conn: &Connection) -> RepoResult<Vec<Page>> {
    let mut stmt = conn.prepare(&format!("{PAGE_SELECT_SQL} ORDER BY created_at ASC, id ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut pages = Vec::new();
    while let Some(row) = rows.next()? {
        pages.push(parse_page_row(conn, row)?);
    }
    Ok(pages)
}

/// Loads every revision row. Used for snapshots.
pub(crate) fn load_all_versions(conn: &Connection) -> RepoResult<Vec<PageVersion>> {
    let mut stmt = conn.prepare(
        "SELECT page_id, version, title, content, created_at
         FROM page_versions
         ORDER BY page_id ASC, version ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut versions = Vec::new();
    while let Some(row) = rows.next()? {
        versions.push(parse_version_row(row)?);
    }
    Ok(versions)
}

/// Writes a page exactly as given, timestamps included. Callers own the
/// transaction and foreign key deferral.
pub(crate) fn restore_page_row(conn: &Connection, page: &Page) -> RepoResult<()> {
    page.validate()?;
    conn.execute(
        "INSERT INTO pages (
            id, title, slug, content, plain_text, excerpt, cover_image, folder_id,
            status, author, published_at, version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
        params![
            page.id.to_string(),
            page.title.as_str(),
            page.slug.as_str(),
            page.content.as_str(),
            page.plain_text.as_str(),
            page.excerpt.as_deref(),
            page.cover_image.as_deref(),
            page.folder_id.map(|id| id.to_string()),
            page.status.as_str(),
            page.author.as_deref(),
            page.published_at,
            page.version,
            page.created_at,
            page.updated_at,
        ],
    )?;
    replace_tags(conn, "page_tags", "page_id", page.id, &page.tags)?;
    replace_category_links(conn, page.id, &page.category_ids)?;
    Ok(())
}

pub(crate) fn restore_version_row(conn: &Connection, version: &PageVersion) -> RepoResult<()> {
    insert_version_row(conn, version)
}

fn insert_version_row(conn: &Connection, version: &PageVersion) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO page_versions (page_id, version, title, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            version.page_id.to_string(),
            version.version,
            version.title.as_str(),
            version.content.as_str(),
            version.created_at,
        ],
    )?;
    Ok(())
}

fn replace_category_links(
    conn: &Connection,
    page_id: PageId,
    category_ids: &[CategoryId],
) -> RepoResult<()> {
    let page = page_id.to_string();
    conn.execute(
        "DELETE FROM page_categories WHERE page_id = ?1;",
        [page.as_str()],
    )?;
    for category_id in category_ids {
        conn.execute(
            "INSERT OR IGNORE INTO page_categories (page_id, category_id) VALUES (?1, ?2);",
            params![page.as_str(), category_id.to_string()],
        )?;
    }
    Ok(())
}

fn touch_page(conn: &Connection, id: PageId) -> RepoResult<()> {
    conn.execute(
        "UPDATE pages SET updated_at = (strftime('%s', 'now') * 1000) WHERE id = ?1;",
        [id.to_string()],
    )?;
    Ok(())
}

fn query_one_page(conn: &Connection, column: &'static str, value: &str) -> RepoResult<Option<Page>> {
    let mut stmt = conn.prepare(&format!("{PAGE_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([value])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_page_row(conn, row)?));
    }
    Ok(None)
}

fn load_required_page(conn: &Connection, id: PageId) -> RepoResult<Page> {
    query_one_page(conn, "id", &id.to_string())?.ok_or_else(|| not_found(id))
}

fn load_category_ids(conn: &Connection, page_id: &str) -> RepoResult<Vec<CategoryId>> {
    let mut stmt = conn.prepare(
        "SELECT category_id
         FROM page_categories
         WHERE page_id = ?1
         ORDER BY category_id ASC;",
    )?;
    let mut rows = stmt.query([page_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "page_categories.category_id")?);
    }
    Ok(ids)
}

fn parse_page_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Page> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "pages.id")?;

    let status_text: String = row.get("status")?;
    let status = PageStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid page status `{status_text}` in pages.status"))
    })?;

    let page = Page {
        id,
        title: row.get("title")?,
        slug: row.get("slug")?,
        content: row.get("content")?,
        plain_text: row.get("plain_text")?,
        excerpt: row.get("excerpt")?,
        cover_image: row.get("cover_image")?,
        folder_id: parse_optional_uuid(row.get("folder_id")?, "pages.folder_id")?,
        status,
        author: row.get("author")?,
        published_at: row.get("published_at")?,
        version: row.get("version")?,
        tags: load_tags(conn, "page_tags", "page_id", &id_text)?,
        category_ids: load_category_ids(conn, &id_text)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    page
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("page {id_text}: {err}")))?;
    Ok(page)
}

fn parse_version_row(row: &Row<'_>) -> RepoResult<PageVersion> {
    let page_id_text: String = row.get("page_id")?;
    Ok(PageVersion {
        page_id: parse_uuid(&page_id_text, "page_versions.page_id")?,
        version: row.get("version")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    })
}

fn not_found(id: PageId) -> RepoError {
    RepoError::NotFound { entity: "page", id }
}
