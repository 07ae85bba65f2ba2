//! Category repository contract and SQLite implementation.

use crate::model::category::{Category, CategoryId, CategoryWithCount};
use crate::repo::{count_rows, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    color,
    created_at,
    updated_at
FROM categories";

/// Repository interface for category operations.
pub trait CategoryRepository {
    fn insert_category(&self, category: &Category) -> RepoResult<Category>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Lists categories by name (case-insensitive), with linked page counts.
    fn list_categories(&self) -> RepoResult<Vec<CategoryWithCount>>;
    fn update_category(&self, category: &Category) -> RepoResult<()>;
    /// Deletes a category; page links go with it through `ON DELETE CASCADE`.
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
    /// Whether another category already uses `name` (case-insensitive).
    fn name_taken(&self, name: &str, exclude: Option<CategoryId>) -> RepoResult<bool>;
    fn count_categories(&self) -> RepoResult<u32>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["categories", "page_categories"])?;
        Ok(Self { conn })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn insert_category(&self, category: &Category) -> RepoResult<Category> {
        category.validate()?;
        self.conn.execute(
            "INSERT INTO categories (id, name, description, color)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id.to_string(),
                category.name.as_str(),
                category.description.as_deref(),
                category.color.as_deref(),
            ],
        )?;
        self.get_category(category.id)?
            .ok_or_else(|| not_found(category.id))
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_category_row(row)?));
        }
        Ok(None)
    }

    fn list_categories(&self) -> RepoResult<Vec<CategoryWithCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id,
                c.name,
                c.description,
                c.color,
                c.created_at,
                c.updated_at,
                (SELECT COUNT(*) FROM page_categories pc WHERE pc.category_id = c.id)
                    AS page_count
             FROM categories c
             ORDER BY c.name COLLATE NOCASE ASC, c.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(CategoryWithCount {
                category: parse_category_row(row)?,
                page_count: row.get("page_count")?,
            });
        }
        Ok(categories)
    }

    fn update_category(&self, category: &Category) -> RepoResult<()> {
        category.validate()?;
        let changed = self.conn.execute(
            "UPDATE categories
             SET name = ?2,
                 description = ?3,
                 color = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                category.id.to_string(),
                category.name.as_str(),
                category.description.as_deref(),
                category.color.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(category.id));
        }
        Ok(())
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn name_taken(&self, name: &str, exclude: Option<CategoryId>) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM categories
                WHERE name = ?1 COLLATE NOCASE
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![name, exclude.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }

    fn count_categories(&self) -> RepoResult<u32> {
        count_rows(self.conn, "categories")
    }
}

pub(crate) fn load_all_categories(conn: &Connection) -> RepoResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "{CATEGORY_SELECT_SQL} ORDER BY created_at ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        categories.push(parse_category_row(row)?);
    }
    Ok(categories)
}

pub(crate) fn restore_category_row(conn: &Connection, category: &Category) -> RepoResult<()> {
    category.validate()?;
    conn.execute(
        "INSERT INTO categories (id, name, description, color, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            category.id.to_string(),
            category.name.as_str(),
            category.description.as_deref(),
            category.color.as_deref(),
            category.created_at,
            category.updated_at,
        ],
    )?;
    Ok(())
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let id_text: String = row.get("id")?;
    let category = Category {
        id: parse_uuid(&id_text, "categories.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    category
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("category {id_text}: {err}")))?;
    Ok(category)
}

fn not_found(id: CategoryId) -> RepoError {
    RepoError::NotFound {
        entity: "category",
        id,
    }
}
