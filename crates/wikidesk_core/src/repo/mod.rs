//! Repository layer: persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define one data access trait per entity.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Write paths call the record's `validate()` before SQL mutations.
//! - Read paths reject corrupt persisted rows with `RepoError::InvalidData`.
//! - Repositories only accept connections migrated to `latest_version()`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod backup_repo;
pub mod category_repo;
pub mod ctf_repo;
pub mod folder_repo;
pub mod media_repo;
pub mod page_repo;
pub mod settings_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every entity repository.
#[derive(Debug)]
pub enum RepoError {
    /// Record failed validation before write.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target record does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Persisted data cannot be converted into a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Selects rows by folder placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FolderScope {
    /// No folder filter.
    #[default]
    All,
    /// Only rows without a folder.
    Unfiled,
    /// Only rows directly inside the folder.
    In(Uuid),
}

/// Normalizes one tag value: trimmed and lowercased, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

/// Clamps a list limit: `None`/`0` → `default`, above `max` → `max`.
pub fn normalize_limit(limit: Option<u32>, default: u32, max: u32) -> u32 {
    match limit {
        None | Some(0) => default,
        Some(value) if value > max => max,
        Some(value) => value,
    }
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn row_exists(conn: &Connection, table: &'static str, id: Uuid) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn count_rows(conn: &Connection, table: &'static str) -> RepoResult<u32> {
    let count: u32 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Replaces the tag set of one owner row. Callers own the transaction.
pub(crate) fn replace_tags(
    conn: &Connection,
    table: &'static str,
    owner_column: &'static str,
    owner_id: Uuid,
    tags: &[String],
) -> RepoResult<()> {
    let owner = owner_id.to_string();
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_column} = ?1;"),
        [owner.as_str()],
    )?;
    for tag in normalize_tags(tags) {
        conn.execute(
            &format!("INSERT INTO {table} ({owner_column}, name) VALUES (?1, ?2);"),
            [owner.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

pub(crate) fn load_tags(
    conn: &Connection,
    table: &'static str,
    owner_column: &'static str,
    owner_id: &str,
) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name FROM {table} WHERE {owner_column} = ?1 ORDER BY name ASC;"
    ))?;
    let mut rows = stmt.query([owner_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::{normalize_limit, normalize_tags};

    #[test]
    fn normalize_tags_dedupes_case_insensitively_and_sorts() {
        let tags = vec![
            "Web".to_string(),
            " crypto ".to_string(),
            "WEB".to_string(),
            "   ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["crypto", "web"]);
    }

    #[test]
    fn normalize_limit_defaults_and_caps() {
        assert_eq!(normalize_limit(None, 20, 100), 20);
        assert_eq!(normalize_limit(Some(0), 20, 100), 20);
        assert_eq!(normalize_limit(Some(500), 20, 100), 100);
        assert_eq!(normalize_limit(Some(7), 20, 100), 7);
    }
}
