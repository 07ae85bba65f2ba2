//! SQLite FTS5-based page search.
//!
//! # Responsibility
//! - Provide keyword search over page titles and plain-text bodies.
//! - Return typed hits with stable IDs.
//!
//! # Invariants
//! - Result ordering is deterministic by rank, then `updated_at DESC, id ASC`.
//! - Non-raw queries never surface FTS5 syntax errors.

use crate::db::DbError;
use crate::model::page::{PageId, PageStatus};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidQuery { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Optional publishing status filter.
    pub status: Option<PageStatus>,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    ///
    /// Default is `false` so search-as-you-type input never hits syntax errors.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    /// Creates a query with default limit and no status filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: None,
            limit: 20,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_pages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub page_id: PageId,
    pub title: String,
    pub slug: String,
    pub status: PageStatus,
    /// Matched fragment with `[`/`]` around hits.
    pub snippet: String,
}

/// Searches pages via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries and `limit == 0`.
pub fn search_pages(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            pages.id AS id,
            pages.title AS title,
            pages.slug AS slug,
            pages.status AS status,
            snippet(pages_fts, -1, '[', ']', ' ... ', 10) AS snippet
         FROM pages_fts
         JOIN pages ON pages.rowid = pages_fts.rowid
         WHERE pages_fts MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(status) = query.status {
        sql.push_str(" AND pages.status = ?");
        bind_values.push(Value::Text(status.as_str().to_string()));
    }

    sql.push_str(" ORDER BY bm25(pages_fts), pages.updated_at DESC, pages.id ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }

    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let id_text: String = row.get("id")?;
    let page_id = Uuid::parse_str(&id_text)
        .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{id_text}`")))?;

    let status_text: String = row.get("status")?;
    let status = PageStatus::parse(&status_text)
        .ok_or_else(|| SearchError::InvalidData(format!("invalid status `{status_text}`")))?;

    Ok(SearchHit {
        page_id,
        title: row.get("title")?,
        slug: row.get("slug")?,
        status,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
                || msg.contains("no such column")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_match_expression, SearchQuery};

    #[test]
    fn terms_are_quoted_and_joined() {
        let query = SearchQuery::new(r#" rust  "async" "#);
        assert_eq!(
            build_match_expression(&query).as_deref(),
            Some(r#""rust" AND """async""""#)
        );
    }

    #[test]
    fn raw_syntax_passes_through() {
        let mut query = SearchQuery::new("title:rust OR sqlite");
        query.raw_fts_syntax = true;
        assert_eq!(
            build_match_expression(&query).as_deref(),
            Some("title:rust OR sqlite")
        );
    }

    #[test]
    fn blank_query_has_no_expression() {
        assert_eq!(build_match_expression(&SearchQuery::new("   ")), None);
    }
}
