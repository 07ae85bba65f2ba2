//! CTF challenge repository contract and SQLite implementation.
//!
//! # Invariants
//! - Lists are sorted by `created_at DESC, id ASC`.
//! - `solved_at` is written together with `solved` and cleared with it.

use crate::model::ctf::{Ctf, CtfDifficulty, CtfId, DifficultyStats};
use crate::model::page::PageId;
use crate::repo::{
    bool_to_int, count_rows, ensure_connection_ready, load_tags, normalize_limit, parse_bool,
    parse_optional_uuid, parse_uuid, replace_tags, row_exists, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const CTFS_DEFAULT_LIMIT: u32 = 50;
const CTFS_LIMIT_MAX: u32 = 200;

const CTF_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    category,
    difficulty,
    points,
    flag_format,
    platform,
    solved,
    solved_at,
    writeup_page_id,
    created_at,
    updated_at
FROM ctfs";

/// Query options for challenge listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtfListQuery {
    pub difficulty: Option<CtfDifficulty>,
    pub solved: Option<bool>,
    /// Exact tag match after normalization.
    pub tag: Option<String>,
    /// Case-insensitive match on the challenge area.
    pub category: Option<String>,
    /// Defaults to 50 and clamps to 200.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for challenge tracking.
pub trait CtfRepository {
    fn insert_ctf(&self, ctf: &Ctf) -> RepoResult<Ctf>;
    /// Persists every editable field except tags and solve state.
    fn update_ctf(&self, ctf: &Ctf) -> RepoResult<()>;
    fn get_ctf(&self, id: CtfId) -> RepoResult<Option<Ctf>>;
    fn list_ctfs(&self, query: &CtfListQuery) -> RepoResult<Vec<Ctf>>;
    fn set_ctf_tags(&self, id: CtfId, tags: &[String]) -> RepoResult<()>;
    /// Sets solve state. `solved_at` is stamped on the first transition to
    /// solved and cleared when unsolved.
    fn set_solved(&self, id: CtfId, solved: bool) -> RepoResult<()>;
    fn delete_ctf(&self, id: CtfId) -> RepoResult<()>;
    fn page_exists(&self, id: PageId) -> RepoResult<bool>;
    /// Per-difficulty totals with points; one entry per difficulty.
    fn difficulty_totals(&self) -> RepoResult<Vec<DifficultyTotals>>;
    fn count_ctfs(&self) -> RepoResult<u32>;
}

/// Raw aggregate for one difficulty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyTotals {
    pub stats: DifficultyStats,
    pub points_available: i64,
    pub points_earned: i64,
}

/// SQLite-backed challenge repository.
pub struct SqliteCtfRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCtfRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["ctfs", "ctf_tags", "pages"])?;
        Ok(Self { conn })
    }
}

impl CtfRepository for SqliteCtfRepository<'_> {
    fn insert_ctf(&self, ctf: &Ctf) -> RepoResult<Ctf> {
        ctf.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO ctfs (
                id, title, description, category, difficulty, points,
                flag_format, platform, writeup_page_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                ctf.id.to_string(),
                ctf.title.as_str(),
                ctf.description.as_str(),
                ctf.category.as_deref(),
                ctf.difficulty.as_str(),
                ctf.points,
                ctf.flag_format.as_deref(),
                ctf.platform.as_deref(),
                ctf.writeup_page_id.map(|id| id.to_string()),
            ],
        )?;
        replace_tags(&tx, "ctf_tags", "ctf_id", ctf.id, &ctf.tags)?;
        tx.commit()?;

        self.get_ctf(ctf.id)?.ok_or_else(|| not_found(ctf.id))
    }

    fn update_ctf(&self, ctf: &Ctf) -> RepoResult<()> {
        ctf.validate()?;
        let changed = self.conn.execute(
            "UPDATE ctfs
             SET title = ?2,
                 description = ?3,
                 category = ?4,
                 difficulty = ?5,
                 points = ?6,
                 flag_format = ?7,
                 platform = ?8,
                 writeup_page_id = ?9,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                ctf.id.to_string(),
                ctf.title.as_str(),
                ctf.description.as_str(),
                ctf.category.as_deref(),
                ctf.difficulty.as_str(),
                ctf.points,
                ctf.flag_format.as_deref(),
                ctf.platform.as_deref(),
                ctf.writeup_page_id.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(ctf.id));
        }
        Ok(())
    }

    fn get_ctf(&self, id: CtfId) -> RepoResult<Option<Ctf>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CTF_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_ctf_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_ctfs(&self, query: &CtfListQuery) -> RepoResult<Vec<Ctf>> {
        let mut sql = format!("{CTF_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(difficulty) = query.difficulty {
            sql.push_str(" AND difficulty = ?");
            bind_values.push(Value::Text(difficulty.as_str().to_string()));
        }
        if let Some(solved) = query.solved {
            sql.push_str(" AND solved = ?");
            bind_values.push(Value::Integer(bool_to_int(solved)));
        }
        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1 FROM ctf_tags ct
                    WHERE ct.ctf_id = ctfs.id AND ct.name = ?
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }
        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND category = ? COLLATE NOCASE");
            bind_values.push(Value::Text(category.trim().to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?");
        let limit = normalize_limit(query.limit, CTFS_DEFAULT_LIMIT, CTFS_LIMIT_MAX);
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ctfs = Vec::new();
        while let Some(row) = rows.next()? {
            ctfs.push(parse_ctf_row(self.conn, row)?);
        }
        Ok(ctfs)
    }

    fn set_ctf_tags(&self, id: CtfId, tags: &[String]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "ctfs", id)? {
            return Err(not_found(id));
        }
        replace_tags(&tx, "ctf_tags", "ctf_id", id, tags)?;
        tx.execute(
            "UPDATE ctfs SET updated_at = (strftime('%s', 'now') * 1000) WHERE id = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn set_solved(&self, id: CtfId, solved: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE ctfs
             SET solved = ?2,
                 solved_at = CASE
                    WHEN ?2 = 0 THEN NULL
                    WHEN solved_at IS NULL THEN (strftime('%s', 'now') * 1000)
                    ELSE solved_at
                 END,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(solved)],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn delete_ctf(&self, id: CtfId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM ctfs WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn page_exists(&self, id: PageId) -> RepoResult<bool> {
        row_exists(self.conn, "pages", id)
    }

    fn difficulty_totals(&self) -> RepoResult<Vec<DifficultyTotals>> {
        let mut totals: Vec<DifficultyTotals> = CtfDifficulty::ALL
            .iter()
            .map(|difficulty| DifficultyTotals {
                stats: DifficultyStats {
                    difficulty: *difficulty,
                    total: 0,
                    solved: 0,
                },
                points_available: 0,
                points_earned: 0,
            })
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT
                difficulty,
                COUNT(*),
                COALESCE(SUM(solved), 0),
                COALESCE(SUM(points), 0),
                COALESCE(SUM(CASE WHEN solved = 1 THEN points ELSE 0 END), 0)
             FROM ctfs
             GROUP BY difficulty;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let difficulty_text: String = row.get(0)?;
            let difficulty = CtfDifficulty::parse(&difficulty_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid difficulty `{difficulty_text}` in ctfs.difficulty"
                ))
            })?;
            if let Some(bucket) = totals
                .iter_mut()
                .find(|bucket| bucket.stats.difficulty == difficulty)
            {
                bucket.stats.total = row.get(1)?;
                bucket.stats.solved = row.get(2)?;
                bucket.points_available = row.get(3)?;
                bucket.points_earned = row.get(4)?;
            }
        }
        Ok(totals)
    }

    fn count_ctfs(&self) -> RepoResult<u32> {
        count_rows(self.conn, "ctfs")
    }
}

pub(crate) fn load_all_ctfs(conn: &Connection) -> RepoResult<Vec<Ctf>> {
    let mut stmt = conn.prepare(&format!("{CTF_SELECT_SQL} ORDER BY created_at ASC, id ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut ctfs = Vec::new();
    while let Some(row) = rows.next()? {
        ctfs.push(parse_ctf_row(conn, row)?);
    }
    Ok(ctfs)
}

pub(crate) fn restore_ctf_row(conn: &Connection, ctf: &Ctf) -> RepoResult<()> {
    ctf.validate()?;
    conn.execute(
        "INSERT INTO ctfs (
            id, title, description, category, difficulty, points, flag_format,
            platform, solved, solved_at, writeup_page_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            ctf.id.to_string(),
            ctf.title.as_str(),
            ctf.description.as_str(),
            ctf.category.as_deref(),
            ctf.difficulty.as_str(),
            ctf.points,
            ctf.flag_format.as_deref(),
            ctf.platform.as_deref(),
            bool_to_int(ctf.solved),
            ctf.solved_at,
            ctf.writeup_page_id.map(|id| id.to_string()),
            ctf.created_at,
            ctf.updated_at,
        ],
    )?;
    replace_tags(conn, "ctf_tags", "ctf_id", ctf.id, &ctf.tags)?;
    Ok(())
}

fn parse_ctf_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Ctf> {
    let id_text: String = row.get("id")?;
    let difficulty_text: String = row.get("difficulty")?;
    let difficulty = CtfDifficulty::parse(&difficulty_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid difficulty `{difficulty_text}` in ctfs.difficulty"
        ))
    })?;

    let ctf = Ctf {
        id: parse_uuid(&id_text, "ctfs.id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        difficulty,
        points: row.get("points")?,
        flag_format: row.get("flag_format")?,
        platform: row.get("platform")?,
        tags: load_tags(conn, "ctf_tags", "ctf_id", &id_text)?,
        solved: parse_bool(row.get("solved")?, "ctfs.solved")?,
        solved_at: row.get("solved_at")?,
        writeup_page_id: parse_optional_uuid(row.get("writeup_page_id")?, "ctfs.writeup_page_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    ctf
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("ctf {id_text}: {err}")))?;
    Ok(ctf)
}

fn not_found(id: CtfId) -> RepoError {
    RepoError::NotFound { entity: "ctf", id }
}
