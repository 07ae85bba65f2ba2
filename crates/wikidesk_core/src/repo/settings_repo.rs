//! Key/value settings persistence.
//!
//! Values are stored as JSON text so each key keeps its own type.

use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

/// Repository interface for admin settings rows.
pub trait SettingsRepository {
    /// Returns every stored `key -> JSON value` pair.
    fn get_all(&self) -> RepoResult<BTreeMap<String, String>>;
    /// Upserts all pairs in one transaction.
    fn put_many(&self, values: &BTreeMap<String, String>) -> RepoResult<()>;
    /// Removes every stored key.
    fn clear(&self) -> RepoResult<()>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["settings"])?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get_all(&self) -> RepoResult<BTreeMap<String, String>> {
        load_settings(self.conn)
    }

    fn put_many(&self, values: &BTreeMap<String, String>) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        write_settings(&tx, values)?;
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> RepoResult<()> {
        self.conn.execute("DELETE FROM settings;", [])?;
        Ok(())
    }
}

pub(crate) fn load_settings(conn: &Connection) -> RepoResult<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key ASC;")?;
    let mut rows = stmt.query([])?;
    let mut values = BTreeMap::new();
    while let Some(row) = rows.next()? {
        values.insert(row.get(0)?, row.get(1)?);
    }
    Ok(values)
}

/// Upserts settings rows. Callers own the transaction.
pub(crate) fn write_settings(
    conn: &Connection,
    values: &BTreeMap<String, String>,
) -> RepoResult<()> {
    for (key, value) in values {
        conn.execute(
            "INSERT INTO settings (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
    }
    Ok(())
}
