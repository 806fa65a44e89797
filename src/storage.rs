use rusqlite::{params, params_from_iter, Connection, Transaction};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::metrics::BuildMetrics;
use crate::schema::Entity;
use crate::types::TableRow;

/// Handle on the target SQLite store. Every stage takes it explicitly.
pub struct Store {
    conn: Connection,
}

/// Rows offered to one table and how many the store kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertCounts {
    pub inserted: u64,
    /// Rows whose key was already present
    pub skipped: u64,
}

/// A row reported by `PRAGMA foreign_key_check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: Option<i64>,
    pub parent: String,
}

impl std::fmt::Display for ForeignKeyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rowid {
            Some(rowid) => write!(f, "{} row {} -> {}", self.table, rowid, self.parent),
            None => write!(f, "{} -> {}", self.table, self.parent),
        }
    }
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    pub fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
        let value = if enabled { "ON" } else { "OFF" };
        self.conn.execute_batch(&format!("PRAGMA foreign_keys = {value};"))?;
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        table_exists(&self.conn, table)
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        row_count(&self.conn, table)
    }

    pub fn drop_table_if_exists(&self, table: &str) -> Result<bool> {
        if !self.table_exists(table)? {
            return Ok(false);
        }
        self.conn.execute_batch(&format!("DROP TABLE {table};"))?;
        debug!(table, "Dropped table");
        Ok(true)
    }

    pub fn foreign_key_violations(&self) -> Result<Vec<ForeignKeyViolation>> {
        foreign_key_violations(&self.conn)
    }
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn row_count(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 =
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn foreign_key_violations(conn: &Connection) -> Result<Vec<ForeignKeyViolation>> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let violations = stmt
        .query_map([], |row| {
            Ok(ForeignKeyViolation {
                table: row.get(0)?,
                rowid: row.get(1)?,
                parent: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if !violations.is_empty() {
        warn!(count = violations.len(), "Foreign key check found violations");
    }
    Ok(violations)
}

/// Insert-or-ignore `rows` into `entity`'s table
pub fn insert_rows<T: TableRow>(
    tx: &Transaction<'_>,
    entity: Entity,
    rows: &[T],
) -> Result<InsertCounts> {
    let mut stmt = tx.prepare_cached(&entity.definition().insert_or_ignore_sql())?;
    let mut counts = InsertCounts::default();
    for row in rows {
        let changed = stmt.execute(params_from_iter(row.values()))?;
        if changed > 0 {
            counts.inserted += 1;
        } else {
            counts.skipped += 1;
        }
    }
    BuildMetrics::record_insert(entity.table_name(), counts.inserted, counts.skipped);
    debug!(
        table = entity.table_name(),
        inserted = counts.inserted,
        skipped = counts.skipped,
        "Inserted rows"
    );
    Ok(counts)
}
