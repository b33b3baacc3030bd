//! Relational and key/value collaborators, both backed by DuckDB

use std::path::Path;

use anyhow::{Context, Result};
use duckdb::{Connection, OptionalExt, params};
use serde::{Deserialize, Serialize};

/// One flat row as stored under its identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub year: String,
    pub authors: String,
    pub title: String,
}

/// Holds the citation graph (`papers` and `refs` tables)
pub trait RelationalStore {
    /// Run a multi-statement SQL script.
    fn execute_script(&self, sql: &str) -> Result<()>;

    /// Identifiers of the records citing `id`, sorted; empty before any load.
    fn referencers_of(&self, id: &str) -> Result<Vec<String>>;
}

/// Stored records keyed by identifier
pub trait KeyValueStore {
    /// Insert or replace by identifier.
    fn put_record(&self, record: &StoredRecord) -> Result<()>;

    fn get_record(&self, id: &str) -> Result<Option<StoredRecord>>;
}

const RECORDS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS records (
  id VARCHAR PRIMARY KEY,
  year VARCHAR NOT NULL,
  authors VARCHAR NOT NULL,
  title VARCHAR NOT NULL
);";

/// DuckDB database serving as both relational and key/value store
pub struct DuckStore {
    conn: Connection,
}

impl std::fmt::Debug for DuckStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckStore").finish_non_exhaustive()
    }
}

impl DuckStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open DuckDB in-memory connection")?;
        Self::init(conn)
    }

    /// `path = None` opens an in-memory store
    pub fn open_or_memory(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(RECORDS_TABLE_SQL)
            .context("Failed to create records table")?;
        Ok(Self { conn })
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
                params![name],
                |row| row.get(0),
            )
            .context("Failed to inspect catalog")?;
        Ok(count > 0)
    }

    /// Row count of `table`, 0 when the table does not exist
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))
            .with_context(|| format!("Failed to count {table}"))?;
        Ok(count as u64)
    }
}

impl RelationalStore for DuckStore {
    fn execute_script(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn referencers_of(&self, id: &str) -> Result<Vec<String>> {
        if !self.table_exists("refs")? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare_cached("SELECT referencer FROM refs WHERE referencee = ? ORDER BY referencer")?;
        let ids = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read referencers of {id}"))?;
        Ok(ids)
    }
}

impl KeyValueStore for DuckStore {
    fn put_record(&self, record: &StoredRecord) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR REPLACE INTO records (id, year, authors, title) VALUES (?, ?, ?, ?)",
        )?;
        stmt.execute(params![record.id, record.year, record.authors, record.title])
            .with_context(|| format!("Failed to store record {}", record.id))?;
        Ok(())
    }

    fn get_record(&self, id: &str) -> Result<Option<StoredRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, year, authors, title FROM records WHERE id = ?")?;
        let record = stmt
            .query_row(params![id], |row| {
                Ok(StoredRecord {
                    id: row.get(0)?,
                    year: row.get(1)?,
                    authors: row.get(2)?,
                    title: row.get(3)?,
                })
            })
            .optional()
            .with_context(|| format!("Failed to look up {id}"))?;
        Ok(record)
    }
}
