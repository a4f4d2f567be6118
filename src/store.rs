//! Latest known summary per URL
//!
//! SQLite-backed; the table is created on open and never dropped, so
//! summaries survive restarts. Writes are last-write-wins per URL.

use crate::error::StoreError;
use crate::schema::PageSummary;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS webdata (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    meta_description TEXT NOT NULL,
    headings TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const UPSERT_SQL: &str = "
    INSERT INTO webdata (url, title, meta_description, headings, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(url) DO UPDATE SET
        title = excluded.title,
        meta_description = excluded.meta_description,
        headings = excluded.headings,
        updated_at = excluded.updated_at
";

/// Key-value upsert store for summaries
pub trait SummaryStore {
    /// Insert or replace the summary for `summary.url`
    fn upsert(&mut self, summary: &PageSummary) -> StoreResult<()>;

    /// Upsert all summaries in order as one batch; nothing is written on error
    fn upsert_all(&mut self, summaries: &[PageSummary]) -> StoreResult<()>;

    fn get(&self, url: &str) -> StoreResult<Option<PageSummary>>;

    /// Number of stored URLs
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }
}

impl SummaryStore for SqliteStore {
    fn upsert(&mut self, summary: &PageSummary) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            UPSERT_SQL,
            params![
                summary.url,
                summary.title,
                summary.meta_description,
                summary.headings,
                now
            ],
        )?;
        Ok(())
    }

    fn upsert_all(&mut self, summaries: &[PageSummary]) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for summary in summaries {
                stmt.execute(params![
                    summary.url,
                    summary.title,
                    summary.meta_description,
                    summary.headings,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, url: &str) -> StoreResult<Option<PageSummary>> {
        let summary = self
            .conn
            .query_row(
                "SELECT url, title, meta_description, headings FROM webdata WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageSummary {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        meta_description: row.get(2)?,
                        headings: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM webdata", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
