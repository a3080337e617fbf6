use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

/// Last episode opened for one work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEntry {
    pub work_slug: String,
    pub work_title: String,
    pub episode_slug: String,
    pub episode_title: String,
    pub episode_number: i64,
    pub read_at: i64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reading_history (
                work_slug TEXT PRIMARY KEY,
                work_title TEXT NOT NULL,
                episode_slug TEXT NOT NULL,
                episode_title TEXT NOT NULL,
                episode_number INTEGER NOT NULL,
                read_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reading_history_read_at ON reading_history(read_at DESC);
            "#,
        )?;
        Ok(())
    }

    pub fn record_read(
        &self,
        work_slug: &str,
        work_title: &str,
        episode_slug: &str,
        episode_title: &str,
        episode_number: i64,
    ) -> Result<()> {
        self.record_read_at(
            work_slug,
            work_title,
            episode_slug,
            episode_title,
            episode_number,
            Utc::now().timestamp(),
        )
    }

    fn record_read_at(
        &self,
        work_slug: &str,
        work_title: &str,
        episode_slug: &str,
        episode_title: &str,
        episode_number: i64,
        read_at: i64,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO reading_history
                (work_slug, work_title, episode_slug, episode_title, episode_number, read_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(work_slug) DO UPDATE SET
                work_title = excluded.work_title,
                episode_slug = excluded.episode_slug,
                episode_title = excluded.episode_title,
                episode_number = excluded.episode_number,
                read_at = excluded.read_at
            "#,
            params![
                work_slug,
                work_title,
                episode_slug,
                episode_title,
                episode_number,
                read_at
            ],
        )?;
        Ok(())
    }

    pub fn last_read(&self, work_slug: &str) -> Result<Option<ReadEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT work_slug, work_title, episode_slug, episode_title, episode_number, read_at \
                 FROM reading_history WHERE work_slug = ?1",
                params![work_slug],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list_history(&self) -> Result<Vec<ReadEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT work_slug, work_title, episode_slug, episode_title, episode_number, read_at \
             FROM reading_history ORDER BY read_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([], row_to_entry)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadEntry> {
    Ok(ReadEntry {
        work_slug: row.get(0)?,
        work_title: row.get(1)?,
        episode_slug: row.get(2)?,
        episode_title: row.get(3)?,
        episode_number: row.get(4)?,
        read_at: row.get(5)?,
    })
}
