//! SQLite-backed ledger, the durable control plane.
//!
//! The adapter creates its schema on connect and keeps a single pooled
//! connection: SQLite serializes writers anyway, and one connection avoids
//! lock contention between pool members.

use std::path::Path;

use async_trait::async_trait;
use chrono::DateTime;
use clamp_types::{ClampError, ClampResult, Commit, Deployment};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::traits::Ledger;

/// SQLite-backed ledger adapter.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (creating if missing) the database at `path` and initialize the
    /// schema. Parent directories are created on demand.
    pub async fn connect(path: impl AsRef<Path>) -> ClampResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ClampError::ledger_unavailable(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| ClampError::ledger_unavailable(format!("failed to open sqlite: {e}")))?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> ClampResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS commits (
                hash TEXT PRIMARY KEY,
                group_name TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                message TEXT NOT NULL,
                author TEXT
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_commits_group
                ON commits (group_name, timestamp_ms)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS deployments (
                group_name TEXT PRIMARY KEY,
                active_commit_hash TEXT NOT NULL REFERENCES commits (hash)
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| ClampError::ledger_unavailable(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

fn row_to_commit(row: &SqliteRow) -> ClampResult<Commit> {
    let timestamp_ms: i64 = column(row, "timestamp_ms")?;
    let timestamp = DateTime::from_timestamp_millis(timestamp_ms)
        .ok_or_else(|| ClampError::Serialization(format!("timestamp out of range: {timestamp_ms}")))?;
    Ok(Commit {
        hash: column(row, "hash")?,
        group: column(row, "group_name")?,
        timestamp,
        message: column(row, "message")?,
        author: column(row, "author")?,
    })
}

fn column<'r, T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>>(
    row: &'r SqliteRow,
    name: &str,
) -> ClampResult<T> {
    row.try_get(name)
        .map_err(|e| ClampError::ledger_unavailable(format!("bad row: {e}")))
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn save_commit(&self, commit: &Commit) -> ClampResult<()> {
        let result = sqlx::query(
            "INSERT INTO commits (hash, group_name, timestamp_ms, message, author) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&commit.hash)
        .bind(&commit.group)
        .bind(commit.timestamp.timestamp_millis())
        .bind(&commit.message)
        .bind(&commit.author)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ClampError::DuplicateCommit {
                    commit_hash: commit.hash.clone(),
                })
            }
            Err(e) => Err(ClampError::ledger_unavailable(format!("insert failed: {e}"))),
        }
    }

    async fn get_commit(&self, commit_hash: &str) -> ClampResult<Option<Commit>> {
        let row = sqlx::query(
            "SELECT hash, group_name, timestamp_ms, message, author FROM commits WHERE hash = ?",
        )
        .bind(commit_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ClampError::ledger_unavailable(format!("query failed: {e}")))?;

        row.as_ref().map(row_to_commit).transpose()
    }

    async fn get_history(&self, group: &str, limit: Option<usize>) -> ClampResult<Vec<Commit>> {
        // LIMIT -1 means unrestricted in SQLite.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query(
            "SELECT hash, group_name, timestamp_ms, message, author FROM commits \
             WHERE group_name = ? ORDER BY timestamp_ms DESC, rowid DESC LIMIT ?",
        )
        .bind(group)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClampError::ledger_unavailable(format!("query failed: {e}")))?;

        rows.iter().map(row_to_commit).collect()
    }

    async fn get_deployment(&self, group: &str) -> ClampResult<Option<Deployment>> {
        let row = sqlx::query(
            "SELECT group_name, active_commit_hash FROM deployments WHERE group_name = ?",
        )
        .bind(group)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ClampError::ledger_unavailable(format!("query failed: {e}")))?;

        row.map(|row| {
            Ok(Deployment {
                group: column(&row, "group_name")?,
                active_commit_hash: column(&row, "active_commit_hash")?,
            })
        })
        .transpose()
    }

    async fn set_deployment(&self, group: &str, commit_hash: &str) -> ClampResult<()> {
        // Referenced commit must exist; validated here rather than left to
        // the foreign key so the caller gets a typed error.
        if self.get_commit(commit_hash).await?.is_none() {
            return Err(ClampError::CommitNotFound {
                commit_hash: commit_hash.to_string(),
            });
        }

        sqlx::query(
            "INSERT INTO deployments (group_name, active_commit_hash) VALUES (?, ?) \
             ON CONFLICT (group_name) DO UPDATE SET active_commit_hash = excluded.active_commit_hash",
        )
        .bind(group)
        .bind(commit_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| ClampError::ledger_unavailable(format!("upsert failed: {e}")))?;
        Ok(())
    }

    async fn list_groups(&self) -> ClampResult<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT group_name FROM commits ORDER BY group_name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ClampError::ledger_unavailable(format!("query failed: {e}")))?;

        rows.iter().map(|row| column(row, "group_name")).collect()
    }

    async fn delete_group(&self, group: &str) -> ClampResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ClampError::ledger_unavailable(format!("begin failed: {e}")))?;

        // Deployment first: it references commits.
        sqlx::query("DELETE FROM deployments WHERE group_name = ?")
            .bind(group)
            .execute(&mut *tx)
            .await
            .map_err(|e| ClampError::ledger_unavailable(format!("delete failed: {e}")))?;
        sqlx::query("DELETE FROM commits WHERE group_name = ?")
            .bind(group)
            .execute(&mut *tx)
            .await
            .map_err(|e| ClampError::ledger_unavailable(format!("delete failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| ClampError::ledger_unavailable(format!("commit failed: {e}")))?;
        Ok(())
    }
}
