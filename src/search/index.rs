use crate::domain::Document;
use crate::error::DocQueryResult;
use crate::search::query::fts_query;
use crate::search::{SearchBackend, SearchOptions};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// SQLite FTS5 index living entirely in memory.
pub struct FtsIndex {
    pub(crate) pool: SqlitePool,
}

impl FtsIndex {
    pub async fn in_memory() -> DocQueryResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // NOTE: every connection to :memory: is its own database, so the pool
        // is pinned to exactly one connection that never expires.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE VIRTUAL TABLE IF NOT EXISTS documents USING fts5(
                path UNINDEXED,
                title,
                body
            )",
        )
        .execute(&pool)
        .await?;

        Ok(FtsIndex { pool })
    }

    pub async fn count(&self) -> DocQueryResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}

#[async_trait]
impl SearchBackend for FtsIndex {
    async fn index(&self, doc: &Document) -> DocQueryResult<()> {
        let path = doc.path().display().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM documents WHERE path = ?")
            .bind(&path)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO documents (path, title, body) VALUES (?, ?, ?)")
            .bind(&path)
            .bind(doc.title())
            .bind(doc.body())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, path: &Path) -> DocQueryResult<bool> {
        let res = sqlx::query("DELETE FROM documents WHERE path = ?")
            .bind(path.display().to_string())
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn query(&self, text: &str, options: &SearchOptions) -> DocQueryResult<Vec<PathBuf>> {
        let Some(expr) = fts_query(text) else {
            return Ok(Vec::new());
        };

        // SQLite treats a negative LIMIT as "no limit".
        let limit = options.limit.map(i64::from).unwrap_or(-1);
        let offset = options.offset.map(i64::from).unwrap_or(0);

        let rows = sqlx::query(
            r#"
            SELECT path
            FROM documents
            WHERE documents MATCH ?
            ORDER BY bm25(documents)
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(expr)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PathBuf::from(row.get::<String, _>(0)))
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
