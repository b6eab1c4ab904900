//! SQLite-backed [`DocumentStore`] implementation.
//!
//! All collections share one `documents` table keyed by
//! `(collection, id)`; each row's `body` is the document's JSON object.
//! Batch upserts run inside a single transaction, so concurrent readers
//! observe either the previous state or the whole batch.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use campus_search_core::store::DocumentStore;
use campus_search_core::{Document, Error, Result};

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> anyhow::Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to count documents in {}", collection))?;
        Ok(n)
    }
}

/// JSON path addressing a top-level field, quoted so any key is valid.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

fn decode_body(id: String, body: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::upstream(format!("corrupt document {}: {}", id, e)))?;
    Ok(Document::from_value(id, value))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::upstream(format!("document read failed: {}", e)))?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                decode_body(id.to_string(), &body).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn batch_upsert(&self, collection: &str, docs: &[Document]) -> Result<()> {
        let write_err = |e: sqlx::Error| Error::store_write(format!("batch write failed: {}", e));
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        for doc in docs {
            let body = serde_json::Value::Object(doc.fields.clone()).to_string();
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, body, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection)
            .bind(&doc.id)
            .bind(&body)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    async fn find_after(
        &self,
        collection: &str,
        field: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let path = json_path(field);
        let rows = sqlx::query(
            r#"
            SELECT id, body FROM documents
            WHERE collection = ?
              AND json_type(body, ?) = 'text'
              AND json_extract(body, ?) > ?
            ORDER BY json_extract(body, ?) ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(collection)
        .bind(&path)
        .bind(&path)
        .bind(after)
        .bind(&path)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::upstream(format!("document query failed: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let body: String = row.get("body");
                decode_body(id, &body)
            })
            .collect()
    }
}
