use chrono::Utc;
use sqlx::PgPool;
use tahrir_common::{Source, TahrirError};

use crate::db_err;
use crate::row::source_from_row;

#[derive(Clone)]
pub struct SourceStore {
    pool: PgPool,
}

impl SourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Source>, TahrirError> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| source_from_row(&r).map_err(db_err)).transpose()
    }

    pub async fn list_enabled(&self) -> Result<Vec<Source>, TahrirError> {
        let rows = sqlx::query("SELECT * FROM sources WHERE enabled = TRUE ORDER BY priority DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|r| source_from_row(r).map_err(db_err))
            .collect()
    }

    pub async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Source>, TahrirError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM sources WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|r| source_from_row(r).map_err(db_err))
            .collect()
    }

    /// A successful fetch clears the consecutive error count.
    pub async fn record_fetch_success(&self, id: i64) -> Result<(), TahrirError> {
        sqlx::query(
            "UPDATE sources SET last_fetched_at = $2, error_count = 0, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn record_fetch_error(&self, id: i64) -> Result<(), TahrirError> {
        sqlx::query(
            "UPDATE sources SET error_count = error_count + 1, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
