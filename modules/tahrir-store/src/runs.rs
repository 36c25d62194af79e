use sqlx::PgPool;
use tahrir_common::{PipelineRun, TahrirError};

use crate::db_err;
use crate::row::pipeline_run_from_row;

/// Agent run records for the dashboard and run forensics.
#[derive(Clone)]
pub struct PipelineRunStore {
    pool: PgPool,
}

impl PipelineRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn start(&self, run_type: &str) -> Result<i64, TahrirError> {
        let row = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO pipeline_runs (run_type, status) VALUES ($1, 'running') RETURNING id",
        )
        .bind(run_type)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.0)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn finish(
        &self,
        id: i64,
        status: &str,
        total_items: i32,
        new_items: i32,
        duplicates: i32,
        errors: i32,
        details: serde_json::Value,
    ) -> Result<(), TahrirError> {
        sqlx::query(
            r#"
            UPDATE pipeline_runs
            SET status = $2, total_items = $3, new_items = $4, duplicates = $5,
                errors = $6, details = $7, finished_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(total_items)
        .bind(new_items)
        .bind(duplicates)
        .bind(errors)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<PipelineRun>, TahrirError> {
        let rows = sqlx::query("SELECT * FROM pipeline_runs ORDER BY started_at DESC LIMIT $1")
            .bind(limit.clamp(1, 200))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|r| pipeline_run_from_row(r).map_err(db_err))
            .collect()
    }
}
