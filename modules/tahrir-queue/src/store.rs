//! JobRun persistence: the queue's durable half. Status transitions are
//! guarded in SQL so a job can never leave a terminal status, whatever the
//! caller does.

use chrono::{Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tahrir_common::TahrirError;
use uuid::Uuid;

use crate::types::{DeadLetterJob, JobRun, JobStatus};

fn db_err(e: sqlx::Error) -> TahrirError {
    TahrirError::Database(e.to_string())
}

pub(crate) fn job_from_row(row: &PgRow) -> Result<JobRun, sqlx::Error> {
    let status_raw: String = row.try_get("status")?;
    let status = status_raw
        .parse::<JobStatus>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;
    Ok(JobRun {
        id: row.try_get("id")?,
        job_type: row.try_get("job_type")?,
        queue_name: row.try_get("queue_name")?,
        entity_id: row.try_get("entity_id")?,
        status,
        priority: row.try_get("priority")?,
        attempt: row.try_get("attempt")?,
        max_attempts: row.try_get("max_attempts")?,
        payload_json: row.try_get("payload_json")?,
        result_json: row.try_get("result_json")?,
        error: row.try_get("error")?,
        request_id: row.try_get("request_id")?,
        correlation_id: row.try_get("correlation_id")?,
        actor_user_id: row.try_get("actor_user_id")?,
        actor_username: row.try_get("actor_username")?,
        queued_at: row.try_get("queued_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

fn dlq_from_row(row: &PgRow) -> Result<DeadLetterJob, sqlx::Error> {
    Ok(DeadLetterJob {
        id: row.try_get("id")?,
        original_job_id: row.try_get("original_job_id")?,
        job_type: row.try_get("job_type")?,
        queue_name: row.try_get("queue_name")?,
        error: row.try_get("error")?,
        traceback: row.try_get("traceback")?,
        payload_json: row.try_get("payload_json")?,
        meta_json: row.try_get("meta_json")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Counters returned by the stale sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StaleSweep {
    pub running_failed: u64,
    pub queued_failed: u64,
}

#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        job_type: &str,
        queue_name: &str,
        payload_json: serde_json::Value,
        entity_id: Option<&str>,
        request_id: Option<&str>,
        correlation_id: Option<&str>,
        actor_user_id: Option<i64>,
        actor_username: Option<&str>,
        max_attempts: i32,
    ) -> Result<JobRun, TahrirError> {
        let row = sqlx::query(
            r#"
            INSERT INTO job_runs
                (id, job_type, queue_name, entity_id, status, payload_json,
                 request_id, correlation_id, actor_user_id, actor_username, max_attempts)
            VALUES ($1, $2, $3, $4, 'queued', $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_type)
        .bind(queue_name)
        .bind(entity_id)
        .bind(payload_json)
        .bind(request_id)
        .bind(correlation_id)
        .bind(actor_user_id)
        .bind(actor_username)
        .bind(max_attempts.max(1))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        job_from_row(&row).map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<JobRun>, TahrirError> {
        let row = sqlx::query("SELECT * FROM job_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| job_from_row(&r).map_err(db_err)).transpose()
    }

    /// Pending-message count for one queue.
    pub async fn queue_depth(&self, queue_name: &str) -> Result<i64, TahrirError> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT count(*) FROM job_runs WHERE queue_name = $1 AND status = 'queued'",
        )
        .bind(queue_name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.0)
    }

    /// Claim the oldest queued job on a queue. `SKIP LOCKED` makes
    /// concurrent workers take disjoint jobs; claiming increments the
    /// attempt counter and stamps `started_at`.
    pub async fn pop_next(&self, queue_name: &str) -> Result<Option<JobRun>, TahrirError> {
        let row = sqlx::query(
            r#"
            UPDATE job_runs
            SET status = 'running', attempt = attempt + 1, started_at = now()
            WHERE id = (
                SELECT id FROM job_runs
                WHERE queue_name = $1 AND status = 'queued'
                ORDER BY queued_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(queue_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| job_from_row(&r).map_err(db_err)).transpose()
    }

    pub async fn mark_completed(
        &self,
        id: Uuid,
        result: serde_json::Value,
    ) -> Result<(), TahrirError> {
        sqlx::query(
            r#"
            UPDATE job_runs
            SET status = 'completed', result_json = $2, finished_at = now()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Put a failed-but-retryable job back on its queue. `queued_at` is
    /// refreshed so the stale-queued sweep clocks the retry, not the
    /// original enqueue.
    pub async fn requeue(&self, id: Uuid, error: &str) -> Result<(), TahrirError> {
        sqlx::query(
            r#"
            UPDATE job_runs
            SET status = 'queued', error = left($2, 4000), started_at = NULL,
                queued_at = now()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Terminal failure: record the dead letter and flip the job in one
    /// transaction so invariant "every DLQ row has a dead_lettered job"
    /// holds.
    pub async fn dead_letter(
        &self,
        job: &JobRun,
        error: &str,
        traceback: Option<&str>,
    ) -> Result<(), TahrirError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            r#"
            INSERT INTO dead_letter_jobs
                (original_job_id, job_type, queue_name, error, traceback, payload_json, meta_json)
            VALUES ($1, $2, $3, left($4, 4000), left($5, 16000), $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.queue_name)
        .bind(error)
        .bind(traceback)
        .bind(&job.payload_json)
        .bind(serde_json::json!({
            "attempt": job.attempt,
            "max_attempts": job.max_attempts,
        }))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            UPDATE job_runs
            SET status = 'dead_lettered', error = left($2, 4000), finished_at = now()
            WHERE id = $1 AND status IN ('running', 'queued')
            "#,
        )
        .bind(job.id)
        .bind(error)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    /// Dead-letter entry for failures that never went through the broker
    /// (per-source scout errors). A terminal `JobRun` twin is written in
    /// the same transaction so every DLQ row still maps to a
    /// `dead_lettered` job.
    pub async fn record_failure_entry(
        &self,
        job_type: &str,
        queue_name: &str,
        payload: serde_json::Value,
        error: &str,
    ) -> Result<(), TahrirError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            r#"
            INSERT INTO job_runs
                (id, job_type, queue_name, status, payload_json, error, attempt,
                 max_attempts, started_at, finished_at)
            VALUES ($1, $2, $3, 'dead_lettered', $4, left($5, 4000), 1, 1, now(), now())
            "#,
        )
        .bind(id)
        .bind(job_type)
        .bind(queue_name)
        .bind(&payload)
        .bind(error)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO dead_letter_jobs
                (original_job_id, job_type, queue_name, error, payload_json)
            VALUES ($1, $2, $3, left($4, 4000), $5)
            "#,
        )
        .bind(id)
        .bind(job_type)
        .bind(queue_name)
        .bind(error)
        .bind(&payload)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    /// Existing queued/running job for `(job_type, entity_id)` inside the
    /// staleness window, newest first. Lets callers coalesce bursts.
    pub async fn find_active(
        &self,
        job_type: &str,
        entity_id: Option<&str>,
        max_age_minutes: i64,
    ) -> Result<Option<JobRun>, TahrirError> {
        let cutoff = Utc::now() - Duration::minutes(max_age_minutes.max(1));
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "SELECT * FROM job_runs WHERE status IN ('queued', 'running') AND job_type = ",
        );
        qb.push_bind(job_type);
        qb.push(" AND queued_at >= ").push_bind(cutoff);
        if let Some(entity) = entity_id {
            qb.push(" AND entity_id = ").push_bind(entity);
        }
        qb.push(" ORDER BY queued_at DESC LIMIT 1");

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| job_from_row(&r).map_err(db_err)).transpose()
    }

    pub async fn list(
        &self,
        status: Option<JobStatus>,
        job_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<JobRun>, TahrirError> {
        let mut qb =
            sqlx::QueryBuilder::<sqlx::Postgres>::new("SELECT * FROM job_runs WHERE 1=1");
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(job_type) = job_type {
            qb.push(" AND job_type = ").push_bind(job_type);
        }
        qb.push(" ORDER BY queued_at DESC LIMIT ")
            .push_bind(limit.clamp(1, 200));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(|r| job_from_row(r).map_err(db_err)).collect()
    }

    /// Fail out jobs stuck `running` or `queued` past their windows.
    pub async fn mark_stale_failed(
        &self,
        stale_running_minutes: i64,
        stale_queued_minutes: i64,
    ) -> Result<StaleSweep, TahrirError> {
        let now = Utc::now();
        let running_cutoff = now - Duration::minutes(stale_running_minutes.max(1));
        let queued_cutoff = now - Duration::minutes(stale_queued_minutes.max(1));

        let running = sqlx::query(
            r#"
            UPDATE job_runs
            SET status = 'failed',
                error = 'stale_timeout:running>' || $2 || 'm',
                finished_at = now()
            WHERE status = 'running' AND started_at IS NOT NULL AND started_at <= $1
            "#,
        )
        .bind(running_cutoff)
        .bind(stale_running_minutes.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let queued = sqlx::query(
            r#"
            UPDATE job_runs
            SET status = 'failed',
                error = 'stale_timeout:queued>' || $2 || 'm',
                finished_at = now()
            WHERE status = 'queued' AND started_at IS NULL AND queued_at <= $1
            "#,
        )
        .bind(queued_cutoff)
        .bind(stale_queued_minutes.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(StaleSweep {
            running_failed: running.rows_affected(),
            queued_failed: queued.rows_affected(),
        })
    }

    pub async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetterJob>, TahrirError> {
        let rows =
            sqlx::query("SELECT * FROM dead_letter_jobs ORDER BY created_at DESC LIMIT $1")
                .bind(limit.clamp(1, 200))
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.iter().map(|r| dlq_from_row(r).map_err(db_err)).collect()
    }
}
