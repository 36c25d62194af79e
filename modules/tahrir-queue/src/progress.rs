//! Per-run progress events for long-running orchestrated jobs.
//!
//! Events are appended to Postgres (catch-up reads) and fanned out on an
//! in-process broadcast topic (live tails). The SSE boundary subscribes,
//! filters by `run_id`, and streams until a terminal event.

use sqlx::PgPool;
use tahrir_common::TahrirError;
use tokio::sync::broadcast;
use tracing::warn;

use crate::types::RunEvent;

fn db_err(e: sqlx::Error) -> TahrirError {
    TahrirError::Database(e.to_string())
}

#[derive(Clone)]
pub struct ProgressBus {
    pool: PgPool,
    tx: broadcast::Sender<RunEvent>,
}

impl ProgressBus {
    pub fn new(pool: PgPool) -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { pool, tx }
    }

    /// Append and fan out one progress event. The append is durable; the
    /// broadcast is best-effort (slow receivers lag, they catch up from
    /// the table).
    pub async fn emit(
        &self,
        run_id: &str,
        node: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<RunEvent, TahrirError> {
        let row = sqlx::query_as::<_, (i64, chrono::DateTime<chrono::Utc>)>(
            r#"
            INSERT INTO run_events (run_id, node, event_type, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ts
            "#,
        )
        .bind(run_id)
        .bind(node)
        .bind(event_type)
        .bind(&payload)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let event = RunEvent {
            id: row.0,
            run_id: run_id.to_string(),
            node: node.to_string(),
            event_type: event_type.to_string(),
            payload,
            ts: row.1,
        };

        if self.tx.send(event.clone()).is_err() {
            // No live subscribers; the row is still there for catch-up.
        }
        Ok(event)
    }

    pub async fn emit_completed(&self, run_id: &str, node: &str, payload: serde_json::Value) {
        if let Err(e) = self.emit(run_id, node, "completed", payload).await {
            warn!(run_id, error = %e, "Terminal progress event write failed");
        }
    }

    pub async fn emit_failed(&self, run_id: &str, node: &str, error_text: &str) {
        let payload = serde_json::json!({ "error": error_text });
        if let Err(e) = self.emit(run_id, node, "failed", payload).await {
            warn!(run_id, error = %e, "Terminal progress event write failed");
        }
    }

    /// Live tail of all runs. Callers filter by `run_id`.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }

    /// Catch-up read: events for one run after `after_id`, in order.
    pub async fn read_run(
        &self,
        run_id: &str,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<RunEvent>, TahrirError> {
        let rows = sqlx::query_as::<
            _,
            (
                i64,
                String,
                String,
                String,
                serde_json::Value,
                chrono::DateTime<chrono::Utc>,
            ),
        >(
            r#"
            SELECT id, run_id, node, event_type, payload, ts
            FROM run_events
            WHERE run_id = $1 AND id > $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(run_id)
        .bind(after_id)
        .bind(limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, run_id, node, event_type, payload, ts)| RunEvent {
                id,
                run_id,
                node,
                event_type,
                payload,
                ts,
            })
            .collect())
    }
}
