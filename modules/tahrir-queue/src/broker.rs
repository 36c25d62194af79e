//! Enqueue surface: backpressure, burst coalescing, and the Postgres
//! NOTIFY nudge that wakes workers between polls.

use std::collections::HashMap;

use sqlx::PgPool;
use tahrir_common::{ActorIdentity, TahrirError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::JobStore;
use crate::types::{JobEnvelope, JobPayload, JobRun};

/// Per-queue depth limits with a default fallback.
#[derive(Debug, Clone)]
pub struct QueueLimits {
    pub enabled: bool,
    pub default_limit: i64,
    pub per_queue: HashMap<String, i64>,
}

impl QueueLimits {
    pub fn limit_for(&self, queue_name: &str) -> i64 {
        self.per_queue
            .get(queue_name)
            .copied()
            .unwrap_or(self.default_limit)
    }
}

impl Default for QueueLimits {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: 50,
            per_queue: HashMap::new(),
        }
    }
}

/// Options for one enqueue call.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub entity_id: Option<String>,
    pub actor: ActorIdentity,
    pub max_attempts: i32,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub correlation_id: Option<String>,
}

impl EnqueueOptions {
    pub fn system(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            actor: ActorIdentity::system(),
            max_attempts: 3,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct Broker {
    pool: PgPool,
    store: JobStore,
    limits: QueueLimits,
}

impl Broker {
    pub fn new(pool: PgPool, limits: QueueLimits) -> Self {
        Self {
            store: JobStore::new(pool.clone()),
            pool,
            limits,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// `(ok, depth, limit)` for a queue. With backpressure disabled the
    /// depth is not even measured.
    pub async fn check_backpressure(
        &self,
        queue_name: &str,
    ) -> Result<(bool, i64, i64), TahrirError> {
        if !self.limits.enabled {
            return Ok((true, 0, 0));
        }
        let depth = self.store.queue_depth(queue_name).await?;
        let limit = self.limits.limit_for(queue_name);
        Ok((depth < limit, depth, limit))
    }

    /// Durable enqueue. Fails with a retryable `QueueOverloaded` when the
    /// queue is at its depth limit; otherwise persists the job and nudges
    /// workers via NOTIFY.
    pub async fn enqueue(
        &self,
        payload: JobPayload,
        options: EnqueueOptions,
    ) -> Result<Uuid, TahrirError> {
        let queue_name = payload.queue_name();
        let job_type = payload.job_type();

        let (ok, depth, limit) = self.check_backpressure(queue_name).await?;
        if !ok {
            warn!(queue = queue_name, depth, limit, "Enqueue refused: queue overloaded");
            return Err(TahrirError::QueueOverloaded {
                queue: queue_name.to_string(),
                depth,
                limit,
            });
        }

        let envelope = JobEnvelope {
            payload,
            idempotency_key: options.idempotency_key,
        };
        let payload_json = serde_json::to_value(&envelope)
            .map_err(|e| TahrirError::Validation(format!("unserializable payload: {e}")))?;

        let job = self
            .store
            .create(
                &job_type,
                queue_name,
                payload_json,
                options.entity_id.as_deref(),
                options.request_id.as_deref(),
                options.correlation_id.as_deref(),
                options.actor.user_id,
                options.actor.username.as_deref(),
                if options.max_attempts > 0 {
                    options.max_attempts
                } else {
                    5
                },
            )
            .await?;

        self.notify(queue_name).await;
        info!(job_id = %job.id, job_type, queue = queue_name, "Job enqueued");
        Ok(job.id)
    }

    /// Coalescing enqueue: reuse an existing queued/running job for the
    /// same `(job_type, entity_id)` inside the window instead of creating
    /// a twin. Returns `(job_id, created)`.
    pub async fn enqueue_coalesced(
        &self,
        payload: JobPayload,
        options: EnqueueOptions,
        max_age_minutes: i64,
    ) -> Result<(Uuid, bool), TahrirError> {
        let job_type = payload.job_type();
        if let Some(active) = self
            .store
            .find_active(&job_type, options.entity_id.as_deref(), max_age_minutes)
            .await?
        {
            info!(job_id = %active.id, job_type, "Coalesced onto active job");
            return Ok((active.id, false));
        }
        let id = self.enqueue(payload, options).await?;
        Ok((id, true))
    }

    pub async fn find_active_job(
        &self,
        job_type: &str,
        entity_id: Option<&str>,
        max_age_minutes: i64,
    ) -> Result<Option<JobRun>, TahrirError> {
        self.store
            .find_active(job_type, entity_id, max_age_minutes)
            .await
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Option<JobRun>, TahrirError> {
        self.store.get(id).await
    }

    pub async fn queue_depths(&self, queue_names: &[&str]) -> HashMap<String, i64> {
        let mut depths = HashMap::new();
        for name in queue_names {
            match self.store.queue_depth(name).await {
                Ok(depth) => {
                    depths.insert(name.to_string(), depth);
                }
                Err(e) => {
                    warn!(queue = name, error = %e, "Queue depth probe failed");
                    depths.insert(name.to_string(), -1);
                }
            }
        }
        depths
    }

    /// Best-effort PG NOTIFY — a nudge, not a delivery guarantee. Workers
    /// poll regardless.
    async fn notify(&self, queue_name: &str) {
        let result = sqlx::query("SELECT pg_notify('tahrir_jobs', $1)")
            .bind(queue_name)
            .execute(&self.pool)
            .await;
        if let Err(e) = result {
            warn!(queue = queue_name, error = %e, "PG NOTIFY failed (non-fatal)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_fall_back_to_default() {
        let mut per_queue = HashMap::new();
        per_queue.insert("ai_router".to_string(), 20i64);
        let limits = QueueLimits {
            enabled: true,
            default_limit: 50,
            per_queue,
        };
        assert_eq!(limits.limit_for("ai_router"), 20);
        assert_eq!(limits.limit_for("ai_anything"), 50);
    }
}
