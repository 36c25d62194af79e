//! Worker pool: one logical worker per named queue, at-least-once
//! execution with bounded retries, per-idempotency-key mutexes, and
//! soft/hard time limits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::store::JobStore;
use crate::types::{JobRun, JobStatus};

/// Soft limit: the handler is expected to wrap up around here.
pub const DEFAULT_SOFT_LIMIT: Duration = Duration::from_secs(120);
/// Hard limit: the handler is cancelled here.
pub const DEFAULT_HARD_LIMIT: Duration = Duration::from_secs(180);
/// Poll cadence when the queue is empty.
const IDLE_POLL: Duration = Duration::from_millis(750);

/// One job type's execution body. Returns the `result_json` document.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, job: &JobRun) -> anyhow::Result<serde_json::Value>;
}

/// Maps job types to handlers for a set of queues.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(job_type.into(), handler);
    }

    fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }
}

/// Serializes executions that share `(task_name, idempotency_key)` so a
/// redelivered job observes "completed" exactly once.
#[derive(Default)]
struct IdempotencyLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdempotencyLocks {
    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct WorkerPool {
    store: JobStore,
    registry: Arc<HandlerRegistry>,
    locks: Arc<IdempotencyLocks>,
    soft_limit: Duration,
    hard_limit: Duration,
    shutdown: watch::Receiver<bool>,
}

impl WorkerPool {
    pub fn new(store: JobStore, registry: HandlerRegistry, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            locks: Arc::new(IdempotencyLocks::default()),
            soft_limit: DEFAULT_SOFT_LIMIT,
            hard_limit: DEFAULT_HARD_LIMIT,
            shutdown,
        }
    }

    /// Spawn one consumer loop per queue. Handles are awaited on shutdown.
    pub fn spawn_consumers(&self, queues: &[&str]) -> Vec<JoinHandle<()>> {
        queues
            .iter()
            .map(|queue| {
                let queue = queue.to_string();
                let store = self.store.clone();
                let registry = Arc::clone(&self.registry);
                let locks = Arc::clone(&self.locks);
                let soft = self.soft_limit;
                let hard = self.hard_limit;
                let mut shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    info!(queue, "Queue consumer started");
                    loop {
                        if *shutdown.borrow() {
                            break;
                        }
                        match store.pop_next(&queue).await {
                            Ok(Some(job)) => {
                                execute_job(&store, &registry, &locks, job, soft, hard).await;
                            }
                            Ok(None) => {
                                tokio::select! {
                                    _ = tokio::time::sleep(IDLE_POLL) => {}
                                    _ = shutdown.changed() => {}
                                }
                            }
                            Err(e) => {
                                error!(queue, error = %e, "Queue pop failed, backing off");
                                tokio::time::sleep(Duration::from_secs(2)).await;
                            }
                        }
                    }
                    info!(queue, "Queue consumer stopped");
                })
            })
            .collect()
    }
}

/// Exponential backoff with jitter for retry scheduling.
fn retry_backoff(attempt: i32) -> Duration {
    let base = 2u64.saturating_pow(attempt.clamp(1, 6) as u32);
    let jitter_ms = rand::thread_rng().gen_range(0..1000);
    Duration::from_secs(base.min(120)) + Duration::from_millis(jitter_ms)
}

async fn execute_job(
    store: &JobStore,
    registry: &HandlerRegistry,
    locks: &IdempotencyLocks,
    job: JobRun,
    soft_limit: Duration,
    hard_limit: Duration,
) {
    let Some(handler) = registry.get(&job.job_type) else {
        // Invalid payload / unknown type is irrecoverable.
        let msg = format!("unsupported_job_type:{}", job.job_type);
        error!(job_id = %job.id, job_type = %job.job_type, "No handler registered");
        if let Err(e) = store.dead_letter(&job, &msg, None).await {
            error!(job_id = %job.id, error = %e, "Dead-letter write failed");
        }
        return;
    };

    // Serialize same-key executions; re-read after acquiring so a
    // redelivered job sees the completed twin and returns its result.
    let idem_key = job
        .idempotency_key()
        .map(|k| format!("{}:{}", job.job_type, k));
    let _guard = match &idem_key {
        Some(key) => {
            let lock = locks.lock_for(key).await;
            Some(lock)
        }
        None => None,
    };
    let _held = match &_guard {
        Some(lock) => Some(lock.lock().await),
        None => None,
    };

    if let Ok(Some(fresh)) = store.get(job.id).await {
        if fresh.status == JobStatus::Completed {
            info!(job_id = %job.id, "Job already completed, skipping redelivery");
            return;
        }
    }

    info!(
        job_id = %job.id,
        job_type = %job.job_type,
        attempt = job.attempt,
        entity_id = job.entity_id.as_deref().unwrap_or(""),
        "Task execution started"
    );

    // Soft-limit watchdog: log loudly, let the hard limit do the killing.
    let soft_job_id = job.id;
    let soft_watch = tokio::spawn(async move {
        tokio::time::sleep(soft_limit).await;
        warn!(job_id = %soft_job_id, "Task exceeded soft time limit");
    });

    let outcome = tokio::time::timeout(hard_limit, handler.run(&job)).await;
    soft_watch.abort();

    match outcome {
        Ok(Ok(result)) => {
            if let Err(e) = store.mark_completed(job.id, result).await {
                error!(job_id = %job.id, error = %e, "Completion write failed");
            } else {
                info!(job_id = %job.id, job_type = %job.job_type, "Task execution completed");
            }
        }
        Ok(Err(err)) => {
            handle_failure(store, &job, &format!("{err:#}")).await;
        }
        Err(_) => {
            handle_failure(
                store,
                &job,
                &format!("hard_time_limit_exceeded:{}s", hard_limit.as_secs()),
            )
            .await;
        }
    }
}

async fn handle_failure(store: &JobStore, job: &JobRun, error_msg: &str) {
    if job.attempt >= job.max_attempts {
        error!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempt,
            error = error_msg,
            "Task failed terminally, dead-lettering"
        );
        if let Err(e) = store.dead_letter(job, error_msg, Some(error_msg)).await {
            error!(job_id = %job.id, error = %e, "Dead-letter write failed");
        }
        return;
    }

    warn!(
        job_id = %job.id,
        job_type = %job.job_type,
        attempt = job.attempt,
        max_attempts = job.max_attempts,
        error = error_msg,
        "Task failed, scheduling retry"
    );

    // The requeue is delayed off-worker so the queue keeps draining.
    let store = store.clone();
    let job_id = job.id;
    let attempt = job.attempt;
    let error_msg = error_msg.to_string();
    tokio::spawn(async move {
        tokio::time::sleep(retry_backoff(attempt)).await;
        if let Err(e) = store.requeue(job_id, &error_msg).await {
            error!(job_id = %job_id, error = %e, "Requeue failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempts_and_is_capped() {
        let first = retry_backoff(1);
        let sixth = retry_backoff(6);
        assert!(first >= Duration::from_secs(2));
        assert!(first < Duration::from_secs(4));
        assert!(sixth >= Duration::from_secs(64));
        assert!(sixth <= Duration::from_secs(121));
        // Far past the cap the delay stays bounded.
        assert!(retry_backoff(40) <= Duration::from_secs(121));
    }
}
