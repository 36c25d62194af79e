//! Durable job queue: persistent `JobRun` records, queue-depth
//! backpressure, attempt/retry/dead-letter lifecycle, idempotency, and
//! per-run progress events.
//!
//! The broker is Postgres-backed: `enqueue` writes a `queued` row and
//! nudges workers with `pg_notify`; consumers claim work with
//! `FOR UPDATE SKIP LOCKED`. No in-memory queues — everything durable
//! goes through the `job_runs` table.

pub mod broker;
pub mod progress;
pub mod reaper;
pub mod store;
pub mod types;
pub mod worker;

pub use broker::{Broker, EnqueueOptions, QueueLimits};
pub use progress::ProgressBus;
pub use reaper::spawn_reaper;
pub use store::{JobStore, StaleSweep};
pub use types::{DeadLetterJob, JobEnvelope, JobPayload, JobRun, JobStatus, RunEvent};
pub use worker::{HandlerRegistry, JobHandler, WorkerPool};

/// The named queues the core ships consumers for.
pub const CORE_QUEUES: [&str; 4] = ["ai_router", "ai_scribe", "ai_trends", "ai_quality"];
