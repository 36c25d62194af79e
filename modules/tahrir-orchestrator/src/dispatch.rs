//! Job handlers and the on-demand dispatch surface. Scheduled and
//! on-demand jobs are identical except for the actor identity and the
//! idempotency key.

use std::sync::Arc;

use async_trait::async_trait;
use tahrir_agents::{PublishedMonitor, Router, Scout, Scribe, TrendRadar};
use tahrir_common::{ActorIdentity, TahrirError};
use tahrir_queue::{
    EnqueueOptions, HandlerRegistry, JobHandler, JobPayload, JobRun, ProgressBus,
};
use uuid::Uuid;

use crate::context::CoreContext;

/// Enqueue an on-demand job with a caller-supplied trigger nonce. The
/// idempotency key `job_type:entity_id:trigger_nonce` collapses repeated
/// clicks on the same trigger.
pub async fn dispatch_on_demand(
    context: &CoreContext,
    payload: JobPayload,
    entity_id: &str,
    actor: ActorIdentity,
    trigger_nonce: &str,
) -> Result<Uuid, TahrirError> {
    let idempotency_key = format!("{}:{entity_id}:{trigger_nonce}", payload.job_type());
    context
        .broker
        .enqueue(
            payload,
            EnqueueOptions {
                entity_id: Some(entity_id.to_string()),
                actor,
                max_attempts: 5,
                idempotency_key: Some(idempotency_key),
                ..Default::default()
            },
        )
        .await
}

/// Wire every core job type to its agent.
pub fn register_handlers(context: &Arc<CoreContext>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(
        "pipeline_scout",
        Arc::new(ScoutBatchHandler {
            scout: Arc::clone(&context.scout),
            router: Arc::clone(&context.router),
        }),
    );
    registry.register(
        "pipeline_router",
        Arc::new(RouterBatchHandler {
            router: Arc::clone(&context.router),
        }),
    );
    registry.register(
        "pipeline_scribe",
        Arc::new(ScribeBatchHandler {
            scribe: Arc::clone(&context.scribe),
        }),
    );
    registry.register(
        "trends_scan",
        Arc::new(TrendsScanHandler {
            trend_radar: Arc::clone(&context.trend_radar),
            progress: context.progress.clone(),
        }),
    );
    registry.register(
        "published_monitor_scan",
        Arc::new(PublishedMonitorHandler {
            monitor: Arc::clone(&context.published_monitor),
            progress: context.progress.clone(),
        }),
    );
    registry.register(
        "editorial_rewrite",
        Arc::new(EditorialRewriteHandler {
            scribe: Arc::clone(&context.scribe),
        }),
    );
    registry
}

/// Combined ingestion tick: scout first, then a router pass over what it
/// brought in.
struct ScoutBatchHandler {
    scout: Arc<Scout>,
    router: Arc<Router>,
}

#[async_trait]
impl JobHandler for ScoutBatchHandler {
    async fn run(&self, _job: &JobRun) -> anyhow::Result<serde_json::Value> {
        let scout_stats = self.scout.run().await?;
        let router_stats = self.router.process_batch().await?;
        Ok(serde_json::json!({
            "scout": {
                "total": scout_stats.total,
                "new": scout_stats.new,
                "duplicates": scout_stats.duplicates,
                "errors": scout_stats.errors,
            },
            "router": {
                "processed": router_stats.processed,
                "candidates": router_stats.candidates,
                "ai_calls": router_stats.ai_calls,
                "breaking": router_stats.breaking,
            },
        }))
    }
}

struct RouterBatchHandler {
    router: Arc<Router>,
}

#[async_trait]
impl JobHandler for RouterBatchHandler {
    async fn run(&self, _job: &JobRun) -> anyhow::Result<serde_json::Value> {
        let stats = self.router.process_batch().await?;
        Ok(serde_json::json!({
            "processed": stats.processed,
            "candidates": stats.candidates,
            "ai_calls": stats.ai_calls,
            "breaking": stats.breaking,
            "archived": stats.archived,
        }))
    }
}

struct ScribeBatchHandler {
    scribe: Arc<Scribe>,
}

#[async_trait]
impl JobHandler for ScribeBatchHandler {
    async fn run(&self, _job: &JobRun) -> anyhow::Result<serde_json::Value> {
        let stats = self.scribe.batch_write().await?;
        Ok(serde_json::json!({
            "processed": stats.processed,
            "drafts_created": stats.drafts_created,
            "errors": stats.errors,
        }))
    }
}

struct TrendsScanHandler {
    trend_radar: Arc<TrendRadar>,
    progress: ProgressBus,
}

#[async_trait]
impl JobHandler for TrendsScanHandler {
    async fn run(&self, job: &JobRun) -> anyhow::Result<serde_json::Value> {
        let run_id = job.id.to_string();
        let _ = self
            .progress
            .emit(&run_id, "trend_radar", "started", serde_json::json!({}))
            .await;

        match self.trend_radar.scan().await {
            Ok(alerts) => {
                let payload = serde_json::json!({
                    "alerts_count": alerts.len(),
                    "alerts": alerts,
                });
                self.progress
                    .emit_completed(&run_id, "trend_radar", payload.clone())
                    .await;
                Ok(payload)
            }
            Err(e) => {
                self.progress
                    .emit_failed(&run_id, "trend_radar", &e.to_string())
                    .await;
                Err(e)
            }
        }
    }
}

struct PublishedMonitorHandler {
    monitor: Arc<PublishedMonitor>,
    progress: ProgressBus,
}

#[async_trait]
impl JobHandler for PublishedMonitorHandler {
    async fn run(&self, job: &JobRun) -> anyhow::Result<serde_json::Value> {
        let run_id = job.id.to_string();
        let envelope = job.envelope()?;
        let (feed_url, limit) = match envelope.payload {
            JobPayload::PublishedMonitorScan { feed_url, limit } => {
                (feed_url, limit.map(|l| l as usize))
            }
            _ => (None, None),
        };

        let _ = self
            .progress
            .emit(&run_id, "published_monitor", "started", serde_json::json!({}))
            .await;

        match self.monitor.scan(feed_url.as_deref(), limit).await {
            Ok(report) => {
                self.progress
                    .emit_completed(&run_id, "published_monitor", report.clone())
                    .await;
                Ok(serde_json::json!({ "report": report }))
            }
            Err(e) => {
                self.progress
                    .emit_failed(&run_id, "published_monitor", &e.to_string())
                    .await;
                Err(e)
            }
        }
    }
}

/// The "rewrite this article" surface: a new version inside an existing
/// work, or a fresh work for the article.
struct EditorialRewriteHandler {
    scribe: Arc<Scribe>,
}

#[async_trait]
impl JobHandler for EditorialRewriteHandler {
    async fn run(&self, job: &JobRun) -> anyhow::Result<serde_json::Value> {
        let envelope = job.envelope()?;
        let JobPayload::EditorialRewrite {
            article_id,
            work_id,
            ..
        } = envelope.payload
        else {
            anyhow::bail!("invalid_payload_for_editorial_rewrite");
        };

        let draft = match work_id {
            Some(work_id) => self.scribe.regenerate_by_work_id(&work_id).await?,
            None => {
                let article = self
                    .scribe
                    .article(article_id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("article {article_id} not found"))?;
                self.scribe.write_draft(&article, None, "rewrite").await?
            }
        };

        Ok(serde_json::json!({
            "draft_id": draft.id,
            "work_id": draft.work_id,
            "version": draft.version,
        }))
    }
}
