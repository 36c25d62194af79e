//! Periodic tick loops. Each tick enqueues through the durable broker —
//! never calls an agent directly — and skips the cycle on backpressure or
//! when an active twin job already exists.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tahrir_common::TahrirError;
use tahrir_queue::{EnqueueOptions, JobPayload};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::context::CoreContext;

const PIPELINE_INTERVAL: Duration = Duration::from_secs(20 * 60);

pub fn spawn_tick_loops(
    context: Arc<CoreContext>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    if context.config.auto_pipeline_enabled {
        let ctx = Arc::clone(&context);
        tasks.push(spawn_periodic_loop(
            "pipeline",
            PIPELINE_INTERVAL,
            shutdown.clone(),
            move || {
                let ctx = Arc::clone(&ctx);
                async move { pipeline_tick(&ctx).await }
            },
        ));
        info!(
            interval_minutes = 20,
            auto_scribe = context.config.auto_scribe_enabled,
            "Auto pipeline enabled"
        );
    }

    if context.config.auto_trends_enabled {
        let interval_minutes = context.config.trend_radar_interval_minutes.max(5);
        let ctx = Arc::clone(&context);
        tasks.push(spawn_periodic_loop(
            "trends",
            Duration::from_secs(interval_minutes as u64 * 60),
            shutdown.clone(),
            move || {
                let ctx = Arc::clone(&ctx);
                async move { trends_tick(&ctx).await }
            },
        ));
        info!(interval_minutes, "Auto trends enabled");
    }

    if context.config.published_monitor_enabled {
        let interval_minutes = context.config.published_monitor_interval_minutes.max(5);
        let ctx = Arc::clone(&context);
        tasks.push(spawn_periodic_loop(
            "published_monitor",
            Duration::from_secs(interval_minutes as u64 * 60),
            shutdown,
            move || {
                let ctx = Arc::clone(&ctx);
                async move { published_monitor_tick(&ctx).await }
            },
        ));
        info!(interval_minutes, "Published monitor enabled");
    }

    tasks
}

/// Run `job` immediately and then on every interval boundary until
/// shutdown, discounting the job's own runtime from the sleep.
fn spawn_periodic_loop<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        info!(loop_name = name, interval_secs = interval.as_secs(), "Periodic loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let started = Instant::now();
            if let Err(e) = job().await {
                error!(loop_name = name, error = %e, "Periodic loop error");
            }

            let elapsed = started.elapsed();
            let sleep_for = interval.saturating_sub(elapsed).max(Duration::from_secs(1));
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!(loop_name = name, "Periodic loop stopped");
    })
}

/// Combined scout + router tick, optionally followed by a scribe pass.
async fn pipeline_tick(context: &CoreContext) -> anyhow::Result<()> {
    let scout_job = enqueue_tick_job(
        context,
        JobPayload::PipelineScout {
            trigger: "auto_pipeline".to_string(),
        },
        "auto_pipeline",
        40,
    )
    .await?;

    let mut scribe_job = None;
    if context.config.auto_scribe_enabled {
        scribe_job = enqueue_tick_job(
            context,
            JobPayload::PipelineScribe {
                trigger: "auto_pipeline".to_string(),
            },
            "auto_pipeline",
            40,
        )
        .await?;
    }

    info!(
        scout_job = scout_job.map(|id| id.to_string()).unwrap_or_default(),
        scribe_job = scribe_job.map(|id| id.to_string()).unwrap_or_default(),
        "Pipeline tick done"
    );
    Ok(())
}

async fn trends_tick(context: &CoreContext) -> anyhow::Result<()> {
    let staleness = (context.config.trend_radar_interval_minutes * 2).max(5);
    let job = enqueue_tick_job(
        context,
        JobPayload::TrendsScan {
            geo: "DZ".to_string(),
            category: "all".to_string(),
            limit: 10,
            mode: "fast".to_string(),
        },
        "auto_trends",
        staleness,
    )
    .await?;
    if let Some(id) = job {
        info!(job_id = %id, "Trends tick done");
    }
    Ok(())
}

async fn published_monitor_tick(context: &CoreContext) -> anyhow::Result<()> {
    let staleness = (context.config.published_monitor_interval_minutes * 2).max(5);
    let job = enqueue_tick_job(
        context,
        JobPayload::PublishedMonitorScan {
            feed_url: None,
            limit: None,
        },
        "auto_published_monitor",
        staleness,
    )
    .await?;
    if let Some(id) = job {
        info!(job_id = %id, "Published monitor tick done");
    }
    Ok(())
}

/// Common tick discipline: skip when an active twin exists, skip on
/// backpressure, otherwise enqueue. Returns the job id when one was
/// created or reused.
async fn enqueue_tick_job(
    context: &CoreContext,
    payload: JobPayload,
    entity_id: &str,
    staleness_minutes: i64,
) -> anyhow::Result<Option<uuid::Uuid>> {
    let job_type = payload.job_type();
    if let Some(active) = context
        .broker
        .find_active_job(&job_type, Some(entity_id), staleness_minutes)
        .await?
    {
        info!(job_type, job_id = %active.id, "Tick skipped: active job exists");
        return Ok(None);
    }

    match context
        .broker
        .enqueue(payload, EnqueueOptions::system(entity_id))
        .await
    {
        Ok(id) => Ok(Some(id)),
        Err(TahrirError::QueueOverloaded { queue, depth, limit }) => {
            warn!(job_type, queue, depth, limit, "Tick skipped: backpressure");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
