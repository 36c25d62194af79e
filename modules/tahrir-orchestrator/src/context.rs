//! `CoreContext` — the process-wide composition root. Constructed once at
//! startup and passed explicitly; there are no module-level singletons.
//! Lifecycle: `start()` connects cache, broker, and database and launches
//! the loops; `stop()` cancels and awaits them.

use std::collections::HashMap;
use std::sync::Arc;

use ai_client::{ClaudeClient, LlmClient};
use anyhow::Result;
use notify_client::{Notifier, WebhookNotifier};
use sqlx::PgPool;
use tahrir_agents::{
    HttpFetcher, PublishedMonitor, Router, RouterConfig, Scout, Scribe, TrendRadar,
};
use tahrir_cache::{Cache, MemoryCache};
use tahrir_common::Config;
use tahrir_editorial::{EditorialWorkspace, QualityGates, SmartEditor};
use tahrir_queue::{
    spawn_reaper, Broker, ProgressBus, QueueLimits, WorkerPool, CORE_QUEUES,
};
use tahrir_store::{
    ArticleStore, DecisionStore, DraftStore, KnowledgeStore, PipelineRunStore,
    QualityReportStore, SourceStore,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dispatch::register_handlers;
use crate::ticks;

pub struct CoreContext {
    pub config: Config,
    pub pool: PgPool,
    pub cache: Arc<dyn Cache>,
    pub llm: Arc<dyn LlmClient>,
    pub notifier: Arc<dyn Notifier>,
    pub broker: Broker,
    pub progress: ProgressBus,

    pub articles: ArticleStore,
    pub sources: SourceStore,
    pub drafts: DraftStore,
    pub decisions: DecisionStore,
    pub quality: QualityReportStore,
    pub runs: PipelineRunStore,
    pub knowledge: KnowledgeStore,

    pub scout: Arc<Scout>,
    pub router: Arc<Router>,
    pub scribe: Arc<Scribe>,
    pub trend_radar: Arc<TrendRadar>,
    pub published_monitor: Arc<PublishedMonitor>,

    /// Typed surface for editor decisions and the draft lifecycle.
    pub workspace: EditorialWorkspace,
    pub gates: QualityGates,
    pub smart_editor: SmartEditor,

    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CoreContext {
    /// Wire the whole core and launch workers, reaper, and tick loops.
    pub async fn start(config: Config) -> Result<Arc<Self>> {
        config.log_redacted();
        let pool = tahrir_store::connect(&config.database_url).await?;
        info!("Database connected");

        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let llm: Arc<dyn LlmClient> = Arc::new(ClaudeClient::new(
            config.llm_api_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model_fast.clone(),
            config.llm_model_deep.clone(),
        ));
        let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(
            config.breaking_webhook_url.clone(),
            config.ops_webhook_url.clone(),
        ));
        let fetcher = Arc::new(HttpFetcher::new(config.rss_fetch_timeout_secs));

        let articles = ArticleStore::new(pool.clone());
        let sources = SourceStore::new(pool.clone());
        let drafts = DraftStore::new(pool.clone());
        let decisions = DecisionStore::new(pool.clone());
        let quality = QualityReportStore::new(pool.clone());
        let runs = PipelineRunStore::new(pool.clone());
        let knowledge = KnowledgeStore::new(pool.clone());

        let mut per_queue = HashMap::new();
        per_queue.insert("ai_router".to_string(), config.queue_depth_limit_router);
        per_queue.insert("ai_scribe".to_string(), config.queue_depth_limit_scribe);
        per_queue.insert("ai_quality".to_string(), config.queue_depth_limit_quality);
        per_queue.insert("ai_trends".to_string(), config.queue_depth_limit_trends);
        let broker = Broker::new(
            pool.clone(),
            QueueLimits {
                enabled: config.queue_backpressure_enabled,
                default_limit: config.queue_depth_limit_default,
                per_queue,
            },
        );
        let progress = ProgressBus::new(pool.clone());

        let scout = Arc::new(Scout::new(
            sources.clone(),
            articles.clone(),
            runs.clone(),
            broker.store().clone(),
            Arc::clone(&cache),
            fetcher.clone(),
            config.scout_batch_size,
            config.scout_concurrency,
            config.scout_max_new_per_run,
            config.dedup_similarity_threshold,
        ));
        let router = Arc::new(Router::new(
            articles.clone(),
            sources.clone(),
            knowledge.clone(),
            Arc::clone(&cache),
            Arc::clone(&llm),
            Arc::clone(&notifier),
            RouterConfig {
                batch_limit: config.router_batch_limit,
                source_quota: config.router_source_quota,
                candidate_source_quota: config.router_candidate_source_quota,
                rule_min_hits: config.router_rule_min_hits,
                skip_ai_for_non_local_aggregator: config.router_skip_ai_for_non_local_aggregator,
                editorial_min_importance: config.editorial_min_importance,
                editorial_require_local_signal: config.editorial_require_local_signal,
                breaking_news_ttl_minutes: config.breaking_news_ttl_minutes,
            },
        ));
        let scribe = Arc::new(Scribe::new(
            articles.clone(),
            drafts.clone(),
            Arc::clone(&llm),
            Arc::clone(&cache),
            config.router_batch_limit as i64,
        ));
        let trend_radar = Arc::new(TrendRadar::new(
            fetcher.clone(),
            Arc::clone(&cache),
            Arc::clone(&llm),
            Arc::clone(&notifier),
            config.google_trends_feed_url.clone(),
            config.competitor_feed_urls.clone(),
        ));
        let published_monitor = Arc::new(PublishedMonitor::new(
            fetcher,
            Arc::clone(&cache),
            Arc::clone(&llm),
            Arc::clone(&notifier),
            config.published_monitor_feed_url.clone(),
            config.published_monitor_limit,
            config.published_monitor_llm_items_limit,
            config.published_monitor_alert_threshold,
            config.published_monitor_interval_minutes,
        ));

        let workspace =
            EditorialWorkspace::new(articles.clone(), drafts.clone(), decisions.clone());
        let gates = QualityGates::new(quality.clone());
        let smart_editor = SmartEditor::new(Arc::clone(&llm));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let context = Arc::new(Self {
            config,
            pool,
            cache,
            llm,
            notifier,
            broker,
            progress,
            articles,
            sources,
            drafts,
            decisions,
            quality,
            runs,
            knowledge,
            scout,
            router,
            scribe,
            trend_radar,
            published_monitor,
            workspace,
            gates,
            smart_editor,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        });

        let mut tasks = Vec::new();

        // Workers: one logical consumer per core queue.
        let registry = register_handlers(&context);
        let pool_workers = WorkerPool::new(
            context.broker.store().clone(),
            registry,
            shutdown_rx.clone(),
        );
        tasks.extend(pool_workers.spawn_consumers(&CORE_QUEUES));

        // Maintenance: stale-job reaper.
        tasks.push(spawn_reaper(
            context.broker.store().clone(),
            shutdown_rx.clone(),
        ));

        // Periodic ticks.
        tasks.extend(ticks::spawn_tick_loops(Arc::clone(&context), shutdown_rx));

        *context.tasks.lock().await = tasks;
        info!("Core context started");
        Ok(context)
    }

    /// Signal shutdown and await every loop. Task panics are logged, not
    /// propagated.
    pub async fn stop(&self) {
        info!("Core context stopping");
        let _ = self.shutdown_tx.send(true);
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Loop ended with error during shutdown");
            }
        }
        self.pool.close().await;
        info!("Core context stopped");
    }
}
