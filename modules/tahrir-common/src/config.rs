use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres (articles, drafts, jobs — the durable source of truth)
    pub database_url: String,

    // LLM provider
    pub llm_api_key: String,
    pub llm_api_url: String,
    pub llm_model_fast: String,
    pub llm_model_deep: String,

    // Notification webhooks (breaking channel + ops channel)
    pub breaking_webhook_url: String,
    pub ops_webhook_url: String,

    // Scout
    pub scout_batch_size: usize,
    pub scout_concurrency: usize,
    pub scout_max_new_per_run: u32,
    pub scout_max_article_age_hours: i64,
    pub rss_fetch_timeout_secs: u64,

    // Router
    pub router_batch_limit: usize,
    pub router_source_quota: usize,
    pub router_candidate_source_quota: usize,
    pub router_rule_min_hits: usize,
    pub router_skip_ai_for_non_local_aggregator: bool,

    // Editorial gates
    pub editorial_min_importance: i32,
    pub editorial_require_local_signal: bool,
    pub breaking_news_ttl_minutes: i64,

    // Dedup
    pub dedup_similarity_threshold: f64,

    // Trend radar
    pub trend_radar_interval_minutes: i64,
    pub google_trends_feed_url: String,
    pub competitor_feed_urls: Vec<String>,

    // Published-content monitor
    pub published_monitor_interval_minutes: i64,
    pub published_monitor_feed_url: String,
    pub published_monitor_limit: usize,
    pub published_monitor_llm_items_limit: usize,
    pub published_monitor_alert_threshold: i32,
    pub published_monitor_fetch_timeout_secs: u64,

    // Queue backpressure
    pub queue_backpressure_enabled: bool,
    pub queue_depth_limit_default: i64,
    pub queue_depth_limit_router: i64,
    pub queue_depth_limit_scribe: i64,
    pub queue_depth_limit_quality: i64,
    pub queue_depth_limit_trends: i64,

    // Orchestrator toggles
    pub auto_pipeline_enabled: bool,
    pub auto_scribe_enabled: bool,
    pub auto_trends_enabled: bool,
    pub published_monitor_enabled: bool,
}

impl Config {
    /// Load full configuration. Panics with a clear message if required
    /// vars are missing; everything else gets a production default.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            llm_api_key: required_env("LLM_API_KEY"),
            llm_api_url: env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            llm_model_fast: env::var("LLM_MODEL_FAST")
                .unwrap_or_else(|_| "claude-haiku-4-5".to_string()),
            llm_model_deep: env::var("LLM_MODEL_DEEP")
                .unwrap_or_else(|_| "claude-sonnet-4-5".to_string()),
            breaking_webhook_url: env::var("BREAKING_WEBHOOK_URL").unwrap_or_default(),
            ops_webhook_url: env::var("OPS_WEBHOOK_URL").unwrap_or_default(),

            scout_batch_size: env_parse("SCOUT_BATCH_SIZE", 10),
            scout_concurrency: env_parse("SCOUT_CONCURRENCY", 6),
            scout_max_new_per_run: env_parse("SCOUT_MAX_NEW_PER_RUN", 500),
            scout_max_article_age_hours: env_parse("SCOUT_MAX_ARTICLE_AGE_HOURS", 48),
            rss_fetch_timeout_secs: env_parse("RSS_FETCH_TIMEOUT", 20),

            router_batch_limit: env_parse("ROUTER_BATCH_LIMIT", 50),
            router_source_quota: env_parse("ROUTER_SOURCE_QUOTA", 6),
            router_candidate_source_quota: env_parse("ROUTER_CANDIDATE_SOURCE_QUOTA", 3),
            router_rule_min_hits: env_parse("ROUTER_RULE_MIN_HITS", 2),
            router_skip_ai_for_non_local_aggregator: env_bool(
                "ROUTER_SKIP_AI_FOR_NON_LOCAL_AGGREGATOR",
                true,
            ),

            editorial_min_importance: env_parse("EDITORIAL_MIN_IMPORTANCE", 6),
            editorial_require_local_signal: env_bool("EDITORIAL_REQUIRE_LOCAL_SIGNAL", true),
            breaking_news_ttl_minutes: env_parse("BREAKING_NEWS_TTL_MINUTES", 120),

            dedup_similarity_threshold: env_parse("DEDUP_SIMILARITY_THRESHOLD", 0.85),

            trend_radar_interval_minutes: env_parse("TREND_RADAR_INTERVAL_MINUTES", 45),
            google_trends_feed_url: env::var("GOOGLE_TRENDS_FEED_URL").unwrap_or_else(|_| {
                "https://trends.google.com/trends/trendingsearches/daily/rss?geo=DZ".to_string()
            }),
            competitor_feed_urls: env_list("COMPETITOR_FEED_URLS"),

            published_monitor_interval_minutes: env_parse("PUBLISHED_MONITOR_INTERVAL_MINUTES", 60),
            published_monitor_feed_url: env::var("PUBLISHED_MONITOR_FEED_URL").unwrap_or_default(),
            published_monitor_limit: env_parse("PUBLISHED_MONITOR_LIMIT", 15),
            published_monitor_llm_items_limit: env_parse("PUBLISHED_MONITOR_LLM_ITEMS_LIMIT", 5),
            published_monitor_alert_threshold: env_parse("PUBLISHED_MONITOR_ALERT_THRESHOLD", 70),
            published_monitor_fetch_timeout_secs: env_parse("PUBLISHED_MONITOR_FETCH_TIMEOUT", 12),

            queue_backpressure_enabled: env_bool("QUEUE_BACKPRESSURE_ENABLED", true),
            queue_depth_limit_default: env_parse("QUEUE_DEPTH_LIMIT_DEFAULT", 50),
            queue_depth_limit_router: env_parse("QUEUE_DEPTH_LIMIT_AI_ROUTER", 20),
            queue_depth_limit_scribe: env_parse("QUEUE_DEPTH_LIMIT_AI_SCRIBE", 20),
            queue_depth_limit_quality: env_parse("QUEUE_DEPTH_LIMIT_AI_QUALITY", 30),
            queue_depth_limit_trends: env_parse("QUEUE_DEPTH_LIMIT_AI_TRENDS", 10),

            auto_pipeline_enabled: env_bool("AUTO_PIPELINE_ENABLED", true),
            auto_scribe_enabled: env_bool("AUTO_SCRIBE_ENABLED", false),
            auto_trends_enabled: env_bool("AUTO_TRENDS_ENABLED", true),
            published_monitor_enabled: env_bool("PUBLISHED_MONITOR_ENABLED", false),
        }
    }

    /// Per-queue depth limit with the default fallback.
    pub fn queue_depth_limit(&self, queue_name: &str) -> i64 {
        match queue_name {
            "ai_router" => self.queue_depth_limit_router,
            "ai_scribe" => self.queue_depth_limit_scribe,
            "ai_quality" => self.queue_depth_limit_quality,
            "ai_trends" => self.queue_depth_limit_trends,
            _ => self.queue_depth_limit_default,
        }
    }

    /// Log the presence of sensitive variables without their values.
    pub fn log_redacted(&self) {
        let vars = [
            ("DATABASE_URL", &self.database_url),
            ("LLM_API_KEY", &self.llm_api_key),
            ("BREAKING_WEBHOOK_URL", &self.breaking_webhook_url),
            ("OPS_WEBHOOK_URL", &self.ops_webhook_url),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"),
        Err(_) => default,
    }
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
