//! Scout — the ingestion agent. Fetches enabled sources (RSS or scrape),
//! normalizes and deduplicates entries, and stores raw articles in NEW.
//! Fetch & store only; classification belongs to the Router.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use tahrir_cache::{is_duplicate_title, Cache};
use tahrir_common::{
    generate_trace_id, sanitize_input, truncate_text, unique_hash, FetchMethod, Source,
};
use tahrir_queue::JobStore;
use tahrir_store::{ArticleStore, NewArticle, PipelineRunStore, SourceStore};
use tracing::{info, warn};

use crate::feeds::{FeedEntry, FeedFetcher};

/// Body text cap per article.
const MAX_CONTENT_CHARS: usize = 10_000;
/// Pause between source batches.
const BATCH_PAUSE: Duration = Duration::from_millis(500);
/// Fuzzy dedup compares against this many recent titles.
const FUZZY_WINDOW: usize = 50;

#[derive(Debug, Default, Clone, Copy)]
pub struct ScoutStats {
    pub total: u32,
    pub new: u32,
    pub duplicates: u32,
    pub errors: u32,
}

impl ScoutStats {
    fn merge(&mut self, other: ScoutStats) {
        self.total += other.total;
        self.new += other.new;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
    }
}

impl std::fmt::Display for ScoutStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Scout Run Complete ===")?;
        writeln!(f, "Entries seen:   {}", self.total)?;
        writeln!(f, "New articles:   {}", self.new)?;
        writeln!(f, "Duplicates:     {}", self.duplicates)?;
        writeln!(f, "Errors:         {}", self.errors)?;
        Ok(())
    }
}

pub struct Scout {
    sources: SourceStore,
    articles: ArticleStore,
    runs: PipelineRunStore,
    jobs: JobStore,
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn FeedFetcher>,
    batch_size: usize,
    concurrency: usize,
    max_new_per_run: u32,
    dedup_threshold: f64,
}

impl Scout {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: SourceStore,
        articles: ArticleStore,
        runs: PipelineRunStore,
        jobs: JobStore,
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn FeedFetcher>,
        batch_size: usize,
        concurrency: usize,
        max_new_per_run: u32,
        dedup_threshold: f64,
    ) -> Self {
        Self {
            sources,
            articles,
            runs,
            jobs,
            cache,
            fetcher,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
            max_new_per_run,
            dedup_threshold,
        }
    }

    /// Execute a full scout run across all enabled sources.
    pub async fn run(&self) -> Result<ScoutStats> {
        let run_id = self.runs.start("scout").await?;
        let mut stats = ScoutStats::default();

        let mut sources = self.sources.list_enabled().await?;
        if sources.is_empty() {
            warn!("No enabled sources");
            self.finish_run(run_id, "success", &stats).await;
            return Ok(stats);
        }
        info!(sources = sources.len(), "Scout run started");

        // Shuffle to avoid starvation when the run cap cuts the tail.
        sources.shuffle(&mut rand::thread_rng());

        let batch_count = sources.len().div_ceil(self.batch_size);
        for (batch_idx, batch) in sources.chunks(self.batch_size).enumerate() {
            let outcomes: Vec<ScoutStats> = stream::iter(batch.iter().cloned().map(|source| {
                let budget = self.max_new_per_run.saturating_sub(stats.new);
                async move { self.fetch_source(&source, budget).await }
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

            for outcome in outcomes {
                stats.merge(outcome);
            }

            // Global cap keeps the editorial feed smooth.
            if stats.new >= self.max_new_per_run {
                info!(max_new = self.max_new_per_run, "Scout run cap reached");
                break;
            }
            if batch_idx + 1 < batch_count {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        self.finish_run(run_id, "success", &stats).await;
        info!(
            total = stats.total,
            new = stats.new,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "Scout run complete"
        );
        Ok(stats)
    }

    /// Fetch one source on demand (dashboard trigger).
    pub async fn fetch_single_source(&self, source_id: i64) -> Result<ScoutStats> {
        let source = self
            .sources
            .get(source_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("source {source_id} not found"))?;
        Ok(self.fetch_source(&source, self.max_new_per_run).await)
    }

    /// Fetch and process a single source. Failures are isolated here:
    /// they bump the source's error count and leave a dead-letter entry,
    /// and the run continues with other sources.
    async fn fetch_source(&self, source: &Source, new_budget: u32) -> ScoutStats {
        let mut stats = ScoutStats::default();
        if new_budget == 0 {
            return stats;
        }

        let entries = match self.fetch_entries(source).await {
            Ok(entries) => entries,
            Err(e) => {
                stats.errors += 1;
                warn!(source = %source.name, error = %e, "Source fetch error");
                if let Err(store_err) = self.sources.record_fetch_error(source.id).await {
                    warn!(source = %source.name, error = %store_err, "Error-count update failed");
                }
                let payload = serde_json::json!({
                    "source_id": source.id,
                    "source_url": source.url,
                });
                if let Err(dlq_err) = self
                    .jobs
                    .record_failure_entry("scout_fetch", "ai_router", payload, &e.to_string())
                    .await
                {
                    warn!(error = %dlq_err, "Scout DLQ write failed");
                }
                return stats;
            }
        };

        let cap = source_limit(source, Utc::now()).min(new_budget as usize);
        for entry in entries.into_iter().take(cap) {
            stats.total += 1;
            if let Err(e) = self.process_entry(&entry, source, &mut stats).await {
                stats.errors += 1;
                warn!(source = %source.name, error = %e, "Entry process error");
            }
            if stats.new >= new_budget {
                break;
            }
        }

        if let Err(e) = self.sources.record_fetch_success(source.id).await {
            warn!(source = %source.name, error = %e, "Fetch-success update failed");
        }
        stats
    }

    async fn fetch_entries(&self, source: &Source) -> Result<Vec<FeedEntry>> {
        match source.method {
            FetchMethod::Rss => {
                let feed_url = source.rss_url.as_deref().unwrap_or(&source.url);
                self.fetcher.fetch_feed(feed_url).await
            }
            FetchMethod::Scrape => self.fetcher.scrape_homepage(&source.url).await,
        }
    }

    /// Normalize, dedup, store one entry.
    async fn process_entry(
        &self,
        entry: &FeedEntry,
        source: &Source,
        stats: &mut ScoutStats,
    ) -> Result<()> {
        let title = entry.title.trim();
        let link = entry.link.trim();
        if title.is_empty() || link.is_empty() {
            return Ok(());
        }

        // Hash-based exact dedup: cache fast path, database slow path.
        let hash = unique_hash(&source.name, link, title);
        if self.cache.is_url_processed(&hash).await {
            stats.duplicates += 1;
            return Ok(());
        }
        if self.articles.exists_by_hash(&hash).await? {
            stats.duplicates += 1;
            self.cache.mark_url_processed(&hash, None).await;
            return Ok(());
        }

        // Fuzzy title dedup against the recent window.
        let recent = self.cache.get_recent_titles(FUZZY_WINDOW).await;
        if is_duplicate_title(title, &recent, self.dedup_threshold) {
            stats.duplicates += 1;
            return Ok(());
        }

        let clean_title = sanitize_input(title);
        let content = truncate_text(&sanitize_input(&entry.summary), MAX_CONTENT_CHARS);
        let trace_id = generate_trace_id();

        let inserted = self
            .articles
            .insert_new(&NewArticle {
                source_id: Some(source.id),
                source_name: source.name.clone(),
                original_url: link.to_string(),
                original_title: clean_title.clone(),
                original_content: content,
                unique_hash: hash.clone(),
                trace_id: trace_id.clone(),
                published_at: entry.published_at,
            })
            .await?;

        match inserted {
            Some(article) => {
                self.cache.mark_url_processed(&hash, Some(article.id)).await;
                self.cache.add_recent_title(&clean_title).await;
                stats.new += 1;
                info!(
                    trace_id,
                    source = %source.name,
                    title = %truncate_text(&clean_title, 80),
                    "Article ingested"
                );
            }
            None => {
                // Insert race on unique_hash — another worker got there.
                stats.duplicates += 1;
                self.cache.mark_url_processed(&hash, None).await;
            }
        }
        Ok(())
    }

    async fn finish_run(&self, run_id: i64, status: &str, stats: &ScoutStats) {
        if let Err(e) = self
            .runs
            .finish(
                run_id,
                status,
                stats.total as i32,
                stats.new as i32,
                stats.duplicates as i32,
                stats.errors as i32,
                serde_json::json!({}),
            )
            .await
        {
            warn!(run_id, error = %e, "Pipeline run record update failed");
        }
    }
}

/// Per-source item cap: priority and credibility scale a base of ~6, a
/// freshness boost rewards sources not fetched recently, and the result
/// is clamped to [4, 18].
pub fn source_limit(source: &Source, now: DateTime<Utc>) -> usize {
    let priority = source.priority.clamp(1, 10);
    let base = 6.0 + (priority - 5) as f64 * 0.8;
    let mut cap = (base * source.credibility.weight() * source.source_type.weight()) as i64;

    match source.last_fetched_at {
        None => cap += 3,
        Some(last) => {
            let age_hours = (now - last).num_hours();
            if age_hours >= 24 {
                cap += 3;
            } else if age_hours >= 6 {
                cap += 2;
            }
        }
    }

    cap.clamp(4, 18) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use tahrir_common::{Credibility, SourceType};

    fn make_source(priority: i32, credibility: Credibility, hours_since_fetch: Option<i64>) -> Source {
        let now = Utc::now();
        Source {
            id: 1,
            name: "Test".to_string(),
            url: "https://example.dz".to_string(),
            rss_url: None,
            method: FetchMethod::Rss,
            priority,
            credibility,
            source_type: SourceType::Media,
            language: "ar".to_string(),
            enabled: true,
            error_count: 0,
            last_fetched_at: hours_since_fetch.map(|h| now - chrono::Duration::hours(h)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn limit_scales_with_priority() {
        let now = Utc::now();
        let low = source_limit(&make_source(1, Credibility::Medium, Some(1)), now);
        let high = source_limit(&make_source(10, Credibility::Medium, Some(1)), now);
        assert!(high > low);
    }

    #[test]
    fn limit_is_clamped() {
        let now = Utc::now();
        let floor = source_limit(&make_source(1, Credibility::Low, Some(1)), now);
        assert!(floor >= 4);
        let ceiling = source_limit(&make_source(10, Credibility::Official, None), now);
        assert!(ceiling <= 18);
    }

    #[test]
    fn never_fetched_gets_freshness_boost() {
        let now = Utc::now();
        let fresh = source_limit(&make_source(5, Credibility::Medium, Some(1)), now);
        let never = source_limit(&make_source(5, Credibility::Medium, None), now);
        assert_eq!(never, fresh + 3);
    }

    #[test]
    fn official_credibility_raises_cap() {
        let now = Utc::now();
        let medium = source_limit(&make_source(5, Credibility::Medium, Some(1)), now);
        let official = source_limit(&make_source(5, Credibility::Official, Some(1)), now);
        assert!(official > medium);
    }
}
