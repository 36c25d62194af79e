//! Trend Radar — cross-platform trend verification. A keyword only counts
//! as a trend when at least two independent signal sets agree, which
//! filters out manufactured virality.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ai_client::LlmClient;
use anyhow::Result;
use notify_client::Notifier;
use tahrir_cache::Cache;
use tahrir_common::{normalize_arabic, TrendAlert};
use tracing::{info, warn};

use crate::feeds::FeedFetcher;

/// Per-keyword LLM analysis cache window.
const TREND_ANALYSIS_TTL: Duration = Duration::from_secs(30 * 60);
/// Only the strongest trends get LLM context.
const LLM_TREND_LIMIT: usize = 5;
/// Competitor feeds contribute at most this many headlines each.
const COMPETITOR_ENTRY_LIMIT: usize = 10;
/// Burst threshold: a token must appear in this many recent titles.
const BURST_MIN_TITLES: usize = 3;
/// Recent-title window consulted for burst detection.
const BURST_TITLE_WINDOW: usize = 100;
/// Tokens shorter than this carry no trend signal.
const MIN_TOKEN_CHARS: usize = 4;

pub struct TrendRadar {
    fetcher: Arc<dyn FeedFetcher>,
    cache: Arc<dyn Cache>,
    llm: Arc<dyn LlmClient>,
    notifier: Arc<dyn Notifier>,
    google_trends_url: String,
    competitor_feeds: Vec<String>,
}

impl TrendRadar {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        cache: Arc<dyn Cache>,
        llm: Arc<dyn LlmClient>,
        notifier: Arc<dyn Notifier>,
        google_trends_url: String,
        competitor_feeds: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            llm,
            notifier,
            google_trends_url,
            competitor_feeds,
        }
    }

    /// Run a full trend scan cycle.
    pub async fn scan(&self) -> Result<Vec<TrendAlert>> {
        let google_trends = self.fetch_google_trends().await;
        let competitor_keywords = self.fetch_competitor_keywords().await;
        let rss_bursts = self.detect_rss_bursts().await;

        let verified = cross_validate(&google_trends, &competitor_keywords, &rss_bursts);
        if verified.is_empty() {
            info!("No verified trends");
            return Ok(Vec::new());
        }

        let mut alerts = Vec::new();
        for trend in verified.into_iter().take(LLM_TREND_LIMIT) {
            if let Some(alert) = self.analyze_trend(trend).await {
                alerts.push(alert);
            }
        }

        for alert in &alerts {
            self.notifier.send_trend_alert(alert).await;
        }

        info!(alerts = alerts.len(), "Trend scan complete");
        Ok(alerts)
    }

    async fn fetch_google_trends(&self) -> Vec<String> {
        match self.fetcher.fetch_feed(&self.google_trends_url).await {
            Ok(entries) => entries
                .into_iter()
                .map(|e| normalize_arabic(&e.title))
                .filter(|t| !t.is_empty())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Google trends fetch failed");
                Vec::new()
            }
        }
    }

    async fn fetch_competitor_keywords(&self) -> Vec<String> {
        let mut keywords = Vec::new();
        for url in &self.competitor_feeds {
            match self.fetcher.fetch_feed(url).await {
                Ok(entries) => {
                    for entry in entries.into_iter().take(COMPETITOR_ENTRY_LIMIT) {
                        let title = normalize_arabic(&entry.title);
                        keywords.extend(
                            title
                                .split_whitespace()
                                .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
                                .map(str::to_string),
                        );
                    }
                }
                Err(e) => {
                    warn!(url, error = %e, "Competitor feed fetch failed");
                }
            }
        }
        keywords
    }

    /// Burst detection over the cached recent-title window: tokens that
    /// suddenly appear across several titles.
    async fn detect_rss_bursts(&self) -> Vec<String> {
        let recent = self.cache.get_recent_titles(BURST_TITLE_WINDOW).await;
        burst_words(&recent)
    }

    /// LLM context for one verified trend, cached for 30 minutes so a
    /// rescan inside the window never re-invokes the model.
    async fn analyze_trend(&self, trend: VerifiedTrend) -> Option<TrendAlert> {
        let cache_key = format!("trend:{}", trend.keyword);
        if self.cache.get(&cache_key).await.is_some() {
            // Already analyzed this window.
            return None;
        }

        let base_alert = TrendAlert {
            keyword: trend.keyword.clone(),
            source_signals: trend.source_signals.clone(),
            strength: trend.strength,
            reason: None,
            suggested_angles: Vec::new(),
            archive_matches: Vec::new(),
        };

        let prompt = format!(
            "A keyword is trending for an Algerian newsroom.\n\
             Keyword: {}\nSignals: {}\n\n\
             Return strict JSON: {{\"reason\": \"Arabic explanation\", \
             \"relevant\": true, \"angles\": [\"...\", \"...\"], \
             \"archive_keywords\": [\"...\"]}}",
            trend.keyword,
            trend.source_signals.join(", ")
        );

        match self.llm.generate_json(&prompt).await {
            Ok(data) => {
                self.cache.increment_counter("ai_calls_today").await;
                if !data["relevant"].as_bool().unwrap_or(true) {
                    return None;
                }
                self.cache
                    .set(&cache_key, "analyzed", TREND_ANALYSIS_TTL)
                    .await;
                Some(TrendAlert {
                    reason: data["reason"].as_str().map(str::to_string),
                    suggested_angles: string_array(&data["angles"]),
                    archive_matches: string_array(&data["archive_keywords"]),
                    ..base_alert
                })
            }
            Err(e) => {
                warn!(keyword = %trend.keyword, error = %e, "Trend analysis failed");
                Some(base_alert)
            }
        }
    }
}

fn string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Tokens appearing in at least [`BURST_MIN_TITLES`] recent titles.
pub fn burst_words(recent_titles: &[String]) -> Vec<String> {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for title in recent_titles {
        let normalized = normalize_arabic(title);
        // Count each token once per title.
        let words: HashSet<&str> = normalized
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
            .collect();
        for word in words {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= BURST_MIN_TITLES)
        .map(|(word, _)| word)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTrend {
    pub keyword: String,
    pub source_signals: Vec<String>,
    pub strength: u8,
}

/// Semantic intersection: a trend is verified only when it appears in at
/// least two of the three signal sets. Strength = `min(sources·3 + 2, 10)`.
pub fn cross_validate(
    google_trends: &[String],
    competitor_keywords: &[String],
    rss_bursts: &[String],
) -> Vec<VerifiedTrend> {
    let competitor_set: HashSet<&str> = competitor_keywords.iter().map(String::as_str).collect();
    let burst_set: HashSet<&str> = rss_bursts.iter().map(String::as_str).collect();
    let google_set: HashSet<&str> = google_trends.iter().map(String::as_str).collect();

    let mut verified = Vec::new();

    for trend in google_set {
        let mut sources = vec!["google_trends".to_string()];
        let words: Vec<&str> = trend.split_whitespace().collect();
        if words.iter().any(|w| competitor_set.contains(w)) {
            sources.push("competitors".to_string());
        }
        if words.iter().any(|w| burst_set.contains(w)) {
            sources.push("rss_burst".to_string());
        }
        if sources.len() >= 2 {
            let strength = (sources.len() as u8 * 3 + 2).min(10);
            verified.push(VerifiedTrend {
                keyword: trend.to_string(),
                source_signals: sources,
                strength,
            });
        }
    }

    // Bursts echoed by competitors are trends even off Google's radar.
    for burst in &burst_set {
        if competitor_set.contains(*burst) && !verified.iter().any(|v| v.keyword == **burst) {
            verified.push(VerifiedTrend {
                keyword: burst.to_string(),
                source_signals: vec!["rss_burst".to_string(), "competitors".to_string()],
                strength: 6,
            });
        }
    }

    verified.sort_by(|a, b| b.strength.cmp(&a.strength).then(a.keyword.cmp(&b.keyword)));
    verified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_source_agreement_verifies_with_strength_eight() {
        let google = vec!["سوناطراك".to_string()];
        let competitors = vec!["سوناطراك".to_string(), "اخرى".to_string()];
        let bursts: Vec<String> = Vec::new();

        let verified = cross_validate(&google, &competitors, &bursts);
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].keyword, "سوناطراك");
        assert_eq!(verified[0].strength, 8);
        assert_eq!(
            verified[0].source_signals,
            vec!["google_trends".to_string(), "competitors".to_string()]
        );
    }

    #[test]
    fn google_only_trend_is_not_verified() {
        let google = vec!["منفرد".to_string()];
        let verified = cross_validate(&google, &[], &[]);
        assert!(verified.is_empty());
    }

    #[test]
    fn three_source_agreement_maxes_strength() {
        let google = vec!["المنتخب".to_string()];
        let competitors = vec!["المنتخب".to_string()];
        let bursts = vec!["المنتخب".to_string()];
        let verified = cross_validate(&google, &competitors, &bursts);
        assert_eq!(verified[0].strength, 10);
    }

    #[test]
    fn burst_plus_competitor_without_google_scores_six() {
        let competitors = vec!["البكالوريا".to_string()];
        let bursts = vec!["البكالوريا".to_string()];
        let verified = cross_validate(&[], &competitors, &bursts);
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].strength, 6);
    }

    #[test]
    fn burst_words_require_three_distinct_titles() {
        let titles = vec![
            "ارتفاع أسعار المحروقات اليوم".to_string(),
            "الحكومة تناقش أسعار المواد الأساسية".to_string(),
            "جدل حول أسعار النقل بين الولايات".to_string(),
            "خبر آخر لا علاقة له".to_string(),
        ];
        let bursts = burst_words(&titles);
        assert!(bursts.contains(&"اسعار".to_string()));
        assert!(!bursts.contains(&"الحكومة".to_string()));
    }

    #[test]
    fn repeated_word_in_one_title_does_not_burst() {
        let titles = vec!["تكرار تكرار تكرار تكرار".to_string()];
        assert!(burst_words(&titles).is_empty());
    }
}
