//! Trend radar end-to-end over stubbed capabilities: cross-validation,
//! alert strength, and the 30-minute analysis cache that keeps a rescan
//! from re-invoking the LLM.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ai_client::{AnalysisResult, LlmClient};
use async_trait::async_trait;
use notify_client::NoopNotifier;
use tahrir_agents::{FeedEntry, FeedFetcher, TrendRadar};
use tahrir_cache::MemoryCache;
use tahrir_common::error::ClassificationError;

struct StubFetcher {
    feeds: HashMap<String, Vec<FeedEntry>>,
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch_feed(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>> {
        Ok(self.feeds.get(url).cloned().unwrap_or_default())
    }

    async fn scrape_homepage(&self, _url: &str) -> anyhow::Result<Vec<FeedEntry>> {
        Ok(Vec::new())
    }

    async fn fetch_article_text(&self, _url: &str) -> String {
        String::new()
    }
}

#[derive(Default)]
struct CountingLlm {
    json_calls: AtomicU32,
}

#[async_trait]
impl LlmClient for CountingLlm {
    async fn analyze_news(
        &self,
        _text: &str,
        _source: &str,
    ) -> Result<AnalysisResult, ClassificationError> {
        Err(ClassificationError::Transport("not under test".to_string()))
    }

    async fn generate_text(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }

    async fn generate_json(&self, _prompt: &str) -> anyhow::Result<serde_json::Value> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({
            "reason": "صفقة طاقة جديدة",
            "relevant": true,
            "angles": ["الزاوية الأولى", "الزاوية الثانية"],
            "archive_keywords": ["سوناطراك"],
        }))
    }
}

fn entry(title: &str) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: format!("https://feeds.example.dz/{}", title.len()),
        ..Default::default()
    }
}

fn radar_with(llm: Arc<CountingLlm>) -> TrendRadar {
    let mut feeds = HashMap::new();
    feeds.insert(
        "https://trends.example/rss".to_string(),
        vec![entry("سوناطراك")],
    );
    feeds.insert(
        "https://competitor.example/feed".to_string(),
        vec![entry("سوناطراك توقع اتفاقا جديدا مع شركاء أوروبيين")],
    );

    TrendRadar::new(
        Arc::new(StubFetcher { feeds }),
        Arc::new(MemoryCache::new()),
        llm,
        Arc::new(NoopNotifier),
        "https://trends.example/rss".to_string(),
        vec!["https://competitor.example/feed".to_string()],
    )
}

#[tokio::test]
async fn verified_trend_gets_analyzed_once_per_window() {
    let llm = Arc::new(CountingLlm::default());
    let radar = radar_with(llm.clone());

    // Google + competitor agreement: verified, strength 8, one LLM call.
    let alerts = radar.scan().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].keyword, "سوناطراك");
    assert_eq!(alerts[0].strength, 8);
    assert_eq!(alerts[0].reason.as_deref(), Some("صفقة طاقة جديدة"));
    assert_eq!(llm.json_calls.load(Ordering::SeqCst), 1);

    // A rescan inside the 30-minute window hits the analysis cache: no
    // second LLM call, no duplicate alert.
    let rescan = radar.scan().await.unwrap();
    assert!(rescan.is_empty());
    assert_eq!(llm.json_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unverified_keyword_never_reaches_the_llm() {
    let llm = Arc::new(CountingLlm::default());
    let mut feeds = HashMap::new();
    feeds.insert(
        "https://trends.example/rss".to_string(),
        vec![entry("كلمة منفردة")],
    );
    let radar = TrendRadar::new(
        Arc::new(StubFetcher { feeds }),
        Arc::new(MemoryCache::new()),
        llm.clone(),
        Arc::new(NoopNotifier),
        "https://trends.example/rss".to_string(),
        Vec::new(),
    );

    let alerts = radar.scan().await.unwrap();
    assert!(alerts.is_empty());
    assert_eq!(llm.json_calls.load(Ordering::SeqCst), 0);
}
