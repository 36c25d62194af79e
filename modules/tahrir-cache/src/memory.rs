use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{Cache, RECENT_TITLE_WINDOW, URL_PROCESSED_TTL};

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

struct Inner {
    entries: HashMap<String, Entry>,
    counters: HashMap<String, i64>,
    recent_titles: VecDeque<String>,
    /// Lazy sweep bookkeeping — expired entries are dropped opportunistically.
    last_sweep: DateTime<Utc>,
}

/// In-process cache shared across all workers of one process via `Arc`.
/// The only shared mutable state in the core; everything durable lives in
/// Postgres.
pub struct MemoryCache {
    inner: RwLock<Inner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                counters: HashMap::new(),
                recent_titles: VecDeque::with_capacity(RECENT_TITLE_WINDOW),
                last_sweep: Utc::now(),
            }),
        }
    }

    fn url_key(hash: &str) -> String {
        format!("url_processed:{hash}")
    }

    /// Drop expired entries. Called opportunistically from writes at most
    /// once a minute to keep the map bounded without a background task.
    fn maybe_sweep(inner: &mut Inner, now: DateTime<Utc>) {
        if (now - inner.last_sweep).num_seconds() < 60 {
            return;
        }
        inner.entries.retain(|_, e| e.expires_at > now);
        inner.last_sweep = now;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.read().await;
        let entry = inner.entries.get(key)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(7));
        let mut inner = self.inner.write().await;
        Self::maybe_sweep(&mut inner, now);
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    async fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "Corrupt JSON cache entry, treating as miss");
                None
            }
        }
    }

    async fn set_json(&self, key: &str, value: &serde_json::Value, ttl: Duration) {
        self.set(key, &value.to_string(), ttl).await;
    }

    async fn increment_counter(&self, key: &str) -> i64 {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    async fn counter(&self, key: &str) -> i64 {
        let inner = self.inner.read().await;
        inner.counters.get(key).copied().unwrap_or(0)
    }

    async fn is_url_processed(&self, hash: &str) -> bool {
        self.get(&Self::url_key(hash)).await.is_some()
    }

    async fn mark_url_processed(&self, hash: &str, article_id: Option<i64>) {
        let value = article_id.map(|id| id.to_string()).unwrap_or_default();
        self.set(&Self::url_key(hash), &value, URL_PROCESSED_TTL)
            .await;
    }

    async fn add_recent_title(&self, title: &str) {
        let mut inner = self.inner.write().await;
        if inner.recent_titles.len() >= RECENT_TITLE_WINDOW {
            inner.recent_titles.pop_back();
        }
        inner.recent_titles.push_front(title.to_string());
    }

    async fn get_recent_titles(&self, n: usize) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.recent_titles.iter().take(n).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_round_trip() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_miss() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(0)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn json_round_trip() {
        let cache = MemoryCache::new();
        let value = serde_json::json!({"score": 82, "items": ["a", "b"]});
        cache.set_json("report", &value, Duration::from_secs(60)).await;
        assert_eq!(cache.get_json("report").await, Some(value));
    }

    #[tokio::test]
    async fn counters_are_monotonic() {
        let cache = MemoryCache::new();
        assert_eq!(cache.increment_counter("ai_calls_today").await, 1);
        assert_eq!(cache.increment_counter("ai_calls_today").await, 2);
        assert_eq!(cache.counter("ai_calls_today").await, 2);
        assert_eq!(cache.counter("other").await, 0);
    }

    #[tokio::test]
    async fn url_processed_set_membership() {
        let cache = MemoryCache::new();
        assert!(!cache.is_url_processed("abc123").await);
        cache.mark_url_processed("abc123", Some(42)).await;
        assert!(cache.is_url_processed("abc123").await);
    }

    #[tokio::test]
    async fn recent_titles_window_is_bounded_and_newest_first() {
        let cache = MemoryCache::new();
        for i in 0..(RECENT_TITLE_WINDOW + 10) {
            cache.add_recent_title(&format!("title {i}")).await;
        }
        let titles = cache.get_recent_titles(RECENT_TITLE_WINDOW + 10).await;
        assert_eq!(titles.len(), RECENT_TITLE_WINDOW);
        assert_eq!(titles[0], format!("title {}", RECENT_TITLE_WINDOW + 9));
    }
}
