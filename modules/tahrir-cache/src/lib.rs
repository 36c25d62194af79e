//! Process-wide keyed cache with TTLs plus the dedup primitives the
//! ingestion pipeline leans on (recent-title window, URL-processed set,
//! daily counters).
//!
//! Every operation degrades gracefully: a broken backend yields empty
//! reads and silently dropped writes. Agents never fail because the cache
//! did.

pub mod dedup;
pub mod memory;

pub use dedup::is_duplicate_title;
pub use memory::MemoryCache;

use std::time::Duration;

use async_trait::async_trait;

/// Capability interface for the shared cache. Injected into agents at
/// startup; implementations must be cheap to clone behind an `Arc`.
#[async_trait]
pub trait Cache: Send + Sync {
    /// At-most-once read. Stale reads are tolerated by all callers.
    async fn get(&self, key: &str) -> Option<String>;

    /// At-most-once write with TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration);

    async fn get_json(&self, key: &str) -> Option<serde_json::Value>;

    async fn set_json(&self, key: &str, value: &serde_json::Value, ttl: Duration);

    /// Atomic monotonic increment. Daily counters are reset by an external
    /// cron, not by the core.
    async fn increment_counter(&self, key: &str) -> i64;

    async fn counter(&self, key: &str) -> i64;

    /// Membership check for the 7-day URL-processed set.
    async fn is_url_processed(&self, hash: &str) -> bool;

    async fn mark_url_processed(&self, hash: &str, article_id: Option<i64>);

    /// Push into the bounded FIFO window of recent normalized titles.
    async fn add_recent_title(&self, title: &str);

    /// Most-recent-first window of up to `n` titles.
    async fn get_recent_titles(&self, n: usize) -> Vec<String>;
}

/// Lifetime of entries in the URL-processed set.
pub const URL_PROCESSED_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Size bound of the recent-title window.
pub const RECENT_TITLE_WINDOW: usize = 200;
