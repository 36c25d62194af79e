//! Pipeline agents: Scout (ingestion), Router (classification and
//! triage), Scribe (draft generation), Trend Radar, and the
//! Published-Quality Monitor.
//!
//! Agents depend only on capability interfaces (`Cache`, `LlmClient`,
//! `Notifier`, the stores) injected at construction; no agent imports
//! another.

pub mod feeds;
pub mod keywords;
pub mod published_monitor;
pub mod router;
pub mod scout;
pub mod scribe;
pub mod trend_radar;

pub use feeds::{FeedEntry, FeedFetcher, HttpFetcher};
pub use published_monitor::PublishedMonitor;
pub use router::{Router, RouterConfig, RouterStats};
pub use scout::{Scout, ScoutStats};
pub use scribe::{Scribe, ScribeStats};
pub use trend_radar::TrendRadar;
