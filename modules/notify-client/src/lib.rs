//! Notification capability boundary.
//!
//! Dispatch is fire-and-forget: failures are logged and swallowed, the
//! pipeline never blocks on a webhook. Breaking news goes to the
//! Telegram-style editors channel; everything else to the Slack-style
//! ops channel.

use std::time::Duration;

use async_trait::async_trait;
use tahrir_common::{Article, TrendAlert};
use tracing::{error, info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const MESSAGE_CAP: usize = 4096;

/// Capability trait injected into the agents. All methods are
/// fire-and-forget; implementations must not propagate failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Immediate alert when an article turns breaking.
    async fn send_breaking_alert(&self, title: &str, summary: &str, source: &str, url: &str);

    /// An article reached CANDIDATE and awaits editor review.
    async fn send_candidate_for_review(&self, article: &Article);

    async fn send_trend_alert(&self, alert: &TrendAlert);

    /// Published-quality scan found weak items; `report` is the scan
    /// payload stored in the cache.
    async fn send_published_quality_alert(&self, report: &serde_json::Value);

    /// Free-form ops-channel message (reaper findings, DLQ spikes, ...).
    async fn send_ops(&self, message: &str);
}

/// Webhook-backed notifier. An empty URL disables that channel.
pub struct WebhookNotifier {
    http: reqwest::Client,
    breaking_webhook_url: String,
    ops_webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(breaking_webhook_url: String, ops_webhook_url: String) -> Self {
        if breaking_webhook_url.is_empty() {
            warn!("Breaking webhook not configured, breaking alerts disabled");
        }
        if ops_webhook_url.is_empty() {
            warn!("Ops webhook not configured, ops alerts disabled");
        }
        Self {
            http: reqwest::Client::new(),
            breaking_webhook_url,
            ops_webhook_url,
        }
    }

    async fn post(&self, url: &str, text: String) {
        if url.is_empty() {
            return;
        }
        let capped: String = text.chars().take(MESSAGE_CAP).collect();
        let payload = serde_json::json!({ "text": capped });
        match self
            .http
            .post(url)
            .timeout(SEND_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("Notification sent");
            }
            Ok(resp) => {
                error!(status = %resp.status(), "Notification webhook rejected message");
            }
            Err(e) => {
                error!(error = %e, "Notification webhook unreachable");
            }
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_breaking_alert(&self, title: &str, summary: &str, source: &str, url: &str) {
        let message = format!(
            "🚨 عاجل | {title}\n\n{summary}\n\nالمصدر: {source}\n{url}"
        );
        self.post(&self.breaking_webhook_url, message).await;
    }

    async fn send_candidate_for_review(&self, article: &Article) {
        let title = article
            .title_ar
            .as_deref()
            .unwrap_or(&article.original_title);
        let summary = article.summary.as_deref().unwrap_or("");
        let category = article
            .category
            .map(|c| c.to_string())
            .unwrap_or_else(|| "general".to_string());
        let message = format!(
            "📰 مادة مرشحة للمراجعة\n\n{title}\n\n{summary}\n\nالمصدر: {}\nالأهمية: {}/10 | التصنيف: {category}",
            article.source_name, article.importance_score
        );
        self.post(&self.breaking_webhook_url, message).await;
    }

    async fn send_trend_alert(&self, alert: &TrendAlert) {
        let stars = "🔥".repeat((alert.strength as usize / 2).clamp(1, 5));
        let angles = if alert.suggested_angles.is_empty() {
            "  -".to_string()
        } else {
            alert
                .suggested_angles
                .iter()
                .map(|a| format!("  • {a}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let message = format!(
            "🚨 تراند صاعد: {}\n\n📊 قوة الزخم: {stars} ({}/10)\n📡 المصادر: {}\n\n💡 السبب: {}\n\n📝 مقترحات الزوايا:\n{angles}",
            alert.keyword,
            alert.strength,
            alert.source_signals.join(", "),
            alert.reason.as_deref().unwrap_or("تحليل غير متوفر"),
        );
        self.post(&self.ops_webhook_url, message).await;
    }

    async fn send_published_quality_alert(&self, report: &serde_json::Value) {
        let weak = report["weak_items_count"].as_i64().unwrap_or(0);
        let avg = report["average_score"].as_f64().unwrap_or(0.0);
        let message = format!(
            "⚠️ رصد جودة النشر: {weak} مادة ضعيفة (متوسط الدرجات {avg:.1})"
        );
        self.post(&self.ops_webhook_url, message).await;
    }

    async fn send_ops(&self, message: &str) {
        self.post(&self.ops_webhook_url, message.to_string()).await;
    }
}

/// No-op notifier for tests and notification-less deployments.
#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_breaking_alert(&self, _title: &str, _summary: &str, _source: &str, _url: &str) {}
    async fn send_candidate_for_review(&self, _article: &Article) {}
    async fn send_trend_alert(&self, _alert: &TrendAlert) {}
    async fn send_published_quality_alert(&self, _report: &serde_json::Value) {}
    async fn send_ops(&self, _message: &str) {}
}
