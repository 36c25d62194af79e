use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tahrir_common::error::ClassificationError;

/// Structured outcome of `analyze_news`. Missing fields degrade to
/// defaults rather than failing the call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title_ar: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_importance")]
    pub importance_score: i32,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub is_breaking: bool,
    #[serde(default)]
    pub sentiment: String,
}

fn default_importance() -> i32 {
    5
}

/// The three LLM capabilities the core requires. Implementations may
/// route to fast or deep models; retries live inside the implementation
/// (3 attempts, exponential backoff 2–30 s).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Classify and enrich one news text. The error variant tells the
    /// caller whether to retry (transport) or degrade to rule-based
    /// defaults (parse).
    async fn analyze_news(
        &self,
        text: &str,
        source: &str,
    ) -> Result<AnalysisResult, ClassificationError>;

    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String>;

    async fn generate_json(&self, prompt: &str) -> anyhow::Result<serde_json::Value>;
}
