pub(crate) mod types;

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use tahrir_common::error::ClassificationError;
use tahrir_common::truncate_text;
use tracing::warn;

use crate::traits::{AnalysisResult, LlmClient};
use crate::util::extract_json;
use types::{ChatRequest, ChatResponse, WireMessage};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_FLOOR: Duration = Duration::from_secs(2);
const BACKOFF_CEIL: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const ANALYZE_SYSTEM: &str = "\
You are a newsroom classification assistant for an Algerian Arabic outlet. \
Respond with strict JSON only, no prose, using keys: \
category (one of politics, economy, sports, technology, health, culture, \
environment, society, local_algeria, international), title_ar, summary, \
importance_score (0-10), entities (array), keywords (array), \
is_breaking (bool), sentiment.";

/// Retrying HTTP client for the Messages API. Routes `analyze_news` to the
/// fast model and `generate_*` to the deep model.
#[derive(Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model_fast: String,
    model_deep: String,
}

impl ClaudeClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model_fast: impl Into<String>,
        model_deep: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model_fast: model_fast.into(),
            model_deep: model_deep.into(),
        }
    }

    /// One round-trip with retries on transport errors and 5xx/429.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut last_error = anyhow!("no attempts made");
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
            let result = self
                .http
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .timeout(REQUEST_TIMEOUT)
                .json(request)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<ChatResponse>()
                        .await
                        .map_err(|e| anyhow!("response decode failed: {e}"));
                }
                Ok(resp) if resp.status().is_server_error() || resp.status().as_u16() == 429 => {
                    warn!(status = %resp.status(), attempt, "LLM request failed, retrying");
                    last_error = anyhow!("LLM HTTP {}", resp.status());
                }
                Ok(resp) => {
                    // 4xx other than 429 will not improve with retries.
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(anyhow!("LLM HTTP {status}: {body}"));
                }
                Err(e) => {
                    warn!(error = %e, attempt, "LLM transport error, retrying");
                    last_error = anyhow!("LLM transport error: {e}");
                }
            }
        }
        Err(last_error)
    }

    async fn complete(&self, model: &str, system: Option<&str>, prompt: &str) -> Result<String> {
        let mut request = ChatRequest::new(model).message(WireMessage::user(prompt));
        if let Some(system) = system {
            request = request.system(system);
        }
        let response = self.chat(&request).await?;
        response.text().ok_or_else(|| anyhow!("empty LLM response"))
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = BACKOFF_FLOOR * 2u32.saturating_pow(attempt.saturating_sub(1));
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..500));
    (base + jitter).min(BACKOFF_CEIL)
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn analyze_news(
        &self,
        text: &str,
        source: &str,
    ) -> Result<AnalysisResult, ClassificationError> {
        let prompt = format!(
            "Source: {source}\n\nArticle text:\n{}",
            truncate_text(text, 16_000)
        );
        let raw = self
            .complete(&self.model_fast, Some(ANALYZE_SYSTEM), &prompt)
            .await
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        let json_str = extract_json(&raw)
            .ok_or_else(|| ClassificationError::Parse("no JSON object in response".to_string()))?;
        serde_json::from_str::<AnalysisResult>(json_str)
            .map_err(|e| ClassificationError::Parse(e.to_string()))
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.complete(&self.model_deep, None, prompt).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let raw = self.complete(&self.model_deep, None, prompt).await?;
        let json_str =
            extract_json(&raw).ok_or_else(|| anyhow!("no JSON in LLM response"))?;
        serde_json::from_str(json_str).map_err(|e| anyhow!("LLM JSON parse failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_stays_inside_contract_window() {
        for attempt in 1..=5 {
            let d = backoff_delay(attempt);
            assert!(d >= BACKOFF_FLOOR, "attempt {attempt}: {d:?}");
            assert!(d <= BACKOFF_CEIL, "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn analysis_result_tolerates_missing_fields() {
        let parsed: AnalysisResult = serde_json::from_str(r#"{"category": "economy"}"#).unwrap();
        assert_eq!(parsed.category, "economy");
        assert_eq!(parsed.importance_score, 5);
        assert!(parsed.entities.is_empty());
        assert!(!parsed.is_breaking);
    }
}
