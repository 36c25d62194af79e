//! Scribe — draft generation. Takes approved articles, asks the LLM for a
//! rewrite, sanitizes the result, and files it as the next draft version
//! of the article's editorial work.

use std::sync::Arc;

use ai_client::LlmClient;
use anyhow::{Context, Result};
use serde::Deserialize;
use tahrir_cache::Cache;
use tahrir_common::{truncate_text, Article, EditorialDraft, NewsStatus};
use tahrir_editorial::sanitize_html;
use tahrir_store::{ArticleStore, DraftStore, NewDraftVersion};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct ScribeStats {
    pub processed: u32,
    pub drafts_created: u32,
    pub errors: u32,
}

/// The LLM's output contract for one draft.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DraftOutput {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub seo_title: String,
    #[serde(default)]
    pub seo_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct Scribe {
    articles: ArticleStore,
    drafts: DraftStore,
    llm: Arc<dyn LlmClient>,
    cache: Arc<dyn Cache>,
    batch_limit: i64,
}

impl Scribe {
    pub fn new(
        articles: ArticleStore,
        drafts: DraftStore,
        llm: Arc<dyn LlmClient>,
        cache: Arc<dyn Cache>,
        batch_limit: i64,
    ) -> Self {
        Self {
            articles,
            drafts,
            llm,
            cache,
            batch_limit: batch_limit.max(1),
        }
    }

    /// Draft every article waiting in the handoff queue.
    pub async fn batch_write(&self) -> Result<ScribeStats> {
        let mut stats = ScribeStats::default();
        let pending = self.articles.approved_for_drafting(self.batch_limit).await?;
        for article in pending {
            stats.processed += 1;
            match self.write_draft(&article, None, "scribe").await {
                Ok(draft) => {
                    stats.drafts_created += 1;
                    info!(
                        article_id = article.id,
                        draft_id = draft.id,
                        version = draft.version,
                        "Draft generated"
                    );
                }
                Err(e) => {
                    stats.errors += 1;
                    warn!(article_id = article.id, error = %e, "Draft generation failed");
                }
            }
        }
        info!(
            processed = stats.processed,
            drafts = stats.drafts_created,
            errors = stats.errors,
            "Scribe batch complete"
        );
        Ok(stats)
    }

    /// Rewrite one article into a new draft version. `fixed_work_id`
    /// forces the version into an existing work — the "rewrite this
    /// article" surface.
    pub async fn write_draft(
        &self,
        article: &Article,
        fixed_work_id: Option<String>,
        source_action: &str,
    ) -> Result<EditorialDraft> {
        let output = self.generate_output(article).await?;
        self.cache.increment_counter("ai_calls_today").await;

        let title = if output.headline.trim().is_empty() {
            article
                .title_ar
                .clone()
                .unwrap_or_else(|| article.original_title.clone())
        } else {
            output.headline.trim().to_string()
        };
        let body = sanitize_html(&output.body_html);
        let body = if body.is_empty() {
            fallback_body(article)
        } else {
            body
        };

        let parent_draft_id = match &fixed_work_id {
            Some(work_id) => self.drafts.latest_by_work(work_id).await?.map(|d| d.id),
            None => None,
        };

        let draft = self
            .drafts
            .create_version(&NewDraftVersion {
                article_id: article.id,
                work_id: fixed_work_id,
                source_action: source_action.to_string(),
                title,
                body,
                parent_draft_id,
                change_origin: Some("llm".to_string()),
                created_by: "scribe".to_string(),
            })
            .await?;

        // Handoff articles advance; regenerations on later-stage articles
        // leave the article status alone.
        if article.status == NewsStatus::ApprovedHandoff {
            self.articles
                .transition_status(
                    article.id,
                    &[NewsStatus::ApprovedHandoff],
                    NewsStatus::DraftGenerated,
                )
                .await?;
        }

        Ok(draft)
    }

    /// Article lookup for rewrite dispatch.
    pub async fn article(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.articles.get(id).await?)
    }

    /// Force a new version inside an existing work.
    pub async fn regenerate_by_work_id(&self, work_id: &str) -> Result<EditorialDraft> {
        let latest = self
            .drafts
            .latest_by_work(work_id)
            .await?
            .with_context(|| format!("work {work_id} not found"))?;
        let article = self
            .articles
            .get(latest.article_id)
            .await?
            .with_context(|| format!("article {} not found", latest.article_id))?;
        self.write_draft(&article, Some(work_id.to_string()), "rewrite")
            .await
    }

    /// Ask the LLM for the draft JSON; a malformed response degrades to a
    /// deterministic default draft instead of failing the job.
    async fn generate_output(&self, article: &Article) -> Result<DraftOutput> {
        let source_text = truncate_text(&article.original_content, 7000);
        let title = article
            .title_ar
            .as_deref()
            .unwrap_or(&article.original_title);
        let prompt = format!(
            "Rewrite the following into a publishable Arabic news article. \
             Return strict JSON with keys: headline, body_html, seo_title, \
             seo_description, tags. body_html may use only p, h1, h2, h3, \
             strong, em, ul, ol, li, blockquote, a, br. Keep every fact; \
             add nothing.\n\nTitle: {title}\n\nText:\n{source_text}"
        );

        let value = self.llm.generate_json(&prompt).await?;
        match serde_json::from_value::<DraftOutput>(value) {
            Ok(output) => Ok(output),
            Err(e) => {
                warn!(article_id = article.id, error = %e, "Draft JSON malformed, using fallback");
                Ok(DraftOutput::default())
            }
        }
    }
}

/// Deterministic draft body when the LLM output is unusable: the raw
/// content as paragraphs.
fn fallback_body(article: &Article) -> String {
    let paragraphs: Vec<String> = article
        .original_content
        .split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{p}</p>"))
        .collect();
    if paragraphs.is_empty() {
        format!("<p>{}</p>", article.original_title)
    } else {
        paragraphs.join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_output_tolerates_partial_json() {
        let parsed: DraftOutput =
            serde_json::from_value(serde_json::json!({"headline": "عنوان"})).unwrap();
        assert_eq!(parsed.headline, "عنوان");
        assert!(parsed.body_html.is_empty());
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn fallback_body_wraps_paragraphs() {
        let mut article = test_article();
        article.original_content = "الفقرة الأولى\nالفقرة الثانية".to_string();
        assert_eq!(
            fallback_body(&article),
            "<p>الفقرة الأولى</p><p>الفقرة الثانية</p>"
        );
    }

    #[test]
    fn fallback_body_uses_title_when_empty() {
        let mut article = test_article();
        article.original_content = String::new();
        assert_eq!(fallback_body(&article), "<p>عنوان تجريبي</p>");
    }

    fn test_article() -> Article {
        let now = chrono::Utc::now();
        Article {
            id: 1,
            source_id: None,
            source_name: "TSA".to_string(),
            original_url: "https://example.dz/1".to_string(),
            original_title: "عنوان تجريبي".to_string(),
            original_content: String::new(),
            title_ar: None,
            summary: None,
            category: None,
            importance_score: 5,
            urgency: tahrir_common::UrgencyLevel::Medium,
            is_breaking: false,
            status: NewsStatus::ApprovedHandoff,
            unique_hash: "hash".to_string(),
            trace_id: "trace".to_string(),
            rejection_reason: None,
            entities: Vec::new(),
            keywords: Vec::new(),
            published_url: None,
            published_at: None,
            crawled_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}
