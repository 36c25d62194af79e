//! Router — classification and triage. Rule-based first (free), LLM only
//! when the rules are uncertain; that ordering saves 50–80% of LLM calls.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use ai_client::LlmClient;
use anyhow::Result;
use notify_client::Notifier;
use tahrir_cache::Cache;
use tahrir_common::error::ClassificationError;
use tahrir_common::{
    contains_arabic, normalize_text, truncate_text, Article, NewsCategory, NewsStatus, Source,
    UrgencyLevel,
};
use tahrir_knowledge::{
    classify_against_candidates, fingerprint, select_taxonomy, taxonomy_scores, ClusterDecision,
    CANDIDATE_SCAN_LIMIT, CANDIDATE_WINDOW_DAYS,
};
use tahrir_store::{ArticleStore, KnowledgeStore, SourceStore};
use tracing::{error, info, warn};

use crate::keywords::{
    authority_groups, breaking_signal_groups, category_keywords, has_local_signal,
    is_google_aggregator, looks_non_local, low_value_patterns, noise_patterns, BREAKING_ACTION_TERMS,
    BREAKING_EVENT_TERMS, BREAKING_MARKERS, LOCAL_SOURCE_KEYWORDS,
};

const COMMIT_EVERY: usize = 50;
const CANDIDATE_NOTIFY_TTL: Duration = Duration::from_secs(12 * 3600);
const LLM_TEXT_CAP: usize = 4000;

#[derive(Debug, Default, Clone, Copy)]
pub struct RouterStats {
    pub processed: u32,
    pub candidates: u32,
    pub ai_calls: u32,
    pub breaking: u32,
    pub archived: u32,
}

/// Router tunables, lifted from the configuration surface.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub batch_limit: usize,
    pub source_quota: usize,
    pub candidate_source_quota: usize,
    pub rule_min_hits: usize,
    pub skip_ai_for_non_local_aggregator: bool,
    pub editorial_min_importance: i32,
    pub editorial_require_local_signal: bool,
    pub breaking_news_ttl_minutes: i64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            batch_limit: 50,
            source_quota: 6,
            candidate_source_quota: 3,
            rule_min_hits: 2,
            skip_ai_for_non_local_aggregator: true,
            editorial_min_importance: 6,
            editorial_require_local_signal: true,
            breaking_news_ttl_minutes: 120,
        }
    }
}

pub struct Router {
    articles: ArticleStore,
    sources: SourceStore,
    knowledge: KnowledgeStore,
    cache: Arc<dyn Cache>,
    llm: Arc<dyn LlmClient>,
    notifier: Arc<dyn Notifier>,
    config: RouterConfig,
}

impl Router {
    pub fn new(
        articles: ArticleStore,
        sources: SourceStore,
        knowledge: KnowledgeStore,
        cache: Arc<dyn Cache>,
        llm: Arc<dyn LlmClient>,
        notifier: Arc<dyn Notifier>,
        config: RouterConfig,
    ) -> Self {
        Self {
            articles,
            sources,
            knowledge,
            cache,
            llm,
            notifier,
            config,
        }
    }

    /// Process one batch of NEW articles through triage.
    pub async fn process_batch(&self) -> Result<RouterStats> {
        let mut stats = RouterStats::default();

        let demoted = self
            .articles
            .expire_stale_breaking(self.config.breaking_news_ttl_minutes)
            .await?;
        if demoted > 0 {
            info!(demoted, "Stale breaking flags expired");
        }

        // Pull a wider pool under row locks; quota selection narrows it.
        let mut tx = self.articles.begin().await?;
        let pool = self
            .articles
            .lock_new_batch(&mut tx, (self.config.batch_limit * 4) as i64)
            .await?;
        if pool.is_empty() {
            tx.commit()
                .await
                .map_err(|e| anyhow::anyhow!("commit failed: {e}"))?;
            return Ok(stats);
        }

        let source_ids: Vec<i64> = pool
            .iter()
            .filter_map(|a| a.source_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let source_map: HashMap<i64, Source> = self
            .sources
            .list_by_ids(&source_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let rows: Vec<(Article, Option<&Source>)> = pool
            .into_iter()
            .map(|a| {
                let source = a.source_id.and_then(|id| source_map.get(&id));
                (a, source)
            })
            .collect();
        let selected = select_articles_for_batch(
            rows,
            self.config.batch_limit,
            self.config.source_quota,
            self.config.candidate_source_quota,
        );

        let mut since_commit = 0usize;
        for (article, source) in selected {
            let article_id = article.id;
            match self.classify_article(article, source, &mut stats).await {
                Ok(Some(classified)) => {
                    self.articles.update_after_routing(&mut tx, &classified).await?;
                    stats.processed += 1;
                    since_commit += 1;
                    self.process_knowledge(&classified).await;
                }
                Ok(None) => {
                    // Transport failure — the article stays NEW for the
                    // next batch.
                }
                Err(e) => {
                    error!(article_id, error = %e, "Router article error");
                }
            }

            if since_commit >= COMMIT_EVERY {
                // Release row locks progressively on long runs.
                tx.commit()
                    .await
                    .map_err(|e| anyhow::anyhow!("commit failed: {e}"))?;
                tx = self.articles.begin().await?;
                since_commit = 0;
            }
        }

        tx.commit()
            .await
            .map_err(|e| anyhow::anyhow!("commit failed: {e}"))?;
        info!(
            processed = stats.processed,
            candidates = stats.candidates,
            ai_calls = stats.ai_calls,
            breaking = stats.breaking,
            "Router batch complete"
        );
        Ok(stats)
    }

    /// Classify one article. Returns `Ok(None)` when an LLM transport
    /// failure leaves the article unprocessed for a later batch.
    async fn classify_article(
        &self,
        mut article: Article,
        source: Option<&Source>,
        stats: &mut RouterStats,
    ) -> Result<Option<Article>> {
        let text = format!("{} {}", article.original_title, article.original_content);
        let text_lower = normalize_text(&text);
        let source_name: String = source
            .map(|s| s.name.clone())
            .unwrap_or_else(|| article.source_name.clone());
        let source_name = source_name.as_str();
        let local_signal = has_local_signal(&text_lower, source_name);

        // Noise gate before any LLM spend.
        if let Some(reason) = noise_gate(&article, &text_lower) {
            article.status = NewsStatus::Archived;
            article.importance_score = 0;
            article.rejection_reason = Some(format!("auto_filtered:{reason}"));
            stats.archived += 1;
            return Ok(Some(article));
        }

        // Arabic sources must produce Arabic headlines.
        if is_arabic_source(source, source_name) && !contains_arabic(&article.original_title) {
            article.status = NewsStatus::Rejected;
            article.importance_score = 0;
            article.rejection_reason =
                Some("auto_filtered:arabic_source_non_arabic_title".to_string());
            return Ok(Some(article));
        }

        let mut category = rule_based_category(&text_lower, self.config.rule_min_hits);
        // Weighted taxonomy hints catch what flat keyword counts miss.
        if category.is_none() {
            category = select_taxonomy(&taxonomy_scores(&text_lower)).map(|(cat, _)| cat);
        }
        let urgency = rule_based_urgency(&text_lower);

        if urgency == UrgencyLevel::Breaking {
            article.is_breaking = true;
            article.urgency = UrgencyLevel::Breaking;
            stats.breaking += 1;
            self.notifier
                .send_breaking_alert(
                    &article.original_title,
                    &truncate_text(&article.original_content, 200),
                    source_name,
                    &article.original_url,
                )
                .await;
        }

        // Non-local aggregator content classifies as international without
        // an LLM round-trip.
        if category.is_none()
            && self.config.skip_ai_for_non_local_aggregator
            && is_google_aggregator(source_name)
            && !local_signal
            && urgency != UrgencyLevel::Breaking
        {
            category = Some(NewsCategory::International);
        }

        if let Some(category) = category {
            article.category = Some(category);
            article.importance_score = estimate_importance(&text_lower, Some(category), urgency);
            if !article.is_breaking {
                article.urgency = urgency;
            }
            if article.title_ar.is_none() {
                article.title_ar = Some(article.original_title.clone());
            }
            if article.summary.is_none() {
                article.summary = Some(truncate_text(&article.original_content, 300));
            }
        } else {
            match self
                .llm
                .analyze_news(&truncate_text(&text, LLM_TEXT_CAP), source_name)
                .await
            {
                Ok(analysis) => {
                    stats.ai_calls += 1;
                    self.cache.increment_counter("ai_calls_today").await;

                    article.title_ar = Some(if analysis.title_ar.is_empty() {
                        article.original_title.clone()
                    } else {
                        analysis.title_ar
                    });
                    article.summary = Some(if analysis.summary.is_empty() {
                        truncate_text(&article.original_content, 300)
                    } else {
                        analysis.summary
                    });
                    article.category = Some(
                        analysis
                            .category
                            .parse::<NewsCategory>()
                            .unwrap_or(NewsCategory::LocalAlgeria),
                    );
                    article.importance_score = analysis.importance_score.clamp(0, 10);
                    article.entities = analysis.entities;
                    article.keywords = analysis.keywords;
                    if analysis.is_breaking && !article.is_breaking {
                        article.is_breaking = true;
                        article.urgency = UrgencyLevel::Breaking;
                        stats.breaking += 1;
                    }
                    if !article.is_breaking && article.urgency == UrgencyLevel::Low {
                        article.urgency = urgency;
                    }
                }
                Err(ClassificationError::Parse(e)) => {
                    // Malformed response: degrade to rule defaults and
                    // keep moving.
                    warn!(article_id = article.id, error = %e, "LLM parse failure, using defaults");
                    stats.ai_calls += 1;
                    self.cache.increment_counter("ai_calls_today").await;
                    article.category = Some(NewsCategory::LocalAlgeria);
                    article.importance_score = 5;
                    article.urgency = urgency;
                    if article.title_ar.is_none() {
                        article.title_ar = Some(article.original_title.clone());
                    }
                }
                Err(ClassificationError::Transport(e)) => {
                    warn!(article_id = article.id, error = %e, "LLM transport failure, deferring");
                    return Ok(None);
                }
            }
        }

        // Guardrail: clearly non-local stories never stay local_algeria.
        if article.category == Some(NewsCategory::LocalAlgeria)
            && looks_non_local(&text_lower, source_name)
        {
            article.category = Some(NewsCategory::International);
        }

        // Editorial quality gate. Aggregator items that fail are kept for
        // monitoring in CLASSIFIED; everything else is archived.
        if let Some(reason) = editorial_quality_gate(
            &article,
            &text_lower,
            local_signal,
            self.config.editorial_require_local_signal,
        ) {
            article.status = if is_google_aggregator(source_name) {
                NewsStatus::Classified
            } else {
                stats.archived += 1;
                NewsStatus::Archived
            };
            article.importance_score = 0;
            article.rejection_reason = Some(format!("auto_filtered:{reason}"));
            return Ok(Some(article));
        }

        let mut is_candidate = article.importance_score >= self.config.editorial_min_importance
            || article.is_breaking
            || article.urgency >= UrgencyLevel::High;
        if self.config.editorial_require_local_signal && !article.is_breaking {
            is_candidate = is_candidate && local_signal;
        }
        // Aggregators are discovery input: candidate only when local or
        // breaking.
        if is_google_aggregator(source_name) && !local_signal && !article.is_breaking {
            is_candidate = false;
        }

        if is_candidate {
            article.status = NewsStatus::Candidate;
            stats.candidates += 1;
            self.notify_candidate(&article).await;
        } else {
            article.status = NewsStatus::Classified;
            article.rejection_reason = Some("auto_filtered:low_editorial_value".to_string());
        }

        Ok(Some(article))
    }

    /// Candidate notifications are deduplicated per article for 12 hours.
    async fn notify_candidate(&self, article: &Article) {
        let notify_key = format!("candidate_notified:{}", article.id);
        if self.cache.get(&notify_key).await.is_some() {
            return;
        }
        self.notifier.send_candidate_for_review(article).await;
        self.cache.set(&notify_key, "1", CANDIDATE_NOTIFY_TTL).await;
    }

    /// Fingerprint, cluster, and relate a freshly classified article.
    /// Failures here are logged and never fail the batch.
    async fn process_knowledge(&self, article: &Article) {
        let text = normalize_text(&format!(
            "{} {} {}",
            article.title_ar.as_deref().unwrap_or(&article.original_title),
            article.summary.as_deref().unwrap_or(""),
            article.original_content,
        ));
        let Some(fp) = fingerprint(&text) else {
            return;
        };
        if let Err(e) = self.knowledge.upsert_fingerprint(article.id, &fp).await {
            warn!(article_id = article.id, error = %e, "Fingerprint upsert failed");
            return;
        }

        let candidates = match self
            .knowledge
            .load_candidates(article.id, CANDIDATE_WINDOW_DAYS, CANDIDATE_SCAN_LIMIT)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(article_id = article.id, error = %e, "Candidate scan failed");
                return;
            }
        };

        let entities: HashSet<String> =
            article.entities.iter().map(|e| e.to_lowercase()).collect();
        let (decision, relations) =
            classify_against_candidates(&fp, &entities, &text, article.crawled_at, &candidates);

        let cluster_result = match &decision {
            ClusterDecision::Duplicate { anchor_id, score }
            | ClusterDecision::Join { anchor_id, score } => {
                match self.articles.get(*anchor_id).await {
                    Ok(Some(anchor)) => {
                        let attached = self
                            .knowledge
                            .attach_to_anchor_cluster(article, &anchor, *score)
                            .await;
                        if let (ClusterDecision::Duplicate { .. }, Ok(_)) = (&decision, &attached) {
                            if let Err(e) = self
                                .knowledge
                                .upsert_relation(
                                    article.id,
                                    *anchor_id,
                                    tahrir_common::RelationType::DuplicateVariant,
                                    *score,
                                    serde_json::json!({"reason": "simhash+jaccard"}),
                                )
                                .await
                            {
                                warn!(article_id = article.id, error = %e, "Duplicate relation failed");
                            }
                        }
                        attached.map(|_| ())
                    }
                    Ok(None) => self.knowledge.ensure_singleton_cluster(article).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            ClusterDecision::Singleton => {
                self.knowledge.ensure_singleton_cluster(article).await.map(|_| ())
            }
        };
        if let Err(e) = cluster_result {
            warn!(article_id = article.id, error = %e, "Cluster assignment failed");
        }

        for edge in relations {
            let metadata = serde_json::json!({"shared_entities": edge.shared_entities});
            if let Err(e) = self
                .knowledge
                .upsert_relation(article.id, edge.to_article_id, edge.relation_type, edge.score, metadata)
                .await
            {
                warn!(article_id = article.id, error = %e, "Relation upsert failed");
            }
        }
    }
}

/// Reject plainly unusable items before spending anything on them.
pub fn noise_gate(article: &Article, text_lower: &str) -> Option<&'static str> {
    let title = article.original_title.trim();
    let content = article.original_content.trim();

    if title.chars().count() < 12 {
        return Some("title_too_short");
    }
    if content.chars().count() < 40 && !article.is_breaking {
        return Some("content_too_short");
    }
    if noise_patterns().iter().any(|p| p.is_match(text_lower)) {
        return Some("game_or_puzzle_noise");
    }
    None
}

fn is_arabic_source(source: Option<&Source>, source_name: &str) -> bool {
    if let Some(source) = source {
        if source.language.eq_ignore_ascii_case("ar") {
            return true;
        }
    }
    let lower = source_name.to_lowercase();
    ["عربي", "العربية", "الجزيرة", "الخبر", "الشروق", "النهار"]
        .iter()
        .any(|k| lower.contains(k))
}

/// Keyword-count classification: highest-scoring category wins when it
/// has at least `min_hits` and a clear lead.
pub fn rule_based_category(text_lower: &str, min_hits: usize) -> Option<NewsCategory> {
    let mut scores: Vec<(NewsCategory, usize)> = category_keywords()
        .iter()
        .map(|(category, keywords)| {
            let hits = keywords.iter().filter(|kw| text_lower.contains(*kw)).count();
            (*category, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (best, best_hits) = *scores.first()?;
    let second_hits = scores.get(1).map(|(_, h)| *h).unwrap_or(0);
    if best_hits >= min_hits.max(1) && best_hits > second_hits {
        Some(best)
    } else {
        None
    }
}

/// Weighted urgency scoring over newsroom breaking signals.
pub fn rule_based_urgency(text_lower: &str) -> UrgencyLevel {
    if text_lower.is_empty() {
        return UrgencyLevel::Low;
    }

    let count_hits = |terms: &[&str]| terms.iter().filter(|t| text_lower.contains(*t)).count();

    let marker_hits = count_hits(&BREAKING_MARKERS);
    let action_hits = count_hits(&BREAKING_ACTION_TERMS);
    let event_hits = count_hits(&BREAKING_EVENT_TERMS);

    let mut domain_hits = 0usize;
    let mut entity_hits = 0usize;
    for group in breaking_signal_groups() {
        let group_hits = count_hits(group);
        if group_hits > 0 {
            domain_hits += 1;
            entity_hits += group_hits;
        }
    }
    let authority_hits = authority_groups()
        .iter()
        .filter(|group| group.iter().any(|kw| text_lower.contains(kw)))
        .count();

    let score = marker_hits * 3
        + action_hits.min(4)
        + event_hits.min(3) * 2
        + domain_hits * 2
        + authority_hits * 2
        + usize::from(entity_hits >= 3);

    // Urgent marker plus any official/domain/action signal breaks.
    if marker_hits >= 1
        && (domain_hits >= 1 || event_hits >= 1 || action_hits >= 2 || authority_hits >= 1)
    {
        return UrgencyLevel::Breaking;
    }
    // Official authority with a concrete action breaks.
    if authority_hits >= 1 && action_hits >= 1 {
        return UrgencyLevel::Breaking;
    }
    // Multi-domain official signal with action or marker breaks.
    if domain_hits >= 2 && (action_hits >= 1 || marker_hits >= 1) {
        return UrgencyLevel::Breaking;
    }
    // Multiple high-impact incident signals break immediately.
    if event_hits >= 2 {
        return UrgencyLevel::Breaking;
    }

    if score >= 8 {
        return UrgencyLevel::Breaking;
    }
    if score >= 3 || marker_hits >= 1 || event_hits >= 1 {
        return UrgencyLevel::High;
    }
    UrgencyLevel::Medium
}

/// Heuristic importance estimate when the rules resolved the category.
pub fn estimate_importance(
    text_lower: &str,
    category: Option<NewsCategory>,
    urgency: UrgencyLevel,
) -> i32 {
    let mut score = 5;

    if ["الجزائر", "جزائري", "algeria", "algerie", "dz"]
        .iter()
        .any(|kw| text_lower.contains(kw))
    {
        score += 2;
    }

    match urgency {
        UrgencyLevel::Breaking => score += 3,
        UrgencyLevel::High => score += 2,
        _ => {
            if BREAKING_MARKERS.iter().any(|kw| text_lower.contains(kw)) {
                score += 1;
            }
        }
    }

    if matches!(
        category,
        Some(NewsCategory::Politics) | Some(NewsCategory::Economy)
    ) {
        score += 1;
    }

    score.min(10)
}

/// Additional gate before the editorial stream.
pub fn editorial_quality_gate(
    article: &Article,
    text_lower: &str,
    local_signal: bool,
    require_local_signal: bool,
) -> Option<&'static str> {
    if !article.is_breaking && require_local_signal && !local_signal {
        return Some("non_local_editorial_noise");
    }
    if low_value_patterns().iter().any(|p| p.is_match(text_lower)) {
        return Some("promotional_or_ad_noise");
    }
    if article.original_title.trim().chars().count() < 16 && !article.is_breaking {
        return Some("weak_headline");
    }
    None
}

/// Quota selection: local relevance first, and no single source may flood
/// a batch (hard total quota plus a tighter candidate-like quota).
pub fn select_articles_for_batch<'a>(
    rows: Vec<(Article, Option<&'a Source>)>,
    limit: usize,
    source_quota: usize,
    candidate_quota: usize,
) -> Vec<(Article, Option<&'a Source>)> {
    if rows.is_empty() {
        return Vec::new();
    }

    fn score_row(article: &Article, source: Option<&Source>) -> (u8, u8, chrono::DateTime<chrono::Utc>) {
        let text_lower = normalize_text(&format!(
            "{} {}",
            article.original_title, article.original_content
        ));
        let source_name = source.map(|s| s.name.as_str()).unwrap_or(&article.source_name);
        let local_source = LOCAL_SOURCE_KEYWORDS
            .iter()
            .any(|k| source_name.to_lowercase().contains(k));
        let local_signal = has_local_signal(&text_lower, source_name);
        (
            u8::from(local_source),
            u8::from(local_signal),
            article.crawled_at,
        )
    }

    let mut rows = rows;
    rows.sort_by(|a, b| {
        let ka = score_row(&a.0, a.1);
        let kb = score_row(&b.0, b.1);
        kb.cmp(&ka)
    });

    let source_quota = source_quota.max(1);
    let candidate_quota = candidate_quota.max(1);
    let mut per_source_total: HashMap<String, usize> = HashMap::new();
    let mut per_source_candidate: HashMap<String, usize> = HashMap::new();
    let mut selected = Vec::new();

    for (article, source) in rows {
        if selected.len() >= limit {
            break;
        }
        let source_key = source
            .map(|s| s.id.to_string())
            .unwrap_or_else(|| article.source_name.clone());
        let total = per_source_total.get(&source_key).copied().unwrap_or(0);
        if total >= source_quota {
            continue;
        }

        let text_lower = normalize_text(&format!(
            "{} {}",
            article.original_title, article.original_content
        ));
        let source_name = source.map(|s| s.name.as_str()).unwrap_or(&article.source_name);
        let candidate_like = has_local_signal(&text_lower, source_name);
        if candidate_like
            && per_source_candidate.get(&source_key).copied().unwrap_or(0) >= candidate_quota
        {
            continue;
        }

        per_source_total.insert(source_key.clone(), total + 1);
        if candidate_like {
            *per_source_candidate.entry(source_key).or_insert(0) += 1;
        }
        selected.push((article, source));
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_article(id: i64, title: &str, content: &str, source_name: &str) -> Article {
        let now = Utc::now();
        Article {
            id,
            source_id: None,
            source_name: source_name.to_string(),
            original_url: format!("https://example.dz/{id}"),
            original_title: title.to_string(),
            original_content: content.to_string(),
            title_ar: None,
            summary: None,
            category: None,
            importance_score: 0,
            urgency: UrgencyLevel::Low,
            is_breaking: false,
            status: NewsStatus::New,
            unique_hash: format!("hash-{id}"),
            trace_id: format!("trace-{id}"),
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

    #[test]
    fn presidential_decree_is_breaking_politics() {
        let text = normalize_text("الرئيس يعلن قرارات سيادية هامة بيان رئاسة الجمهورية");
        assert_eq!(rule_based_category(&text, 2), Some(NewsCategory::Politics));
        assert_eq!(rule_based_urgency(&text), UrgencyLevel::Breaking);
    }

    #[test]
    fn calm_society_story_is_medium() {
        let text = normalize_text("افتتاح معرض للحرف التقليدية بمشاركة عشرات العارضين المحليين");
        assert_eq!(rule_based_urgency(&text), UrgencyLevel::Medium);
    }

    #[test]
    fn two_incidents_break() {
        let text = normalize_text("زلزال يضرب المنطقة وانفجار في محطة الكهرباء");
        assert_eq!(rule_based_urgency(&text), UrgencyLevel::Breaking);
    }

    #[test]
    fn single_marker_is_high() {
        let text = normalize_text("متابعة مستجدات الملف المطروح للنقاش العمومي هذا الاسبوع");
        assert_eq!(rule_based_urgency(&text), UrgencyLevel::High);
    }

    #[test]
    fn ambiguous_category_stays_uncertain() {
        // One politics hit, one sports hit — no clear leader.
        let text = normalize_text("الرئيس يستقبل لاعب المنتخب");
        assert_eq!(rule_based_category(&text, 2), None);
    }

    #[test]
    fn noise_gate_rejects_short_titles() {
        let article = make_article(1, "قصير", "محتوى طويل بما يكفي ليتجاوز عتبة الفحص الدنيا بكثير", "TSA");
        let text = normalize_text(&article.original_title);
        assert_eq!(noise_gate(&article, &text), Some("title_too_short"));
    }

    #[test]
    fn noise_gate_rejects_puzzles() {
        let article = make_article(
            1,
            "Wordle answer today is here",
            "today's wordle answer and hints for the daily puzzle game fans",
            "Aggregator",
        );
        let text = normalize_text(&format!(
            "{} {}",
            article.original_title, article.original_content
        ));
        assert_eq!(noise_gate(&article, &text), Some("game_or_puzzle_noise"));
    }

    #[test]
    fn importance_boosts_local_breaking_politics() {
        let text = normalize_text("عاجل الجزائر قرارات رئاسية");
        let score = estimate_importance(&text, Some(NewsCategory::Politics), UrgencyLevel::Breaking);
        assert_eq!(score, 10);
        let calm = estimate_importance("nothing special", None, UrgencyLevel::Medium);
        assert_eq!(calm, 5);
    }

    #[test]
    fn quality_gate_blocks_promotional_content() {
        let article = make_article(
            1,
            "عرض ترويجي للمنتجات الجديدة في الجزائر",
            "تخفيضات كبيرة على كل المنتجات هذا الأسبوع في الجزائر العاصمة",
            "TSA",
        );
        let text = normalize_text(&format!(
            "{} {}",
            article.original_title, article.original_content
        ));
        assert_eq!(
            editorial_quality_gate(&article, &text, true, true),
            Some("promotional_or_ad_noise")
        );
    }

    #[test]
    fn quality_gate_requires_local_signal() {
        let article = make_article(
            1,
            "Global markets rally on tech earnings surge",
            "Stocks rose across global markets as quarterly earnings beat expectations everywhere.",
            "Reuters",
        );
        let text = normalize_text(&format!(
            "{} {}",
            article.original_title, article.original_content
        ));
        assert_eq!(
            editorial_quality_gate(&article, &text, false, true),
            Some("non_local_editorial_noise")
        );
    }

    #[test]
    fn batch_selection_enforces_source_quota() {
        let rows: Vec<(Article, Option<&Source>)> = (0..20)
            .map(|i| {
                (
                    make_article(i, &format!("عنوان تجريبي رقم {i} في الجزائر"), "محتوى", "TSA"),
                    None,
                )
            })
            .collect();
        // All 20 share the "TSA" source key; candidate-like quota of 3
        // binds first because every row carries a local signal.
        let selected = select_articles_for_batch(rows, 50, 6, 3);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn batch_selection_prefers_local_sources() {
        let mut rows: Vec<(Article, Option<&Source>)> = Vec::new();
        rows.push((
            make_article(1, "Global story about markets everywhere", "content", "Reuters"),
            None,
        ));
        rows.push((
            make_article(2, "خبر محلي عن الجزائر العاصمة", "محتوى محلي", "الشروق"),
            None,
        ));
        let selected = select_articles_for_batch(rows, 1, 6, 3);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, 2);
    }

    #[test]
    fn empty_batch_selects_nothing() {
        let selected = select_articles_for_batch(Vec::new(), 50, 6, 3);
        assert!(selected.is_empty());
    }
}
