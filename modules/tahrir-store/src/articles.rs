use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tahrir_common::{Article, NewsCategory, NewsStatus, TahrirError, UrgencyLevel};
use tracing::info;

use crate::row::{article_from_row, string_vec_json};
use crate::{db_err, is_unique_violation};

/// Fields required to persist a freshly ingested article.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_id: Option<i64>,
    pub source_name: String,
    pub original_url: String,
    pub original_title: String,
    pub original_content: String,
    pub unique_hash: String,
    pub trace_id: String,
    pub published_at: Option<chrono::DateTime<Utc>>,
}

/// Sort keys exposed to the list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleSort {
    #[default]
    CreatedAt,
    CrawledAt,
    ImportanceScore,
    PublishedAt,
}

impl ArticleSort {
    fn column(self) -> &'static str {
        match self {
            ArticleSort::CreatedAt => "created_at",
            ArticleSort::CrawledAt => "crawled_at",
            ArticleSort::ImportanceScore => "importance_score",
            ArticleSort::PublishedAt => "published_at",
        }
    }
}

/// Filters for the article list operation.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<NewsStatus>,
    pub category: Option<NewsCategory>,
    pub is_breaking: Option<bool>,
    /// Free-text search over original and normalized titles.
    pub search: Option<String>,
    /// Hide items crawled earlier than this many hours ago.
    pub max_age_hours: Option<i64>,
    pub sort: ArticleSort,
    /// Prefix ordering by a 0–4 local-priority expression.
    pub local_first: bool,
    pub limit: i64,
    pub offset: i64,
}

/// 0–4 local-priority expression derived from category, source name,
/// title, and summary. Higher sorts first in "local first" mode.
const LOCAL_PRIORITY_EXPR: &str = "(CASE \
     WHEN category = 'local_algeria' THEN 4 \
     WHEN lower(source_name) ~ '(aps|tsa|echorouk|الشروق|الخبر|النهار|dz)' THEN 3 \
     WHEN original_title ~ '(الجزائر|جزائري|الجزائرية)' THEN 2 \
     WHEN coalesce(summary, '') ~ '(الجزائر|جزائري|الجزائرية)' THEN 1 \
     ELSE 0 END)";

#[derive(Clone)]
pub struct ArticleStore {
    pool: PgPool,
}

impl ArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, TahrirError> {
        self.pool.begin().await.map_err(db_err)
    }

    /// Insert a new article in status NEW. A `unique_hash` race is not a
    /// failure: the integrity conflict is reported as `Ok(None)` and the
    /// caller counts a duplicate.
    pub async fn insert_new(&self, new: &NewArticle) -> Result<Option<Article>, TahrirError> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles
                (source_id, source_name, original_url, original_title, original_content,
                 unique_hash, trace_id, status, urgency, published_at, crawled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'new', 'low', $8, now())
            RETURNING *
            "#,
        )
        .bind(new.source_id)
        .bind(&new.source_name)
        .bind(&new.original_url)
        .bind(&new.original_title)
        .bind(&new.original_content)
        .bind(&new.unique_hash)
        .bind(&new.trace_id)
        .bind(new.published_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(article_from_row(&row).map_err(db_err)?)),
            Err(e) if is_unique_violation(&e) => {
                info!(unique_hash = %new.unique_hash, "Duplicate detected on insert");
                Ok(None)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    pub async fn exists_by_hash(&self, unique_hash: &str) -> Result<bool, TahrirError> {
        let row = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE unique_hash = $1)",
        )
        .bind(unique_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.0)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>, TahrirError> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| article_from_row(&r).map_err(db_err)).transpose()
    }

    /// Lock a batch of NEW articles for routing. `SKIP LOCKED` lets
    /// concurrent workers take disjoint batches.
    pub async fn lock_new_batch(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        limit: i64,
    ) -> Result<Vec<Article>, TahrirError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE status = 'new'
            ORDER BY crawled_at DESC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|r| article_from_row(r).map_err(db_err))
            .collect()
    }

    /// Demote `is_breaking` flags older than the TTL to high urgency.
    /// Returns the number of demoted rows.
    pub async fn expire_stale_breaking(&self, ttl_minutes: i64) -> Result<u64, TahrirError> {
        let cutoff = Utc::now() - Duration::minutes(ttl_minutes.max(1));
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET is_breaking = FALSE, urgency = 'high', updated_at = now()
            WHERE is_breaking = TRUE AND crawled_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    /// Persist the Router's classification outcome for one article.
    pub async fn update_after_routing(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        article: &Article,
    ) -> Result<(), TahrirError> {
        sqlx::query(
            r#"
            UPDATE articles SET
                title_ar = $2,
                summary = $3,
                category = $4,
                importance_score = $5,
                urgency = $6,
                is_breaking = $7,
                status = $8,
                rejection_reason = $9,
                entities = $10,
                keywords = $11,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(article.id)
        .bind(&article.title_ar)
        .bind(&article.summary)
        .bind(article.category.map(|c| c.to_string()))
        .bind(article.importance_score)
        .bind(article.urgency.to_string())
        .bind(article.is_breaking)
        .bind(article.status.to_string())
        .bind(&article.rejection_reason)
        .bind(string_vec_json(&article.entities))
        .bind(string_vec_json(&article.keywords))
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Guarded status transition: updates only when the article is in one
    /// of `from`. Returns the updated article, or `None` when the guard
    /// did not match (caller surfaces an invalid-transition error).
    pub async fn transition_status(
        &self,
        id: i64,
        from: &[NewsStatus],
        to: NewsStatus,
    ) -> Result<Option<Article>, TahrirError> {
        let from_strs: Vec<String> = from.iter().map(|s| s.to_string()).collect();
        // Unpublish (published -> approved) clears the published URL.
        let clear_published_url =
            to == NewsStatus::Approved && from.contains(&NewsStatus::Published);
        let row = sqlx::query(
            r#"
            UPDATE articles
            SET status = $3,
                published_at = CASE WHEN $3 = 'published' THEN now() ELSE published_at END,
                published_url = CASE WHEN $4 THEN NULL ELSE published_url END,
                updated_at = now()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&from_strs)
        .bind(to.to_string())
        .bind(clear_published_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| article_from_row(&r).map_err(db_err)).transpose()
    }

    /// Copy an applied draft's content into the owning article.
    pub async fn apply_draft_content(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        article_id: i64,
        title: &str,
        body: &str,
    ) -> Result<(), TahrirError> {
        sqlx::query(
            r#"
            UPDATE articles
            SET title_ar = $2, original_content = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(article_id)
        .bind(title)
        .bind(body)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Actionable breaking articles: young enough, still in the triage
    /// half of the pipeline.
    pub async fn breaking(&self, ttl_minutes: i64) -> Result<Vec<Article>, TahrirError> {
        let cutoff = Utc::now() - Duration::minutes(ttl_minutes.max(1));
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE is_breaking = TRUE
              AND status IN ('new', 'classified', 'candidate')
              AND crawled_at >= $1
            ORDER BY crawled_at DESC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| article_from_row(r).map_err(db_err))
            .collect()
    }

    /// Filtered, sorted article listing for the dashboard boundary.
    pub async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>, TahrirError> {
        let mut qb = sqlx::QueryBuilder::<Postgres>::new("SELECT * FROM articles WHERE 1=1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(is_breaking) = filter.is_breaking {
            qb.push(" AND is_breaking = ").push_bind(is_breaking);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.trim());
            qb.push(" AND (original_title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR coalesce(title_ar, '') ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(max_age_hours) = filter.max_age_hours {
            let cutoff = Utc::now() - Duration::hours(max_age_hours.max(1));
            qb.push(" AND crawled_at >= ").push_bind(cutoff);
        }

        qb.push(" ORDER BY ");
        if filter.local_first {
            qb.push(LOCAL_PRIORITY_EXPR);
            qb.push(" DESC, ");
        }
        qb.push(filter.sort.column());
        qb.push(" DESC NULLS LAST LIMIT ");
        qb.push_bind(if filter.limit > 0 { filter.limit } else { 50 });
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset.max(0));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter()
            .map(|r| article_from_row(r).map_err(db_err))
            .collect()
    }

    /// Articles awaiting the Scribe.
    pub async fn approved_for_drafting(&self, limit: i64) -> Result<Vec<Article>, TahrirError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE status IN ('approved_handoff', 'approved')
            ORDER BY updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| article_from_row(r).map_err(db_err))
            .collect()
    }

    pub async fn count_by_status(&self, status: NewsStatus) -> Result<i64, TahrirError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT count(*) FROM articles WHERE status = $1")
            .bind(status.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.0)
    }

    /// Mark urgency + breaking flag, used when a rule or the LLM flips an
    /// article to breaking outside a router transaction.
    pub async fn mark_breaking(&self, id: i64) -> Result<(), TahrirError> {
        sqlx::query(
            "UPDATE articles SET is_breaking = TRUE, urgency = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(UrgencyLevel::Breaking.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
