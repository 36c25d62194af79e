use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tahrir_common::{cluster_key, Article, RelationType, StoryCluster, TahrirError};
use tahrir_knowledge::{ClusterCandidate, Fingerprint};
use tracing::info;

use crate::db_err;
use crate::row::{cluster_from_row, string_vec_json};

/// Persistence for fingerprints, story clusters, and article relations.
#[derive(Clone)]
pub struct KnowledgeStore {
    pool: PgPool,
}

impl KnowledgeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Exactly one fingerprint per article; re-processing overwrites.
    pub async fn upsert_fingerprint(
        &self,
        article_id: i64,
        fp: &Fingerprint,
    ) -> Result<(), TahrirError> {
        let shingles: Vec<String> = fp.shingles.iter().cloned().collect();
        sqlx::query(
            r#"
            INSERT INTO article_fingerprints (article_id, simhash, shingles, token_count, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (article_id) DO UPDATE SET
                simhash = EXCLUDED.simhash,
                shingles = EXCLUDED.shingles,
                token_count = EXCLUDED.token_count,
                updated_at = now()
            "#,
        )
        .bind(article_id)
        .bind(fp.simhash_signed())
        .bind(string_vec_json(&shingles))
        .bind(fp.token_count as i32)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Fingerprinted articles inside the comparison window, newest first.
    pub async fn load_candidates(
        &self,
        exclude_article_id: i64,
        window_days: i64,
        limit: i64,
    ) -> Result<Vec<ClusterCandidate>, TahrirError> {
        let cutoff = Utc::now() - Duration::days(window_days.max(1));
        let rows = sqlx::query(
            r#"
            SELECT f.article_id, f.simhash, f.shingles, f.token_count,
                   a.entities, a.crawled_at,
                   COALESCE(a.title_ar, a.original_title) AS title,
                   COALESCE(a.summary, '') AS summary
            FROM article_fingerprints f
            JOIN articles a ON a.id = f.article_id
            WHERE f.article_id <> $1 AND a.crawled_at >= $2
            ORDER BY a.crawled_at DESC
            LIMIT $3
            "#,
        )
        .bind(exclude_article_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|r| candidate_from_row(r).map_err(db_err))
            .collect()
    }

    async fn get_or_create_cluster(
        &self,
        key: &str,
        label: Option<&str>,
        category: Option<&str>,
        geography: &str,
    ) -> Result<StoryCluster, TahrirError> {
        let row = sqlx::query(
            r#"
            INSERT INTO story_clusters (cluster_key, label, category, geography)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cluster_key) DO UPDATE SET
                label = COALESCE(story_clusters.label, EXCLUDED.label),
                category = COALESCE(story_clusters.category, EXCLUDED.category),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(label.map(|l| truncate_label(l)))
        .bind(category)
        .bind(geography)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        cluster_from_row(&row).map_err(db_err)
    }

    /// Membership upsert. An article belongs to at most one cluster:
    /// re-classification moves it, same-cluster repeats keep the max score.
    pub async fn upsert_member(
        &self,
        cluster_id: i64,
        article_id: i64,
        score: f64,
    ) -> Result<(), TahrirError> {
        sqlx::query(
            r#"
            INSERT INTO story_cluster_members (cluster_id, article_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (article_id) DO UPDATE SET
                score = CASE
                    WHEN story_cluster_members.cluster_id = EXCLUDED.cluster_id
                    THEN GREATEST(story_cluster_members.score, EXCLUDED.score)
                    ELSE EXCLUDED.score
                END,
                cluster_id = EXCLUDED.cluster_id
            "#,
        )
        .bind(cluster_id)
        .bind(article_id)
        .bind(score.clamp(0.0, 1.0))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn cluster_id_of(&self, article_id: i64) -> Result<Option<i64>, TahrirError> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT cluster_id FROM story_cluster_members WHERE article_id = $1",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(|r| r.0))
    }

    /// Put `article` into a singleton cluster keyed on its own title.
    pub async fn ensure_singleton_cluster(&self, article: &Article) -> Result<i64, TahrirError> {
        let label = article
            .title_ar
            .clone()
            .unwrap_or_else(|| article.original_title.clone());
        let category = article
            .category
            .map(|c| c.to_string())
            .unwrap_or_else(|| "general".to_string());
        let key = cluster_key(&label, &category, article.crawled_at);
        let cluster = self
            .get_or_create_cluster(&key, Some(&label), Some(&category), "DZ")
            .await?;
        self.upsert_member(cluster.id, article.id, 1.0).await?;
        Ok(cluster.id)
    }

    /// Attach `article` to the anchor's cluster, creating one anchored on
    /// the anchor article if it has none yet.
    pub async fn attach_to_anchor_cluster(
        &self,
        article: &Article,
        anchor: &Article,
        score: f64,
    ) -> Result<i64, TahrirError> {
        let cluster_id = match self.cluster_id_of(anchor.id).await? {
            Some(id) => id,
            None => {
                let id = self.ensure_singleton_cluster(anchor).await?;
                info!(anchor_id = anchor.id, cluster_id = id, "Anchored new cluster");
                id
            }
        };
        self.upsert_member(cluster_id, article.id, score).await?;
        Ok(cluster_id)
    }

    /// Idempotent relation upsert: repeated inference keeps the max score
    /// and merges metadata.
    pub async fn upsert_relation(
        &self,
        from_article_id: i64,
        to_article_id: i64,
        relation_type: RelationType,
        score: f64,
        metadata: serde_json::Value,
    ) -> Result<(), TahrirError> {
        if from_article_id == to_article_id {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO article_relations
                (from_article_id, to_article_id, relation_type, score, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (from_article_id, to_article_id, relation_type) DO UPDATE SET
                score = GREATEST(article_relations.score, EXCLUDED.score),
                metadata = article_relations.metadata || EXCLUDED.metadata
            "#,
        )
        .bind(from_article_id)
        .bind(to_article_id)
        .bind(relation_type.to_string())
        .bind(score)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn relations_from(
        &self,
        article_id: i64,
    ) -> Result<Vec<tahrir_common::ArticleRelation>, TahrirError> {
        let rows = sqlx::query(
            "SELECT * FROM article_relations WHERE from_article_id = $1 ORDER BY score DESC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| crate::row::relation_from_row(r).map_err(db_err))
            .collect()
    }
}

fn truncate_label(label: &str) -> String {
    tahrir_common::normalize_text(label)
        .chars()
        .take(256)
        .collect()
}

fn candidate_from_row(row: &PgRow) -> Result<ClusterCandidate, sqlx::Error> {
    let simhash: i64 = row.try_get("simhash")?;
    let shingles_json: serde_json::Value = row.try_get("shingles")?;
    let shingles: Vec<String> = shingles_json
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let token_count: i32 = row.try_get("token_count")?;
    let entities_json: serde_json::Value = row.try_get("entities")?;
    let entities = entities_json
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_lowercase()))
                .collect()
        })
        .unwrap_or_default();
    let title: String = row.try_get("title")?;
    let summary: String = row.try_get("summary")?;
    let crawled_at: DateTime<Utc> = row.try_get("crawled_at")?;

    Ok(ClusterCandidate {
        article_id: row.try_get("article_id")?,
        fingerprint: Fingerprint::from_signed(simhash, shingles, token_count as usize),
        entities,
        text: format!("{title} {summary}"),
        crawled_at,
    })
}
