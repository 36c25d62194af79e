use sqlx::{PgPool, Postgres, Transaction};
use tahrir_common::{DraftStatus, EditorialDraft, TahrirError};
use uuid::Uuid;

use crate::row::draft_from_row;
use crate::{db_err, is_unique_violation};

/// Inputs for a new draft version. When `work_id` is `None` a fresh work
/// is started.
#[derive(Debug, Clone)]
pub struct NewDraftVersion {
    pub article_id: i64,
    pub work_id: Option<String>,
    pub source_action: String,
    pub title: String,
    pub body: String,
    pub parent_draft_id: Option<i64>,
    pub change_origin: Option<String>,
    pub created_by: String,
}

#[derive(Clone)]
pub struct DraftStore {
    pool: PgPool,
}

impl DraftStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn new_work_id() -> String {
        format!("work-{}", Uuid::new_v4().simple())
    }

    pub async fn get(&self, id: i64) -> Result<Option<EditorialDraft>, TahrirError> {
        let row = sqlx::query("SELECT * FROM editorial_drafts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| draft_from_row(&r).map_err(db_err)).transpose()
    }

    /// Latest version of a work, regardless of status.
    pub async fn latest_by_work(&self, work_id: &str) -> Result<Option<EditorialDraft>, TahrirError> {
        let row = sqlx::query(
            "SELECT * FROM editorial_drafts WHERE work_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(work_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| draft_from_row(&r).map_err(db_err)).transpose()
    }

    pub async fn list_by_work(&self, work_id: &str) -> Result<Vec<EditorialDraft>, TahrirError> {
        let rows = sqlx::query(
            "SELECT * FROM editorial_drafts WHERE work_id = $1 ORDER BY version ASC",
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(|r| draft_from_row(r).map_err(db_err)).collect()
    }

    pub async fn list_by_status(
        &self,
        status: DraftStatus,
        limit: i64,
    ) -> Result<Vec<EditorialDraft>, TahrirError> {
        let rows = sqlx::query(
            "SELECT * FROM editorial_drafts WHERE status = $1 ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(status.to_string())
        .bind(limit.clamp(1, 200))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(|r| draft_from_row(r).map_err(db_err)).collect()
    }

    /// Create the next version of a work: `version = max(existing) + 1`,
    /// status `draft`. The `(work_id, version)` unique constraint arbitrates
    /// concurrent creators; the loser retries once against the new max.
    pub async fn create_version(
        &self,
        new: &NewDraftVersion,
    ) -> Result<EditorialDraft, TahrirError> {
        let work_id = new
            .work_id
            .clone()
            .unwrap_or_else(Self::new_work_id);

        for attempt in 0..2 {
            let result = sqlx::query(
                r#"
                INSERT INTO editorial_drafts
                    (article_id, work_id, version, source_action, title, body, status,
                     parent_draft_id, change_origin, created_by)
                SELECT $1, $2,
                       COALESCE((SELECT MAX(version) FROM editorial_drafts WHERE work_id = $2), 0) + 1,
                       $3, $4, $5, 'draft', $6, $7, $8
                RETURNING *
                "#,
            )
            .bind(new.article_id)
            .bind(&work_id)
            .bind(&new.source_action)
            .bind(&new.title)
            .bind(&new.body)
            .bind(new.parent_draft_id)
            .bind(&new.change_origin)
            .bind(&new.created_by)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(row) => return draft_from_row(&row).map_err(db_err),
                Err(e) if is_unique_violation(&e) && attempt == 0 => continue,
                Err(e) => return Err(db_err(e)),
            }
        }
        Err(TahrirError::Database(
            "draft version allocation raced twice".to_string(),
        ))
    }

    /// Optimistic-concurrency content update. The caller supplies the
    /// version it edited; a mismatch is a 409-equivalent conflict. Success
    /// bumps the version in place.
    pub async fn update_content(
        &self,
        draft_id: i64,
        expected_version: i32,
        title: &str,
        body: &str,
        updated_by: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        let current = self
            .get(draft_id)
            .await?
            .ok_or_else(|| TahrirError::NotFound(format!("draft {draft_id}")))?;
        if current.status != DraftStatus::Draft {
            return Err(TahrirError::InvalidTransition {
                from: current.status.to_string(),
                to: "draft".to_string(),
            });
        }
        if current.version != expected_version {
            return Err(TahrirError::VersionConflict {
                expected: current.version,
                actual: expected_version,
            });
        }

        let row = sqlx::query(
            r#"
            UPDATE editorial_drafts
            SET title = $3, body = $4, version = version + 1,
                updated_by = $5, updated_at = now()
            WHERE id = $1 AND version = $2 AND status = 'draft'
            RETURNING *
            "#,
        )
        .bind(draft_id)
        .bind(expected_version)
        .bind(title)
        .bind(body)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(r) => draft_from_row(&r).map_err(db_err),
            // Lost the race between read and write.
            None => Err(TahrirError::VersionConflict {
                expected: expected_version + 1,
                actual: expected_version,
            }),
        }
    }

    /// Freeze a draft as `applied` inside the caller's transaction.
    /// Applying is exclusive per work: if any sibling version is already
    /// applied, or the draft left `draft` status, this conflicts.
    pub async fn mark_applied(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        draft_id: i64,
        updated_by: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        let row = sqlx::query(
            r#"
            UPDATE editorial_drafts d
            SET status = 'applied', updated_by = $2, updated_at = now()
            WHERE d.id = $1
              AND d.status = 'draft'
              AND NOT EXISTS (
                  SELECT 1 FROM editorial_drafts s
                  WHERE s.work_id = d.work_id AND s.status = 'applied'
              )
            RETURNING *
            "#,
        )
        .bind(draft_id)
        .bind(updated_by)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;

        match row {
            Some(r) => draft_from_row(&r).map_err(db_err),
            None => Err(TahrirError::InvalidTransition {
                from: "draft".to_string(),
                to: "applied".to_string(),
            }),
        }
    }

    pub async fn mark_archived(
        &self,
        draft_id: i64,
        updated_by: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        let row = sqlx::query(
            r#"
            UPDATE editorial_drafts
            SET status = 'archived', updated_by = $2, updated_at = now()
            WHERE id = $1 AND status = 'draft'
            RETURNING *
            "#,
        )
        .bind(draft_id)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(r) => draft_from_row(&r).map_err(db_err),
            None => Err(TahrirError::InvalidTransition {
                from: "draft".to_string(),
                to: "archived".to_string(),
            }),
        }
    }

    /// At least one live draft for an article; backs the invariant that a
    /// DRAFT_GENERATED article always has a draft.
    pub async fn has_live_draft(&self, article_id: i64) -> Result<bool, TahrirError> {
        let row = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS(SELECT 1 FROM editorial_drafts WHERE article_id = $1 AND status = 'draft')",
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.0)
    }
}
