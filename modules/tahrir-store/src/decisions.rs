use sqlx::PgPool;
use tahrir_common::{EditorDecision, TahrirError};

use crate::db_err;
use crate::row::decision_from_row;

/// Append-only record of human editorial decisions. Rows are never
/// updated; the before/after snapshots feed diff-based feedback logs.
#[derive(Clone)]
pub struct DecisionStore {
    pool: PgPool,
}

/// Decision fields supplied by the boundary.
#[derive(Debug, Clone, Default)]
pub struct NewDecision {
    pub article_id: i64,
    pub editor: String,
    pub decision: String,
    pub reason: Option<String>,
    pub title_before: Option<String>,
    pub title_after: Option<String>,
    pub body_before: Option<String>,
    pub body_after: Option<String>,
}

impl DecisionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, new: &NewDecision) -> Result<EditorDecision, TahrirError> {
        let row = sqlx::query(
            r#"
            INSERT INTO editor_decisions
                (article_id, editor, decision, reason,
                 title_before, title_after, body_before, body_after)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.article_id)
        .bind(&new.editor)
        .bind(&new.decision)
        .bind(&new.reason)
        .bind(&new.title_before)
        .bind(&new.title_after)
        .bind(&new.body_before)
        .bind(&new.body_after)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        decision_from_row(&row).map_err(db_err)
    }

    pub async fn list_for_article(
        &self,
        article_id: i64,
    ) -> Result<Vec<EditorDecision>, TahrirError> {
        let rows = sqlx::query(
            "SELECT * FROM editor_decisions WHERE article_id = $1 ORDER BY created_at ASC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| decision_from_row(r).map_err(db_err))
            .collect()
    }
}
