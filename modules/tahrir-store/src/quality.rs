use sqlx::PgPool;
use tahrir_common::{ArticleQualityReport, TahrirError};

use crate::db_err;
use crate::row::{quality_report_from_row, string_vec_json};

/// Per-stage quality reports. Append-only from the caller's view, except
/// that re-running a stage upserts when `latest_wins` is set.
#[derive(Clone)]
pub struct QualityReportStore {
    pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct NewQualityReport {
    pub article_id: i64,
    pub stage: String,
    pub passed: bool,
    pub score: i32,
    pub blocking_reasons: Vec<String>,
    pub actionable_fixes: Vec<String>,
    pub report: serde_json::Value,
    pub created_by: Option<String>,
}

impl QualityReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save(
        &self,
        new: &NewQualityReport,
        latest_wins: bool,
    ) -> Result<ArticleQualityReport, TahrirError> {
        let conflict_action = if latest_wins {
            r#"DO UPDATE SET
                passed = EXCLUDED.passed,
                score = EXCLUDED.score,
                blocking_reasons = EXCLUDED.blocking_reasons,
                actionable_fixes = EXCLUDED.actionable_fixes,
                report = EXCLUDED.report,
                created_by = EXCLUDED.created_by,
                updated_at = now()"#
        } else {
            "DO NOTHING"
        };

        let sql = format!(
            r#"
            INSERT INTO article_quality_reports
                (article_id, stage, passed, score, blocking_reasons, actionable_fixes,
                 report, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (article_id, stage) {conflict_action}
            RETURNING *
            "#
        );

        let row = sqlx::query(&sql)
            .bind(new.article_id)
            .bind(&new.stage)
            .bind(new.passed)
            .bind(new.score)
            .bind(string_vec_json(&new.blocking_reasons))
            .bind(string_vec_json(&new.actionable_fixes))
            .bind(&new.report)
            .bind(&new.created_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(r) => quality_report_from_row(&r).map_err(db_err),
            // DO NOTHING hit an existing row; return the stored report.
            None => self
                .get(new.article_id, &new.stage)
                .await?
                .ok_or_else(|| TahrirError::NotFound("quality report".to_string())),
        }
    }

    pub async fn get(
        &self,
        article_id: i64,
        stage: &str,
    ) -> Result<Option<ArticleQualityReport>, TahrirError> {
        let row = sqlx::query(
            "SELECT * FROM article_quality_reports WHERE article_id = $1 AND stage = $2",
        )
        .bind(article_id)
        .bind(stage)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| quality_report_from_row(&r).map_err(db_err))
            .transpose()
    }

    pub async fn list_for_article(
        &self,
        article_id: i64,
    ) -> Result<Vec<ArticleQualityReport>, TahrirError> {
        let rows = sqlx::query(
            "SELECT * FROM article_quality_reports WHERE article_id = $1 ORDER BY updated_at DESC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| quality_report_from_row(r).map_err(db_err))
            .collect()
    }
}
