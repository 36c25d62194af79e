//! Row-to-domain mapping helpers. Domain types live in `tahrir-common`
//! (which is sqlx-free), so decoding happens here instead of via derived
//! `FromRow`.

use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::Row;
use tahrir_common::{
    Article, ArticleFingerprint, ArticleQualityReport, ArticleRelation, Credibility,
    DraftStatus, EditorDecision, EditorialDraft, FetchMethod, NewsCategory, NewsStatus,
    PipelineRun, RelationType, Source, SourceType, StoryCluster, UrgencyLevel,
};

/// Decode a TEXT column through `FromStr`, surfacing bad values as decode
/// errors rather than panics.
pub fn parse_col<T>(row: &PgRow, col: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(col)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: format!("{e}").into(),
    })
}

fn parse_col_opt<T>(row: &PgRow, col: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = row.try_get(col)?;
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: col.to_string(),
                source: format!("{e}").into(),
            }),
    }
}

fn json_string_vec(row: &PgRow, col: &str) -> Result<Vec<String>, sqlx::Error> {
    let value: serde_json::Value = row.try_get(col)?;
    Ok(value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

pub fn article_from_row(row: &PgRow) -> Result<Article, sqlx::Error> {
    Ok(Article {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        source_name: row.try_get("source_name")?,
        original_url: row.try_get("original_url")?,
        original_title: row.try_get("original_title")?,
        original_content: row.try_get("original_content")?,
        title_ar: row.try_get("title_ar")?,
        summary: row.try_get("summary")?,
        category: parse_col_opt::<NewsCategory>(row, "category")?,
        importance_score: row.try_get("importance_score")?,
        urgency: parse_col::<UrgencyLevel>(row, "urgency")?,
        is_breaking: row.try_get("is_breaking")?,
        status: parse_col::<NewsStatus>(row, "status")?,
        unique_hash: row.try_get("unique_hash")?,
        trace_id: row.try_get("trace_id")?,
        rejection_reason: row.try_get("rejection_reason")?,
        entities: json_string_vec(row, "entities")?,
        keywords: json_string_vec(row, "keywords")?,
        published_url: row.try_get("published_url")?,
        published_at: row.try_get("published_at")?,
        crawled_at: row.try_get("crawled_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn source_from_row(row: &PgRow) -> Result<Source, sqlx::Error> {
    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        rss_url: row.try_get("rss_url")?,
        method: parse_col::<FetchMethod>(row, "method")?,
        priority: row.try_get("priority")?,
        credibility: parse_col::<Credibility>(row, "credibility")?,
        source_type: parse_col::<SourceType>(row, "source_type")?,
        language: row.try_get("language")?,
        enabled: row.try_get("enabled")?,
        error_count: row.try_get("error_count")?,
        last_fetched_at: row.try_get("last_fetched_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn fingerprint_from_row(row: &PgRow) -> Result<ArticleFingerprint, sqlx::Error> {
    Ok(ArticleFingerprint {
        article_id: row.try_get("article_id")?,
        simhash: row.try_get("simhash")?,
        shingles: json_string_vec(row, "shingles")?,
        token_count: row.try_get("token_count")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn cluster_from_row(row: &PgRow) -> Result<StoryCluster, sqlx::Error> {
    Ok(StoryCluster {
        id: row.try_get("id")?,
        cluster_key: row.try_get("cluster_key")?,
        label: row.try_get("label")?,
        category: parse_col_opt::<NewsCategory>(row, "category")?,
        geography: row.try_get("geography")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn relation_from_row(row: &PgRow) -> Result<ArticleRelation, sqlx::Error> {
    Ok(ArticleRelation {
        id: row.try_get("id")?,
        from_article_id: row.try_get("from_article_id")?,
        to_article_id: row.try_get("to_article_id")?,
        relation_type: parse_col::<RelationType>(row, "relation_type")?,
        score: row.try_get("score")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn draft_from_row(row: &PgRow) -> Result<EditorialDraft, sqlx::Error> {
    Ok(EditorialDraft {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        work_id: row.try_get("work_id")?,
        version: row.try_get("version")?,
        source_action: row.try_get("source_action")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        status: parse_col::<DraftStatus>(row, "status")?,
        parent_draft_id: row.try_get("parent_draft_id")?,
        change_origin: row.try_get("change_origin")?,
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn decision_from_row(row: &PgRow) -> Result<EditorDecision, sqlx::Error> {
    Ok(EditorDecision {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        editor: row.try_get("editor")?,
        decision: row.try_get("decision")?,
        reason: row.try_get("reason")?,
        title_before: row.try_get("title_before")?,
        title_after: row.try_get("title_after")?,
        body_before: row.try_get("body_before")?,
        body_after: row.try_get("body_after")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn quality_report_from_row(row: &PgRow) -> Result<ArticleQualityReport, sqlx::Error> {
    Ok(ArticleQualityReport {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        stage: row.try_get("stage")?,
        passed: row.try_get("passed")?,
        score: row.try_get("score")?,
        blocking_reasons: json_string_vec(row, "blocking_reasons")?,
        actionable_fixes: json_string_vec(row, "actionable_fixes")?,
        report: row.try_get("report")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn pipeline_run_from_row(row: &PgRow) -> Result<PipelineRun, sqlx::Error> {
    Ok(PipelineRun {
        id: row.try_get("id")?,
        run_type: row.try_get("run_type")?,
        status: row.try_get("status")?,
        total_items: row.try_get("total_items")?,
        new_items: row.try_get("new_items")?,
        duplicates: row.try_get("duplicates")?,
        errors: row.try_get("errors")?,
        details: row.try_get("details")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

pub fn string_vec_json(values: &[String]) -> serde_json::Value {
    serde_json::Value::Array(
        values
            .iter()
            .map(|s| serde_json::Value::String(s.clone()))
            .collect(),
    )
}
