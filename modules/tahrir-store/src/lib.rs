//! Postgres stores for the editorial data model.
//!
//! The database is the durable source of truth: every state transition is
//! persisted before a success response. Row shapes follow `schema.sql`
//! (applied by operators; migration tooling is out of scope).

pub mod articles;
pub mod decisions;
pub mod drafts;
pub mod knowledge;
pub mod quality;
pub mod row;
pub mod runs;
pub mod sources;

pub use articles::{ArticleFilter, ArticleSort, ArticleStore, NewArticle};
pub use decisions::{DecisionStore, NewDecision};
pub use drafts::{DraftStore, NewDraftVersion};
pub use knowledge::KnowledgeStore;
pub use quality::{NewQualityReport, QualityReportStore};
pub use runs::PipelineRunStore;
pub use sources::SourceStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tahrir_common::TahrirError;

/// Connect a pool with production defaults.
pub async fn connect(database_url: &str) -> Result<PgPool, TahrirError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(db_err)
}

pub(crate) fn db_err(e: sqlx::Error) -> TahrirError {
    TahrirError::Database(e.to_string())
}

/// Postgres unique-violation SQLSTATE, used to classify insert races as
/// duplicates rather than failures.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
