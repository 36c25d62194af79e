//! Editorial workspace operations: decisions, handoff, draft lifecycle.
//!
//! Every state transition is persisted before a success response, and
//! every human decision appends an immutable `EditorDecision` row with
//! before/after snapshots.

use tahrir_common::{
    Article, DraftStatus, EditorialDraft, NewsStatus, TahrirError,
};
use tahrir_store::{
    ArticleStore, DecisionStore, DraftStore, NewDecision, NewDraftVersion,
};
use tracing::info;

use crate::sanitize::sanitize_html;
use crate::transitions::transition_allowed;

pub struct EditorialWorkspace {
    articles: ArticleStore,
    drafts: DraftStore,
    decisions: DecisionStore,
}

impl EditorialWorkspace {
    pub fn new(articles: ArticleStore, drafts: DraftStore, decisions: DecisionStore) -> Self {
        Self {
            articles,
            drafts,
            decisions,
        }
    }

    async fn require_article(&self, article_id: i64) -> Result<Article, TahrirError> {
        self.articles
            .get(article_id)
            .await?
            .ok_or_else(|| TahrirError::NotFound(format!("article {article_id}")))
    }

    /// Guarded transition + decision capture in one operation.
    async fn transition_with_decision(
        &self,
        article: &Article,
        to: NewsStatus,
        editor: &str,
        decision: &str,
        reason: Option<String>,
    ) -> Result<Article, TahrirError> {
        if !transition_allowed(article.status, to) {
            return Err(TahrirError::InvalidTransition {
                from: article.status.to_string(),
                to: to.to_string(),
            });
        }
        let updated = self
            .articles
            .transition_status(article.id, &[article.status], to)
            .await?
            .ok_or_else(|| TahrirError::InvalidTransition {
                from: article.status.to_string(),
                to: to.to_string(),
            })?;

        self.decisions
            .append(&NewDecision {
                article_id: article.id,
                editor: editor.to_string(),
                decision: decision.to_string(),
                reason,
                title_before: Some(article.original_title.clone()),
                title_after: updated.title_ar.clone(),
                ..Default::default()
            })
            .await?;

        info!(
            article_id = article.id,
            from = %article.status,
            to = %to,
            editor,
            "Editorial transition"
        );
        Ok(updated)
    }

    /// Editor approve: candidate/classified articles move to handoff.
    pub async fn approve(
        &self,
        article_id: i64,
        editor: &str,
        reason: Option<String>,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        self.transition_with_decision(&article, NewsStatus::ApprovedHandoff, editor, "approve", reason)
            .await
    }

    pub async fn reject(
        &self,
        article_id: i64,
        editor: &str,
        reason: Option<String>,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        self.transition_with_decision(&article, NewsStatus::Rejected, editor, "reject", reason)
            .await
    }

    /// Editor accepts the generated draft; the article advances to
    /// APPROVED.
    pub async fn accept_draft(
        &self,
        article_id: i64,
        editor: &str,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        self.transition_with_decision(&article, NewsStatus::Approved, editor, "process:accept_draft", None)
            .await
    }

    /// Policy gate outcome on an APPROVED article.
    pub async fn policy_gate(
        &self,
        article_id: i64,
        passed: bool,
        editor: &str,
        reason: Option<String>,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        let to = if passed {
            NewsStatus::ReadyForChiefApproval
        } else {
            NewsStatus::ApprovalRequestWithReservations
        };
        self.transition_with_decision(&article, to, editor, "process:policy_gate", reason)
            .await
    }

    pub async fn chief_approve(
        &self,
        article_id: i64,
        editor: &str,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        self.transition_with_decision(
            &article,
            NewsStatus::ReadyForManualPublish,
            editor,
            "process:chief_approve",
            None,
        )
        .await
    }

    /// Director publish: stamps `published_at`.
    pub async fn publish_now(
        &self,
        article_id: i64,
        editor: &str,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        self.transition_with_decision(&article, NewsStatus::Published, editor, "process:publish_now", None)
            .await
    }

    /// Director unpublish: back to APPROVED, `published_url` cleared.
    pub async fn unpublish(
        &self,
        article_id: i64,
        editor: &str,
        reason: Option<String>,
    ) -> Result<Article, TahrirError> {
        let article = self.require_article(article_id).await?;
        self.transition_with_decision(&article, NewsStatus::Approved, editor, "process:unpublish", reason)
            .await
    }

    /// Create a manual draft version. Bodies are sanitized on the way in.
    pub async fn create_draft(
        &self,
        article_id: i64,
        work_id: Option<String>,
        title: &str,
        body_html: &str,
        source_action: &str,
        editor: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        self.require_article(article_id).await?;
        self.drafts
            .create_version(&NewDraftVersion {
                article_id,
                work_id,
                source_action: source_action.to_string(),
                title: title.to_string(),
                body: sanitize_html(body_html),
                parent_draft_id: None,
                change_origin: Some("manual".to_string()),
                created_by: editor.to_string(),
            })
            .await
    }

    /// Optimistic-concurrency draft edit.
    pub async fn update_draft(
        &self,
        draft_id: i64,
        expected_version: i32,
        title: &str,
        body_html: &str,
        editor: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        self.drafts
            .update_content(
                draft_id,
                expected_version,
                title,
                &sanitize_html(body_html),
                editor,
            )
            .await
    }

    /// Apply a draft: freeze it, copy its content into the article, log
    /// the decision. A second apply on the same work conflicts.
    pub async fn apply_draft(
        &self,
        draft_id: i64,
        editor: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        let draft = self
            .drafts
            .get(draft_id)
            .await?
            .ok_or_else(|| TahrirError::NotFound(format!("draft {draft_id}")))?;
        let article = self.require_article(draft.article_id).await?;

        let mut tx = self.articles.begin().await?;
        let applied = self.drafts.mark_applied(&mut tx, draft_id, editor).await?;
        self.articles
            .apply_draft_content(&mut tx, draft.article_id, &applied.title, &applied.body)
            .await?;
        tx.commit()
            .await
            .map_err(|e| TahrirError::Database(e.to_string()))?;

        self.decisions
            .append(&NewDecision {
                article_id: draft.article_id,
                editor: editor.to_string(),
                decision: "process:apply_draft".to_string(),
                reason: Some(format!("draft_id:{draft_id}")),
                title_before: article.title_ar.clone(),
                title_after: Some(applied.title.clone()),
                body_before: Some(article.original_content.clone()),
                body_after: Some(applied.body.clone()),
            })
            .await?;

        info!(draft_id, article_id = draft.article_id, version = applied.version, "Draft applied");
        Ok(applied)
    }

    /// Apply the latest live version of a work.
    pub async fn apply_draft_by_work_id(
        &self,
        work_id: &str,
        editor: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        let latest = self
            .drafts
            .latest_by_work(work_id)
            .await?
            .ok_or_else(|| TahrirError::NotFound(format!("work {work_id}")))?;
        if latest.status != DraftStatus::Draft {
            return Err(TahrirError::InvalidTransition {
                from: latest.status.to_string(),
                to: "applied".to_string(),
            });
        }
        self.apply_draft(latest.id, editor).await
    }

    pub async fn archive_draft(
        &self,
        draft_id: i64,
        editor: &str,
    ) -> Result<EditorialDraft, TahrirError> {
        self.drafts.mark_archived(draft_id, editor).await
    }

    pub async fn drafts_for_work(&self, work_id: &str) -> Result<Vec<EditorialDraft>, TahrirError> {
        self.drafts.list_by_work(work_id).await
    }
}
