use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Article lifecycle ---

/// Editorial pipeline status of an article. Terminal states are
/// `Rejected`, `Archived`, and `Published` (the last reversible by a
/// director unpublish).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsStatus {
    New,
    Classified,
    Candidate,
    ApprovedHandoff,
    DraftGenerated,
    Approved,
    ReadyForChiefApproval,
    ApprovalRequestWithReservations,
    ReadyForManualPublish,
    Published,
    Rejected,
    Archived,
}

impl NewsStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NewsStatus::Rejected | NewsStatus::Archived | NewsStatus::Published
        )
    }

    /// Whether an editor decision (approve/reject/rewrite) may be recorded
    /// against an article in this status.
    pub fn is_reviewable(self) -> bool {
        matches!(
            self,
            NewsStatus::Candidate | NewsStatus::Classified | NewsStatus::ApprovedHandoff
        )
    }
}

impl std::fmt::Display for NewsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NewsStatus::New => "new",
            NewsStatus::Classified => "classified",
            NewsStatus::Candidate => "candidate",
            NewsStatus::ApprovedHandoff => "approved_handoff",
            NewsStatus::DraftGenerated => "draft_generated",
            NewsStatus::Approved => "approved",
            NewsStatus::ReadyForChiefApproval => "ready_for_chief_approval",
            NewsStatus::ApprovalRequestWithReservations => "approval_request_with_reservations",
            NewsStatus::ReadyForManualPublish => "ready_for_manual_publish",
            NewsStatus::Published => "published",
            NewsStatus::Rejected => "rejected",
            NewsStatus::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NewsStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "classified" => Ok(Self::Classified),
            "candidate" => Ok(Self::Candidate),
            "approved_handoff" => Ok(Self::ApprovedHandoff),
            "draft_generated" => Ok(Self::DraftGenerated),
            "approved" => Ok(Self::Approved),
            "ready_for_chief_approval" => Ok(Self::ReadyForChiefApproval),
            "approval_request_with_reservations" => Ok(Self::ApprovalRequestWithReservations),
            "ready_for_manual_publish" => Ok(Self::ReadyForManualPublish),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown NewsStatus: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Politics,
    Economy,
    Sports,
    Technology,
    Health,
    Culture,
    Environment,
    Society,
    LocalAlgeria,
    International,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 10] = [
        NewsCategory::Politics,
        NewsCategory::Economy,
        NewsCategory::Sports,
        NewsCategory::Technology,
        NewsCategory::Health,
        NewsCategory::Culture,
        NewsCategory::Environment,
        NewsCategory::Society,
        NewsCategory::LocalAlgeria,
        NewsCategory::International,
    ];
}

impl std::fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NewsCategory::Politics => "politics",
            NewsCategory::Economy => "economy",
            NewsCategory::Sports => "sports",
            NewsCategory::Technology => "technology",
            NewsCategory::Health => "health",
            NewsCategory::Culture => "culture",
            NewsCategory::Environment => "environment",
            NewsCategory::Society => "society",
            NewsCategory::LocalAlgeria => "local_algeria",
            NewsCategory::International => "international",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NewsCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "politics" => Ok(Self::Politics),
            "economy" => Ok(Self::Economy),
            "sports" => Ok(Self::Sports),
            "technology" => Ok(Self::Technology),
            "health" => Ok(Self::Health),
            "culture" => Ok(Self::Culture),
            "environment" => Ok(Self::Environment),
            "society" => Ok(Self::Society),
            "local_algeria" => Ok(Self::LocalAlgeria),
            "international" => Ok(Self::International),
            other => Err(format!("unknown NewsCategory: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Breaking,
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Breaking => "breaking",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UrgencyLevel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "breaking" => Ok(Self::Breaking),
            other => Err(format!("unknown UrgencyLevel: {other}")),
        }
    }
}

// --- Sources ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Rss,
    Scrape,
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMethod::Rss => write!(f, "rss"),
            FetchMethod::Scrape => write!(f, "scrape"),
        }
    }
}

impl std::str::FromStr for FetchMethod {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rss" => Ok(Self::Rss),
            "scrape" => Ok(Self::Scrape),
            other => Err(format!("unknown FetchMethod: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credibility {
    Official,
    High,
    Medium,
    Low,
}

impl Credibility {
    /// Weight applied to the per-source item cap during ingestion.
    pub fn weight(self) -> f64 {
        match self {
            Credibility::Official => 1.3,
            Credibility::High => 1.15,
            Credibility::Medium => 1.0,
            Credibility::Low => 0.8,
        }
    }
}

impl std::str::FromStr for Credibility {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "official" => Ok(Self::Official),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown Credibility: {other}")),
        }
    }
}

impl std::fmt::Display for Credibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credibility::Official => write!(f, "official"),
            Credibility::High => write!(f, "high"),
            Credibility::Medium => write!(f, "medium"),
            Credibility::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Official,
    Agency,
    Media,
    Aggregator,
    Business,
    Tech,
}

impl SourceType {
    pub fn weight(self) -> f64 {
        match self {
            SourceType::Official => 1.2,
            SourceType::Agency => 1.1,
            SourceType::Media => 1.0,
            SourceType::Aggregator => 0.9,
            SourceType::Business => 1.0,
            SourceType::Tech => 1.0,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::Official => "official",
            SourceType::Agency => "agency",
            SourceType::Media => "media",
            SourceType::Aggregator => "aggregator",
            SourceType::Business => "business",
            SourceType::Tech => "tech",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "official" => Ok(Self::Official),
            "agency" => Ok(Self::Agency),
            "media" => Ok(Self::Media),
            "aggregator" => Ok(Self::Aggregator),
            "business" => Ok(Self::Business),
            "tech" => Ok(Self::Tech),
            other => Err(format!("unknown SourceType: {other}")),
        }
    }
}

/// A configured news source (RSS feed or scrape target).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub rss_url: Option<String>,
    pub method: FetchMethod,
    /// 1..=10, higher = more items allowed per run.
    pub priority: i32,
    pub credibility: Credibility,
    pub source_type: SourceType,
    /// BCP-47-ish language tag ("ar", "fr", "en").
    pub language: String,
    pub enabled: bool,
    pub error_count: i32,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn is_aggregator(&self) -> bool {
        self.source_type == SourceType::Aggregator
    }
}

// --- Articles ---

/// One ingested news item, identified globally by `unique_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub source_id: Option<i64>,
    pub source_name: String,
    pub original_url: String,
    pub original_title: String,
    pub original_content: String,
    /// Normalized Arabic headline, populated by Router or Scribe.
    pub title_ar: Option<String>,
    pub summary: Option<String>,
    pub category: Option<NewsCategory>,
    /// 0..=10.
    pub importance_score: i32,
    pub urgency: UrgencyLevel,
    pub is_breaking: bool,
    pub status: NewsStatus,
    /// Derived from (source, url, title); globally unique.
    pub unique_hash: String,
    pub trace_id: String,
    pub rejection_reason: Option<String>,
    pub entities: Vec<String>,
    pub keywords: Vec<String>,
    pub published_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub crawled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SimHash + shingle fingerprint; exactly one per article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleFingerprint {
    pub article_id: i64,
    /// Signed storage of an unsigned 64-bit SimHash.
    pub simhash: i64,
    /// Up to 128 two-gram shingles over normalized tokens.
    pub shingles: Vec<String>,
    pub token_count: i32,
    pub updated_at: DateTime<Utc>,
}

// --- Story clusters and relations ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryCluster {
    pub id: i64,
    /// Deterministic hash of anchor title + category + date bucket.
    pub cluster_key: String,
    pub label: Option<String>,
    pub category: Option<NewsCategory>,
    pub geography: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryClusterMember {
    pub cluster_id: i64,
    pub article_id: i64,
    /// Membership confidence in [0, 1].
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    DuplicateVariant,
    Sequence,
    Impact,
    Contrast,
    Related,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelationType::DuplicateVariant => "duplicate_variant",
            RelationType::Sequence => "sequence",
            RelationType::Impact => "impact",
            RelationType::Contrast => "contrast",
            RelationType::Related => "related",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RelationType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "duplicate_variant" => Ok(Self::DuplicateVariant),
            "sequence" => Ok(Self::Sequence),
            "impact" => Ok(Self::Impact),
            "contrast" => Ok(Self::Contrast),
            "related" => Ok(Self::Related),
            other => Err(format!("unknown RelationType: {other}")),
        }
    }
}

/// Directed edge between two articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRelation {
    pub id: i64,
    pub from_article_id: i64,
    pub to_article_id: i64,
    pub relation_type: RelationType,
    pub score: f64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// --- Editorial drafts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Applied,
    Archived,
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftStatus::Draft => write!(f, "draft"),
            DraftStatus::Applied => write!(f, "applied"),
            DraftStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "applied" => Ok(Self::Applied),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown DraftStatus: {other}")),
        }
    }
}

/// One revision of rewritten article content. All versions of a single
/// editorial work share a `work_id`; `(work_id, version)` is unique and
/// versions are gap-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorialDraft {
    pub id: i64,
    pub article_id: i64,
    pub work_id: String,
    pub version: i32,
    /// Label of the tool that produced this draft ("scribe", "rewrite", ...).
    pub source_action: String,
    pub title: String,
    /// Sanitized HTML.
    pub body: String,
    pub status: DraftStatus,
    pub parent_draft_id: Option<i64>,
    pub change_origin: Option<String>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable record of a human editorial decision on an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorDecision {
    pub id: i64,
    pub article_id: i64,
    pub editor: String,
    /// "approve", "reject", "rewrite", "process:<action>".
    pub decision: String,
    pub reason: Option<String>,
    pub title_before: Option<String>,
    pub title_after: Option<String>,
    pub body_before: Option<String>,
    pub body_after: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Quality-gate outcome for one stage of the editorial pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleQualityReport {
    pub id: i64,
    pub article_id: i64,
    pub stage: String,
    pub passed: bool,
    pub score: i32,
    pub blocking_reasons: Vec<String>,
    pub actionable_fixes: Vec<String>,
    pub report: serde_json::Value,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Pipeline runs ---

/// Durable record of one agent run (scout, router, ...), kept for the
/// dashboard and for run forensics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: i64,
    pub run_type: String,
    pub status: String,
    pub total_items: i32,
    pub new_items: i32,
    pub duplicates: i32,
    pub errors: i32,
    pub details: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// --- Trend detection ---

/// A cross-validated trend with optional LLM context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAlert {
    pub keyword: String,
    /// Which signal sets confirmed the keyword ("google_trends",
    /// "competitors", "rss_burst").
    pub source_signals: Vec<String>,
    /// 1..=10.
    pub strength: u8,
    pub reason: Option<String>,
    pub suggested_angles: Vec<String>,
    pub archive_matches: Vec<String>,
}

// --- Identity pass-through ---

/// Actor identity carried through queue operations and decisions. The core
/// does not enforce roles; it records who asked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

impl ActorIdentity {
    pub fn system() -> Self {
        Self {
            user_id: None,
            username: Some("system".to_string()),
        }
    }

    pub fn named(username: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: Some(username.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            NewsStatus::New,
            NewsStatus::Candidate,
            NewsStatus::ApprovedHandoff,
            NewsStatus::ReadyForManualPublish,
            NewsStatus::Published,
        ] {
            assert_eq!(NewsStatus::from_str(&s.to_string()).unwrap(), s);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(NewsStatus::Rejected.is_terminal());
        assert!(NewsStatus::Archived.is_terminal());
        assert!(NewsStatus::Published.is_terminal());
        assert!(!NewsStatus::Candidate.is_terminal());
    }

    #[test]
    fn urgency_ordering() {
        assert!(UrgencyLevel::Breaking > UrgencyLevel::High);
        assert!(UrgencyLevel::High > UrgencyLevel::Medium);
        assert!(UrgencyLevel::Medium > UrgencyLevel::Low);
    }

    #[test]
    fn category_parse_rejects_unknown() {
        assert!(NewsCategory::from_str("weather").is_err());
        assert_eq!(
            NewsCategory::from_str("local_algeria").unwrap(),
            NewsCategory::LocalAlgeria
        );
    }

    #[test]
    fn credibility_weights_are_ordered() {
        assert!(Credibility::Official.weight() > Credibility::High.weight());
        assert!(Credibility::High.weight() > Credibility::Medium.weight());
        assert!(Credibility::Medium.weight() > Credibility::Low.weight());
    }
}
