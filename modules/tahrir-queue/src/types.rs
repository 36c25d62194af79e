//! Queue domain types: job records, tagged payloads, run-progress events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable job lifecycle. `Completed`, `Failed`, and `DeadLettered` are
/// terminal; a job never leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    DeadLettered,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::DeadLettered
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::DeadLettered => "dead_lettered",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "dead_lettered" => Ok(Self::DeadLettered),
            other => Err(format!("unknown JobStatus: {other}")),
        }
    }
}

/// Tagged job payload. Handlers dispatch over the tag; collaborator job
/// types ride through as opaque `External` bodies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum JobPayload {
    PipelineScout {
        trigger: String,
    },
    PipelineRouter {
        trigger: String,
    },
    PipelineScribe {
        trigger: String,
    },
    TrendsScan {
        geo: String,
        category: String,
        limit: u32,
        mode: String,
    },
    PublishedMonitorScan {
        feed_url: Option<String>,
        limit: Option<i64>,
    },
    EditorialRewrite {
        article_id: i64,
        work_id: Option<String>,
        mode: String,
        instruction: String,
    },
    /// Collaborator-owned job (competitor x-ray, simulator, MSI, ...).
    External {
        job_type: String,
        payload: serde_json::Value,
    },
}

impl JobPayload {
    pub fn job_type(&self) -> String {
        match self {
            JobPayload::PipelineScout { .. } => "pipeline_scout".to_string(),
            JobPayload::PipelineRouter { .. } => "pipeline_router".to_string(),
            JobPayload::PipelineScribe { .. } => "pipeline_scribe".to_string(),
            JobPayload::TrendsScan { .. } => "trends_scan".to_string(),
            JobPayload::PublishedMonitorScan { .. } => "published_monitor_scan".to_string(),
            JobPayload::EditorialRewrite { .. } => "editorial_rewrite".to_string(),
            JobPayload::External { job_type, .. } => job_type.clone(),
        }
    }

    /// Queue routing: each job type maps to one named queue.
    pub fn queue_name(&self) -> &'static str {
        match self {
            JobPayload::PipelineScout { .. } | JobPayload::PipelineRouter { .. } => "ai_router",
            JobPayload::PipelineScribe { .. } => "ai_scribe",
            JobPayload::TrendsScan { .. } => "ai_trends",
            JobPayload::PublishedMonitorScan { .. } | JobPayload::EditorialRewrite { .. } => {
                "ai_quality"
            }
            JobPayload::External { .. } => "ai_external",
        }
    }
}

/// Envelope persisted to `payload_json`: the tagged payload plus an
/// optional idempotency key for burst collapsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(flatten)]
    pub payload: JobPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Durable record of one enqueued unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: Uuid,
    pub job_type: String,
    pub queue_name: String,
    pub entity_id: Option<String>,
    pub status: JobStatus,
    pub priority: String,
    pub attempt: i32,
    pub max_attempts: i32,
    pub payload_json: serde_json::Value,
    pub result_json: Option<serde_json::Value>,
    pub error: Option<String>,
    pub request_id: Option<String>,
    pub correlation_id: Option<String>,
    pub actor_user_id: Option<i64>,
    pub actor_username: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRun {
    pub fn envelope(&self) -> Result<JobEnvelope, serde_json::Error> {
        serde_json::from_value(self.payload_json.clone())
    }

    pub fn idempotency_key(&self) -> Option<String> {
        self.envelope().ok().and_then(|e| e.idempotency_key)
    }
}

/// Permanent forensic record of a terminal failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterJob {
    pub id: i64,
    pub original_job_id: Uuid,
    pub job_type: String,
    pub queue_name: String,
    pub error: String,
    pub traceback: Option<String>,
    pub payload_json: serde_json::Value,
    pub meta_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Per-node progress event for long-running orchestrated jobs. Terminal
/// event types are `completed` and `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub id: i64,
    pub run_id: String,
    pub node: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub ts: DateTime<Utc>,
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self.event_type.as_str(), "completed" | "failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_as_tagged_json() {
        let payload = JobPayload::TrendsScan {
            geo: "DZ".to_string(),
            category: "all".to_string(),
            limit: 10,
            mode: "fast".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "trends_scan");
        assert_eq!(json["body"]["geo"], "DZ");
        let back: JobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn envelope_preserves_idempotency_key() {
        let envelope = JobEnvelope {
            payload: JobPayload::PipelineRouter {
                trigger: "auto_pipeline".to_string(),
            },
            idempotency_key: Some("pipeline_router:auto:42".to_string()),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        let back: JobEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(
            back.idempotency_key.as_deref(),
            Some("pipeline_router:auto:42")
        );
    }

    #[test]
    fn external_payloads_keep_their_job_type() {
        let payload = JobPayload::External {
            job_type: "msi_run".to_string(),
            payload: serde_json::json!({"run_id": "r-1"}),
        };
        assert_eq!(payload.job_type(), "msi_run");
        assert_eq!(payload.queue_name(), "ai_external");
    }

    #[test]
    fn terminal_statuses_are_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::DeadLettered.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
