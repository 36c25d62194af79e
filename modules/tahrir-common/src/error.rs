use thiserror::Error;

#[derive(Error, Debug)]
pub enum TahrirError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Feed fetch error: {0}")]
    Feed(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Draft version conflict: expected {expected}, got {actual}")]
    VersionConflict { expected: i32, actual: i32 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Queue {queue} overloaded: depth {depth} >= limit {limit}")]
    QueueOverloaded {
        queue: String,
        depth: i64,
        limit: i64,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Discriminates LLM classification failures so callers can choose between
/// retrying (transport) and degrading to rule-based defaults (parse).
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM response parse error: {0}")]
    Parse(String),
}

impl ClassificationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassificationError::Transport(_))
    }
}
