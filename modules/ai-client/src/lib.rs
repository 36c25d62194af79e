//! LLM capability boundary. Agents depend on the [`LlmClient`] trait;
//! the concrete Claude-backed client lives behind it so vendors stay
//! swappable and tests stay offline.

pub mod claude;
pub mod traits;
pub mod util;

pub use claude::ClaudeClient;
pub use traits::{AnalysisResult, LlmClient};
