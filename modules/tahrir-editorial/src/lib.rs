//! Editorial draft state machine: versioned drafts with optimistic
//! concurrency, human decision capture, quality-gate reports, and the
//! article review ladder from candidate to published.

pub mod gates;
pub mod sanitize;
pub mod smart_editor;
pub mod transitions;
pub mod workspace;

pub use gates::{
    fact_check_report, guardian_report, readability_report, seo_technical_report, QualityGates,
};
pub use sanitize::{build_diff, html_to_text, sanitize_html, DiffStats};
pub use smart_editor::SmartEditor;
pub use transitions::transition_allowed;
pub use workspace::EditorialWorkspace;
