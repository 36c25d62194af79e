//! Content fingerprinting and story clustering.
//!
//! Everything in this crate is pure computation over fingerprints and
//! candidate descriptors. Persistence of the resulting decisions lives in
//! `tahrir-store`; orchestration lives in the agents.

pub mod cluster;
pub mod fingerprint;
pub mod taxonomy;

pub use cluster::{
    classify_against_candidates, ClusterCandidate, ClusterDecision, RelationEdge,
    CANDIDATE_SCAN_LIMIT, CANDIDATE_WINDOW_DAYS, CLUSTER_SCORE_THRESHOLD,
    DUPLICATE_SCORE_THRESHOLD,
};
pub use fingerprint::{combined_score, fingerprint, hamming_ratio, jaccard, Fingerprint};
pub use taxonomy::{select_taxonomy, taxonomy_scores};
