//! Near-duplicate detection, cluster assignment, and relation inference.
//!
//! The incoming article is compared against a candidate window (callers
//! scan articles from the last 14 days, newest first, capped at 1000) and
//! the outcome is a pure [`ClusterDecision`] plus zero or more
//! [`RelationEdge`]s for the store to upsert.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tahrir_common::{normalize_text, RelationType};

use crate::fingerprint::{combined_score, tokens, Fingerprint};

pub const DUPLICATE_SCORE_THRESHOLD: f64 = 0.84;
pub const CLUSTER_SCORE_THRESHOLD: f64 = 0.68;
pub const ENTITY_CLUSTER_MIN_SHARED: usize = 2;
pub const ENTITY_CLUSTER_MAX_HOURS: i64 = 48;
pub const RELATION_MIN_SCORE: f64 = 0.70;
/// Relation inference is capped to the strongest candidates.
pub const RELATION_CANDIDATE_LIMIT: usize = 20;
/// Candidate scan window and cap, applied by the caller's query.
pub const CANDIDATE_WINDOW_DAYS: i64 = 14;
pub const CANDIDATE_SCAN_LIMIT: i64 = 1000;

const SEQUENCE_TERMS: &[&str] = &[
    "تأجيل",
    "استكمال",
    "ردود",
    "متابعة",
    "update",
    "follow-up",
    "suite",
    "poursuite",
];

const IMPACT_TERMS: &[&str] = &[
    "تأثير",
    "انعكاس",
    "أسعار",
    "تضخم",
    "impact",
    "effet",
    "prix",
    "inflation",
];

const CONTRAST_TERMS: &[&str] = &[
    "نفي",
    "تكذيب",
    "ينفي",
    "dément",
    "denies",
    "refute",
    "démenti",
];

/// A prior article inside the comparison window.
#[derive(Debug, Clone)]
pub struct ClusterCandidate {
    pub article_id: i64,
    pub fingerprint: Fingerprint,
    pub entities: HashSet<String>,
    /// Title + summary text, used for relation term matching.
    pub text: String,
    pub crawled_at: DateTime<Utc>,
}

/// Where the incoming article lands.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterDecision {
    /// Near-duplicate of `anchor_id`: join its cluster and record a
    /// `duplicate_variant` relation.
    Duplicate { anchor_id: i64, score: f64 },
    /// Same story, different coverage: join the anchor's cluster.
    Join { anchor_id: i64, score: f64 },
    /// Nothing close enough — create a singleton cluster.
    Singleton,
}

/// A relation to upsert. Repeated inference keeps the max score.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEdge {
    pub to_article_id: i64,
    pub relation_type: RelationType,
    pub score: f64,
    pub shared_entities: Vec<String>,
}

/// Classify an incoming article against the candidate window.
pub fn classify_against_candidates(
    fingerprint: &Fingerprint,
    entities: &HashSet<String>,
    text: &str,
    crawled_at: DateTime<Utc>,
    candidates: &[ClusterCandidate],
) -> (ClusterDecision, Vec<RelationEdge>) {
    let mut best_dup: Option<(i64, f64)> = None;
    let mut best_cluster: Option<(i64, f64)> = None;
    let mut relation_candidates: Vec<(&ClusterCandidate, f64)> = Vec::new();

    for cand in candidates {
        let score = combined_score(fingerprint, &cand.fingerprint);

        let shared = entities.intersection(&cand.entities).count();
        let age_hours = (crawled_at - cand.crawled_at).num_hours().abs();
        let entity_signal =
            shared >= ENTITY_CLUSTER_MIN_SHARED && age_hours <= ENTITY_CLUSTER_MAX_HOURS;

        if score >= RELATION_MIN_SCORE {
            relation_candidates.push((cand, score));
        }

        if score >= DUPLICATE_SCORE_THRESHOLD {
            if best_dup.map_or(true, |(_, s)| score > s) {
                best_dup = Some((cand.article_id, score));
            }
        } else if score >= CLUSTER_SCORE_THRESHOLD || entity_signal {
            let cluster_score = if entity_signal {
                score.max(CLUSTER_SCORE_THRESHOLD)
            } else {
                score
            };
            if best_cluster.map_or(true, |(_, s)| cluster_score > s) {
                best_cluster = Some((cand.article_id, cluster_score));
            }
        }
    }

    relation_candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    relation_candidates.truncate(RELATION_CANDIDATE_LIMIT);
    let relations = infer_relations(entities, text, &relation_candidates);

    let decision = if let Some((anchor_id, score)) = best_dup {
        ClusterDecision::Duplicate { anchor_id, score }
    } else if let Some((anchor_id, score)) = best_cluster {
        ClusterDecision::Join { anchor_id, score }
    } else {
        ClusterDecision::Singleton
    };

    (decision, relations)
}

/// Classify edges for candidates that cleared [`RELATION_MIN_SCORE`].
fn infer_relations(
    entities: &HashSet<String>,
    text: &str,
    candidates: &[(&ClusterCandidate, f64)],
) -> Vec<RelationEdge> {
    let current_terms: HashSet<String> = tokens(&normalize_text(text)).into_iter().collect();
    let mut edges = Vec::new();

    for (cand, sim_score) in candidates {
        let shared: Vec<String> = entities
            .intersection(&cand.entities)
            .cloned()
            .collect();
        // Weak edges with no shared entities are noise below 0.80.
        if shared.is_empty() && *sim_score < 0.80 {
            continue;
        }

        let cand_terms: HashSet<String> =
            tokens(&normalize_text(&cand.text)).into_iter().collect();

        let current_has = |set: &[&str]| set.iter().any(|t| current_terms.contains(*t));
        let cand_has = |set: &[&str]| set.iter().any(|t| cand_terms.contains(*t));

        let (relation_type, score) = if !shared.is_empty()
            && (current_has(SEQUENCE_TERMS) || cand_has(SEQUENCE_TERMS))
        {
            (RelationType::Sequence, (sim_score + 0.08).min(1.0))
        } else if !shared.is_empty() && current_has(IMPACT_TERMS) {
            (RelationType::Impact, (sim_score + 0.06).min(1.0))
        } else if current_has(CONTRAST_TERMS) != cand_has(CONTRAST_TERMS) {
            (RelationType::Contrast, (sim_score + 0.05).min(1.0))
        } else {
            (RelationType::Related, *sim_score)
        };

        let mut shared_sorted = shared;
        shared_sorted.sort();
        shared_sorted.truncate(10);

        edges.push(RelationEdge {
            to_article_id: cand.article_id,
            relation_type,
            score,
            shared_entities: shared_sorted,
        });
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn cand(id: i64, text: &str, entities: &[&str], hours_ago: i64) -> ClusterCandidate {
        ClusterCandidate {
            article_id: id,
            fingerprint: fingerprint(text).unwrap(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            text: text.to_string(),
            crawled_at: Utc::now() - chrono::Duration::hours(hours_ago),
        }
    }

    fn entities(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn near_duplicate_joins_anchor_with_duplicate_relation() {
        let text = "الرئيس يعلن قرارات سيادية هامة بخصوص قطاع الطاقة والمحروقات في الجزائر اليوم";
        let fp = fingerprint(text).unwrap();
        let candidates = vec![cand(
            7,
            "الرئيس يعلن قرارات سيادية هامة بخصوص قطاع الطاقة والمحروقات في الجزائر",
            &[],
            2,
        )];

        let (decision, relations) =
            classify_against_candidates(&fp, &HashSet::new(), text, Utc::now(), &candidates);

        match decision {
            ClusterDecision::Duplicate { anchor_id, score } => {
                assert_eq!(anchor_id, 7);
                assert!(score >= DUPLICATE_SCORE_THRESHOLD);
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        // Above 0.70 it also produces a relation edge.
        assert!(!relations.is_empty());
    }

    #[test]
    fn shared_entities_within_window_join_cluster() {
        let text = "اجتماع حكومي لمناقشة ملف الصادرات خارج المحروقات والدعم الفلاحي الجديد";
        let fp = fingerprint(text).unwrap();
        let candidates = vec![cand(
            3,
            "وزارة الفلاحة تكشف برنامج دعم المستثمرين في الجنوب الكبير هذا الموسم",
            &["سوناطراك", "وزارة الفلاحة"],
            12,
        )];

        let (decision, _) = classify_against_candidates(
            &fp,
            &entities(&["سوناطراك", "وزارة الفلاحة", "بنك الجزائر"]),
            text,
            Utc::now(),
            &candidates,
        );

        assert!(matches!(decision, ClusterDecision::Join { anchor_id: 3, .. }));
    }

    #[test]
    fn shared_entities_outside_window_do_not_join() {
        let text = "اجتماع حكومي لمناقشة ملف الصادرات خارج المحروقات والدعم الفلاحي الجديد";
        let fp = fingerprint(text).unwrap();
        let candidates = vec![cand(
            3,
            "وزارة الفلاحة تكشف برنامج دعم المستثمرين في الجنوب الكبير هذا الموسم",
            &["سوناطراك", "وزارة الفلاحة"],
            ENTITY_CLUSTER_MAX_HOURS + 10,
        )];

        let (decision, _) = classify_against_candidates(
            &fp,
            &entities(&["سوناطراك", "وزارة الفلاحة"]),
            text,
            Utc::now(),
            &candidates,
        );

        assert_eq!(decision, ClusterDecision::Singleton);
    }

    #[test]
    fn unrelated_article_is_singleton() {
        let text = "المنتخب الوطني يفوز بالمباراة النهائية لكأس أفريقيا بهدفين نظيفين";
        let fp = fingerprint(text).unwrap();
        let candidates = vec![cand(
            9,
            "بنك الجزائر يحدد سعر الصرف الرسمي للدينار مقابل الأورو هذا الأسبوع",
            &[],
            5,
        )];

        let (decision, relations) =
            classify_against_candidates(&fp, &HashSet::new(), text, Utc::now(), &candidates);
        assert_eq!(decision, ClusterDecision::Singleton);
        assert!(relations.is_empty());
    }

    #[test]
    fn contrast_marker_on_one_side_yields_contrast_edge() {
        let base = "الوزارة تعلن رفع تسعيرة الوقود بداية من الشهر المقبل في كامل الولايات";
        let denial = "الوزارة تكذيب رفع تسعيرة الوقود بداية من الشهر المقبل في كامل الولايات";
        let fp = fingerprint(denial).unwrap();
        let candidates = vec![cand(4, base, &["الوزارة"], 3)];

        let (_, relations) = classify_against_candidates(
            &fp,
            &entities(&["الوزارة"]),
            denial,
            Utc::now(),
            &candidates,
        );

        let edge = relations.iter().find(|e| e.to_article_id == 4).unwrap();
        assert_eq!(edge.relation_type, RelationType::Contrast);
    }

    #[test]
    fn sequence_marker_with_shared_entities_yields_sequence_edge() {
        let base = "محاكمة المتهمين في قضية الفساد الكبرى تتواصل بالمحكمة العليا في العاصمة";
        let followup = "تأجيل محاكمة المتهمين في قضية الفساد الكبرى بالمحكمة العليا في العاصمة";
        let fp = fingerprint(followup).unwrap();
        let candidates = vec![cand(5, base, &["المحكمة العليا", "النيابة"], 20)];

        let (_, relations) = classify_against_candidates(
            &fp,
            &entities(&["المحكمة العليا", "النيابة"]),
            followup,
            Utc::now(),
            &candidates,
        );

        let edge = relations.iter().find(|e| e.to_article_id == 5).unwrap();
        assert_eq!(edge.relation_type, RelationType::Sequence);
        assert!(edge.score > 0.70);
    }
}
