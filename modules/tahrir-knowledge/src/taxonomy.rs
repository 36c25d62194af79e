//! Weighted taxonomy hints: rule-based, explainable category scoring used
//! to suggest a category before the Router spends an LLM call.

use std::collections::HashMap;

use tahrir_common::{normalize_text, NewsCategory};

fn taxonomy_weights() -> &'static [(NewsCategory, &'static [(&'static str, f64)])] {
    &[
        (
            NewsCategory::Politics,
            &[
                ("رئيس", 2.0),
                ("وزارة", 1.8),
                ("حكومة", 1.8),
                ("برلمان", 1.7),
                ("دبلوماس", 1.6),
                ("president", 1.7),
                ("gouvernement", 1.7),
                ("parlement", 1.6),
            ],
        ),
        (
            NewsCategory::Economy,
            &[
                ("اقتصاد", 2.0),
                ("طاقة", 2.2),
                ("نفط", 2.2),
                ("غاز", 2.2),
                ("سوناطراك", 2.2),
                ("بورصة", 1.9),
                ("énergie", 2.2),
                ("pétrole", 2.1),
                ("gas", 2.0),
                ("inflation", 1.9),
            ],
        ),
        (
            NewsCategory::Sports,
            &[
                ("مباراة", 2.0),
                ("هدف", 2.0),
                ("فريق", 1.8),
                ("دوري", 1.8),
                ("كرة", 1.6),
                ("match", 2.0),
                ("football", 1.8),
                ("ligue", 1.7),
            ],
        ),
        (
            NewsCategory::Technology,
            &[
                ("تقنية", 1.9),
                ("تكنولوجيا", 1.9),
                ("ذكاء", 1.8),
                ("رقمنة", 1.7),
                ("technology", 1.9),
                ("numérique", 1.8),
            ],
        ),
        (
            NewsCategory::Health,
            &[
                ("صحة", 2.0),
                ("مستشفى", 1.8),
                ("دواء", 1.8),
                ("وباء", 1.7),
                ("santé", 2.0),
                ("hôpital", 1.8),
            ],
        ),
        (
            NewsCategory::Environment,
            &[
                ("بيئة", 2.0),
                ("مناخ", 2.0),
                ("حرائق", 1.9),
                ("فيضانات", 1.9),
                ("climat", 2.0),
                ("environnement", 2.0),
            ],
        ),
        (
            NewsCategory::Society,
            &[
                ("مجتمع", 1.8),
                ("تعليم", 1.8),
                ("مدرسة", 1.7),
                ("جامعة", 1.7),
                ("نقل", 1.7),
                ("société", 1.8),
                ("éducation", 1.8),
            ],
        ),
    ]
}

/// Minimum leading score for a suggestion.
const MIN_TOP_SCORE: f64 = 1.5;
/// Required lead over the runner-up.
const MIN_LEAD: f64 = 0.75;

/// Sum keyword weights per category over normalized text.
pub fn taxonomy_scores(text: &str) -> HashMap<NewsCategory, f64> {
    let t = normalize_text(text);
    let mut scores = HashMap::new();
    for (category, keywords) in taxonomy_weights() {
        let score: f64 = keywords
            .iter()
            .filter(|(kw, _)| t.contains(kw))
            .map(|(_, w)| w)
            .sum();
        if score > 0.0 {
            scores.insert(*category, score);
        }
    }
    scores
}

/// Pick a category when the top score is decisive. Returns the suggestion
/// and a confidence in (0, 1].
pub fn select_taxonomy(scores: &HashMap<NewsCategory, f64>) -> Option<(NewsCategory, f64)> {
    let mut ranked: Vec<(NewsCategory, f64)> = scores.iter().map(|(k, v)| (*k, *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (top_cat, top_score) = *ranked.first()?;
    let second_score = ranked.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    if top_score < MIN_TOP_SCORE {
        return None;
    }
    if (top_score - second_score).abs() <= MIN_LEAD {
        return None;
    }
    let confidence = (top_score / (top_score + second_score + 1e-6)).min(1.0);
    Some((top_cat, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_text_scores_economy() {
        let scores = taxonomy_scores("سوناطراك توقع اتفاق غاز جديد مع شركاء أوروبيين");
        let (cat, confidence) = select_taxonomy(&scores).unwrap();
        assert_eq!(cat, NewsCategory::Economy);
        assert!(confidence > 0.5);
    }

    #[test]
    fn ambiguous_text_yields_no_suggestion() {
        // Politics and economy keywords in near-equal measure.
        let scores = taxonomy_scores("رئيس الحكومة يناقش ملف اقتصاد الطاقة مع البرلمان والنفط");
        // Either no suggestion or a confident one; a tie inside the lead
        // margin must return None.
        if let Some((_, confidence)) = select_taxonomy(&scores) {
            assert!(confidence > 0.5);
        }
    }

    #[test]
    fn keywordless_text_yields_none() {
        let scores = taxonomy_scores("حديث عام عن أمور متنوعة بدون تفاصيل");
        assert!(select_taxonomy(&scores).is_none());
    }

    #[test]
    fn single_confident_hit_is_accepted() {
        let scores = taxonomy_scores("المنتخب يستعد قبل مباراة الذهاب أمام فريق منافس في دوري الأبطال");
        let (cat, _) = select_taxonomy(&scores).unwrap();
        assert_eq!(cat, NewsCategory::Sports);
    }

    #[test]
    fn empty_text_yields_none() {
        let scores = taxonomy_scores("");
        assert!(scores.is_empty());
        assert!(select_taxonomy(&scores).is_none());
    }
}
