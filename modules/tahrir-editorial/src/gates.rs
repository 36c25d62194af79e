//! Quality gates: readability, fact-check, and the composite editorial
//! score. Each gate produces a structured report row; re-running a stage
//! upserts with latest-wins.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tahrir_common::TahrirError;
use tahrir_store::{NewQualityReport, QualityReportStore};

use crate::sanitize::html_to_text;

const OPINION_WORDS_AR: [&str; 6] = [
    "فضيحة",
    "كارثة",
    "صادم",
    "مذهل",
    "مهزلة",
    "خطير جدا",
];

const CLAIM_TRIGGER_WORDS_AR: [&str; 7] = [
    "قال",
    "أعلن",
    "صرح",
    "أكد",
    "كشف",
    "ذكر",
    "نقل",
];

const ATTRIBUTION_RE_SRC: &str = "(قال|أعلن|بحسب|وفق|ذكرت|رويترز|الوزارة)";

fn sentence_split(text: &str) -> Vec<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[.!؟\n]+").unwrap());
    re.split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A gate outcome before persistence.
#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub stage: String,
    pub passed: bool,
    pub score: i32,
    pub blocking_reasons: Vec<String>,
    pub actionable_fixes: Vec<String>,
    pub report: serde_json::Value,
}

/// Readability and structure score over a draft (title + HTML body).
pub fn readability_report(title: &str, html: &str) -> GateOutcome {
    let text = html_to_text(html);
    let sentences = sentence_split(&text);
    let words = word_count(&text);
    let lengths: Vec<usize> = sentences.iter().map(|s| word_count(s)).collect();
    let avg_sentence = if lengths.is_empty() {
        0.0
    } else {
        lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    };

    let clarity = (100.0 - (avg_sentence - 20.0).max(0.0) * 4.0).clamp(0.0, 100.0) as i32;

    let html_lower = html.to_lowercase();
    let mut structure = if html_lower.contains("<h1") { 100 } else { 60 };
    if html_lower.contains("<h2") {
        structure = (structure + 15).min(100);
    }

    // Inverted pyramid: the lead should carry number/place/time signals.
    let lead = sentences.first().copied().unwrap_or("");
    let mut lead_score = 0;
    if lead.chars().any(|c| c.is_ascii_digit()) {
        lead_score += 25;
    }
    if ["في", "اليوم", "أمس"].iter().any(|w| lead.contains(w)) {
        lead_score += 25;
    }
    if word_count(lead) >= 12 {
        lead_score += 25;
    }
    if !title.is_empty() {
        lead_score += 25;
    }

    // Redundancy: repeated sentences cost 20 each.
    let mut seen = std::collections::HashSet::new();
    let duplicates = sentences
        .iter()
        .filter(|s| !seen.insert(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        .count();
    let redundancy = (100i32 - duplicates as i32 * 20).max(0);

    let length_score = if words < 140 {
        60
    } else if words > 700 {
        70
    } else {
        100
    };

    let opinion_hits = OPINION_WORDS_AR.iter().filter(|w| text.contains(*w)).count();
    let tone_neutrality = (100i32 - opinion_hits as i32 * 12).max(0);

    static ATTR_RE: OnceLock<Regex> = OnceLock::new();
    let attr_re = ATTR_RE.get_or_init(|| Regex::new(ATTRIBUTION_RE_SRC).unwrap());
    let citations = attr_re.find_iter(&text).count();
    let source_presence = ((citations * 20) as i32).min(100);

    let total = (clarity as f64 * 0.18
        + structure as f64 * 0.14
        + lead_score as f64 * 0.16
        + redundancy as f64 * 0.14
        + length_score as f64 * 0.12
        + tone_neutrality as f64 * 0.14
        + source_presence as f64 * 0.12) as i32;

    let mut fixes = Vec::new();
    if clarity < 75 {
        fixes.push("Split long sentences and simplify wording.".to_string());
    }
    if structure < 80 {
        fixes.push("Ensure one H1 and at least one H2 section.".to_string());
    }
    if lead_score < 70 {
        fixes.push("Strengthen lead paragraph with who/what/when/where.".to_string());
    }
    if source_presence < 60 {
        fixes.push("Add explicit source attribution.".to_string());
    }
    if tone_neutrality < 85 {
        fixes.push("Remove opinionated adjectives and keep neutral tone.".to_string());
    }

    let passed = total >= 70;
    GateOutcome {
        stage: "readability".to_string(),
        passed,
        score: total,
        blocking_reasons: if passed {
            Vec::new()
        } else {
            vec!["Quality score below publish threshold".to_string()]
        },
        actionable_fixes: fixes,
        report: serde_json::json!({
            "clarity": clarity,
            "structure": structure,
            "inverted_pyramid": lead_score,
            "redundancy": redundancy,
            "length_suitability": length_score,
            "tone_neutrality": tone_neutrality,
            "sources_attribution": source_presence,
            "word_count": words,
        }),
    }
}

/// One extracted checkable claim.
#[derive(Debug, Clone, Serialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    pub claim_type: String,
    pub confidence: f64,
    pub blocking: bool,
}

/// Sentence-level claim extraction: numbers, dates, statement verbs, and
/// quotes make a sentence checkable.
pub fn extract_claims(text: &str, source_url: Option<&str>) -> Vec<Claim> {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    let year_re = YEAR_RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

    sentence_split(text)
        .iter()
        .enumerate()
        .filter_map(|(idx, sentence)| {
            let has_number = sentence.chars().any(|c| c.is_ascii_digit());
            let has_date = year_re.is_match(sentence);
            let has_statement = CLAIM_TRIGGER_WORDS_AR.iter().any(|t| sentence.contains(t));
            let has_quote =
                sentence.contains('"') || sentence.contains('«') || sentence.contains('”');
            if !(has_number || has_date || has_statement || has_quote) {
                return None;
            }

            let claim_type = if has_number {
                "number"
            } else if has_date {
                "date"
            } else {
                "statement"
            };

            let mut confidence: f64 = 0.55;
            if has_statement {
                confidence += 0.15;
            }
            if has_quote {
                confidence += 0.10;
            }
            if has_number || has_date {
                confidence += 0.10;
            }
            if source_url.is_some() {
                confidence += 0.05;
            }
            let confidence = confidence.min(0.95f64);

            Some(Claim {
                id: format!("clm-{}", idx + 1),
                text: sentence.to_string(),
                claim_type: claim_type.to_string(),
                confidence,
                blocking: confidence < 0.70,
            })
        })
        .collect()
}

/// Fact-check gate: blocks when any claim sits under the threshold.
pub fn fact_check_report(text: &str, source_url: Option<&str>, threshold: f64) -> GateOutcome {
    let claims = extract_claims(text, source_url);
    let unresolved = claims.iter().filter(|c| c.confidence < threshold).count();
    let passed = unresolved == 0;

    GateOutcome {
        stage: "fact_check".to_string(),
        passed,
        score: (100i32 - unresolved as i32 * 20).max(0),
        blocking_reasons: if passed {
            Vec::new()
        } else {
            vec!["Unverified claims found".to_string()]
        },
        actionable_fixes: if passed {
            Vec::new()
        } else {
            vec!["Verify low-confidence claims before publish".to_string()]
        },
        report: serde_json::json!({
            "claims": claims,
            "threshold": threshold,
        }),
    }
}

/// SEO-technical audit of a draft: title band, heading structure,
/// link hygiene, keyword presence.
pub fn seo_technical_report(title: &str, html: &str, keywords: &[String]) -> GateOutcome {
    let text = html_to_text(html);
    let html_lower = html.to_lowercase();
    let mut score = 100i32;
    let mut reasons = Vec::new();
    let mut fixes = Vec::new();

    let title_chars = title.chars().count();
    if !(30..=70).contains(&title_chars) {
        score -= 15;
        reasons.push(format!("title length {title_chars} outside 30-70 band"));
        fixes.push("Rework the headline toward 30-70 characters.".to_string());
    }

    let h1_count = html_lower.matches("<h1").count();
    if h1_count != 1 {
        score -= 15;
        reasons.push(format!("{h1_count} H1 headings (exactly one expected)"));
        fixes.push("Keep exactly one H1.".to_string());
    }
    if !html_lower.contains("<h2") && text.split_whitespace().count() > 250 {
        score -= 10;
        fixes.push("Break long bodies with H2 sections.".to_string());
    }

    if html_lower.contains("href=\"http://") {
        score -= 10;
        reasons.push("insecure http links".to_string());
        fixes.push("Use https links only.".to_string());
    }

    if !keywords.is_empty() {
        let present = keywords
            .iter()
            .filter(|kw| !kw.is_empty() && (title.contains(kw.as_str()) || text.contains(kw.as_str())))
            .count();
        if present == 0 {
            score -= 10;
            reasons.push("no target keyword appears in title or body".to_string());
            fixes.push("Work at least one target keyword into the title.".to_string());
        }
    }

    let score = score.clamp(0, 100);
    let passed = score >= 70;
    GateOutcome {
        stage: "seo_technical".to_string(),
        passed,
        score,
        blocking_reasons: if passed { Vec::new() } else { reasons },
        actionable_fixes: fixes,
        report: serde_json::json!({
            "title_chars": title_chars,
            "h1_count": h1_count,
            "word_count": text.split_whitespace().count(),
        }),
    }
}

/// Guardian post-publish check: the live page should exist and still carry
/// the approved content. The caller fetches the page; this compares.
pub fn guardian_report(approved_title: &str, approved_text: &str, live_text: &str) -> GateOutcome {
    if live_text.trim().is_empty() {
        return GateOutcome {
            stage: "guardian".to_string(),
            passed: false,
            score: 0,
            blocking_reasons: vec!["published page unreachable or empty".to_string()],
            actionable_fixes: vec!["Verify the published URL resolves.".to_string()],
            report: serde_json::json!({ "live_chars": 0 }),
        };
    }

    let title_present = live_text.contains(approved_title.trim());
    let approved_words: Vec<&str> = approved_text.split_whitespace().collect();
    let sample: Vec<&str> = approved_words.iter().step_by(20).copied().collect();
    let matched = sample
        .iter()
        .filter(|w| w.chars().count() >= 4 && live_text.contains(**w))
        .count();
    let sampled = sample
        .iter()
        .filter(|w| w.chars().count() >= 4)
        .count()
        .max(1);
    let overlap = matched as f64 / sampled as f64;

    let mut score = (overlap * 80.0) as i32;
    if title_present {
        score += 20;
    }
    let score = score.clamp(0, 100);
    let passed = score >= 60;

    GateOutcome {
        stage: "guardian".to_string(),
        passed,
        score,
        blocking_reasons: if passed {
            Vec::new()
        } else {
            vec!["live content drifted from the approved draft".to_string()]
        },
        actionable_fixes: if passed {
            Vec::new()
        } else {
            vec!["Compare the live page against the approved version.".to_string()]
        },
        report: serde_json::json!({
            "title_present": title_present,
            "content_overlap": (overlap * 100.0).round() / 100.0,
            "live_chars": live_text.chars().count(),
        }),
    }
}

/// Persistence wrapper: runs gates and writes their reports.
pub struct QualityGates {
    reports: QualityReportStore,
}

impl QualityGates {
    pub fn new(reports: QualityReportStore) -> Self {
        Self { reports }
    }

    pub async fn run_readability(
        &self,
        article_id: i64,
        title: &str,
        html: &str,
        created_by: Option<&str>,
    ) -> Result<GateOutcome, TahrirError> {
        let outcome = readability_report(title, html);
        self.save(article_id, &outcome, created_by).await?;
        Ok(outcome)
    }

    pub async fn run_fact_check(
        &self,
        article_id: i64,
        text: &str,
        source_url: Option<&str>,
        created_by: Option<&str>,
    ) -> Result<GateOutcome, TahrirError> {
        let outcome = fact_check_report(text, source_url, 0.70);
        self.save(article_id, &outcome, created_by).await?;
        Ok(outcome)
    }

    pub async fn run_seo_technical(
        &self,
        article_id: i64,
        title: &str,
        html: &str,
        keywords: &[String],
        created_by: Option<&str>,
    ) -> Result<GateOutcome, TahrirError> {
        let outcome = seo_technical_report(title, html, keywords);
        self.save(article_id, &outcome, created_by).await?;
        Ok(outcome)
    }

    pub async fn run_guardian(
        &self,
        article_id: i64,
        approved_title: &str,
        approved_text: &str,
        live_text: &str,
        created_by: Option<&str>,
    ) -> Result<GateOutcome, TahrirError> {
        let outcome = guardian_report(approved_title, approved_text, live_text);
        self.save(article_id, &outcome, created_by).await?;
        Ok(outcome)
    }

    async fn save(
        &self,
        article_id: i64,
        outcome: &GateOutcome,
        created_by: Option<&str>,
    ) -> Result<(), TahrirError> {
        self.reports
            .save(
                &NewQualityReport {
                    article_id,
                    stage: outcome.stage.clone(),
                    passed: outcome.passed,
                    score: outcome.score,
                    blocking_reasons: outcome.blocking_reasons.clone(),
                    actionable_fixes: outcome.actionable_fixes.clone(),
                    report: outcome.report.clone(),
                    created_by: created_by.map(str::to_string),
                },
                true,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_factual_draft_passes_readability() {
        let html = "<h1>قرار جديد</h1>\
            <h2>التفاصيل</h2>\
            <p>أعلن الوزير اليوم في الجزائر عن برنامج دعم جديد يشمل 1200 مؤسسة ناشئة عبر الولايات.</p>\
            <p>وبحسب بيان الوزارة فإن البرنامج يمتد على ثلاث سنوات ويستهدف قطاعات التكنولوجيا والفلاحة.</p>\
            <p>وقال مصدر رسمي إن التمويل الأولي حدد بعشرة ملايير دينار وسيوزع على مراحل واضحة المعايير.</p>\
            <p>كما أكدت الوزارة أن منصة رقمية ستفتح أمام الراغبين في التسجيل بداية من الشهر المقبل.</p>\
            <p>وذكرت مصالح الولاية أن لجانا محلية سترافق أصحاب المشاريع في كل مرحلة من مراحل الإنجاز.</p>\
            <p>وأوضح البيان أن تقييما سنويا مستقلا سينشر للرأي العام حول نتائج البرنامج وأثره الاقتصادي.</p>";
        let outcome = readability_report("قرار جديد", html);
        assert!(outcome.passed, "score was {}", outcome.score);
        assert!(outcome.blocking_reasons.is_empty());
    }

    #[test]
    fn thin_sensational_draft_fails() {
        let html = "<p>فضيحة كارثة صادم مذهل</p>";
        let outcome = readability_report("", html);
        assert!(!outcome.passed);
        assert!(!outcome.actionable_fixes.is_empty());
    }

    #[test]
    fn claims_are_extracted_with_types() {
        let text = "أعلن الوزير عن 500 منصب جديد. الطقس جميل هذا الصباح. قال المصدر إن القرار نهائي.";
        let claims = extract_claims(text, Some("https://source.dz"));
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].claim_type, "number");
        assert_eq!(claims[1].claim_type, "statement");
    }

    #[test]
    fn strong_claims_pass_fact_check() {
        let text = "أعلن الوزير عن 500 منصب جديد بحسب بيان رسمي.";
        let outcome = fact_check_report(text, Some("https://source.dz"), 0.70);
        assert!(outcome.passed);
        assert_eq!(outcome.score, 100);
    }

    #[test]
    fn seo_gate_wants_one_h1_and_sane_title() {
        let good = seo_technical_report(
            "عنوان خبري متوسط الطول مناسب لمحركات البحث",
            "<h1>عنوان</h1><p>نص</p>",
            &[],
        );
        assert!(good.passed, "score was {}", good.score);

        let bad = seo_technical_report("قصير", "<p>بدون عناوين</p>", &[]);
        assert!(bad.score < good.score);
    }

    #[test]
    fn guardian_blocks_unreachable_pages() {
        let outcome = guardian_report("عنوان", "نص معتمد", "");
        assert!(!outcome.passed);
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn guardian_passes_matching_live_content() {
        let approved = "أعلنت الوزارة اليوم عن برنامج التكوين الجديد للشباب في الولايات الجنوبية";
        let live = format!("موقع الجريدة | عنوان البرنامج\n{approved}\nحقوق النشر محفوظة");
        let outcome = guardian_report("عنوان البرنامج", approved, &live);
        assert!(outcome.passed, "score was {}", outcome.score);
    }

    #[test]
    fn weak_claims_block() {
        // A number-only sentence with no statement verb or quote stays
        // below the 0.70 threshold when unsourced.
        let text = "الميزانية 300 مليار هذا العام";
        let outcome = fact_check_report(text, None, 0.70);
        assert!(!outcome.passed);
        assert!(!outcome.blocking_reasons.is_empty());
    }
}
