//! Smart editor tools: LLM-assisted rewrite, headline, SEO, and social
//! suggestions for the draft workspace. Every tool degrades to a
//! deterministic fallback when the model misbehaves — the workspace never
//! errors because a suggestion failed.

use std::sync::Arc;
use std::sync::OnceLock;

use ai_client::LlmClient;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::sanitize::{build_diff, html_to_text, sanitize_html};

/// One labeled headline proposal.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeadlineSuggestion {
    pub label: String,
    pub headline: String,
}

/// Required headline labels, in order.
const HEADLINE_LABELS: [&str; 5] = ["official", "breaking", "seo", "engaging", "mobile_short"];

#[derive(Debug, Clone, Serialize)]
pub struct RewriteSuggestion {
    pub title: String,
    pub body_html: String,
    pub note: String,
    pub added_lines: usize,
    pub removed_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeoSuggestion {
    pub seo_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
}

pub struct SmartEditor {
    llm: Arc<dyn LlmClient>,
}

impl SmartEditor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Rewrite the draft in the requested mode. Facts must survive; the
    /// output body is sanitized and diffed against the input.
    pub async fn rewrite_suggestion(
        &self,
        source_text: &str,
        draft_title: &str,
        draft_html: &str,
        mode: &str,
        instruction: &str,
    ) -> RewriteSuggestion {
        let prompt = format!(
            "You are an Arabic newsroom assistant. Return strict JSON with \
             keys: title, body_html, note.\n\
             Hard rules: keep facts exactly as provided; add no entities, \
             numbers, dates, or quotes; neutral journalistic tone; \
             body_html uses only h1,h2,p,ul,li,a,strong,em.\n\n\
             Mode: {mode}\nInstruction: {}\n\nSource context:\n{}\n\n\
             Current title:\n{draft_title}\n\nCurrent body:\n{}",
            if instruction.is_empty() { "none" } else { instruction },
            source_text.chars().take(7000).collect::<String>(),
            draft_html.chars().take(10_000).collect::<String>(),
        );

        let data = match self.llm.generate_json(&prompt).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Rewrite suggestion failed, returning draft unchanged");
                serde_json::json!({})
            }
        };

        let title = data["title"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(draft_title)
            .trim()
            .to_string();
        let body_raw = data["body_html"]
            .as_str()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(draft_html);
        let body_html = sanitize_html(body_raw);
        let note = data["note"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("rewrite_mode:{mode}"));

        let diff = build_diff(draft_html, &body_html);
        RewriteSuggestion {
            title,
            body_html,
            note,
            added_lines: diff.added,
            removed_lines: diff.removed,
        }
    }

    /// Exactly five labeled headlines. A bad model response falls back to
    /// deterministic variants of the current title.
    pub async fn headline_suggestions(
        &self,
        source_text: &str,
        draft_title: &str,
    ) -> Vec<HeadlineSuggestion> {
        let prompt = format!(
            "Generate exactly 5 Arabic newsroom headlines as a strict JSON \
             array of {{\"label\": ..., \"headline\": ...}}. Labels in \
             order: official, breaking, seo, engaging, mobile_short.\n\n\
             Context:\n{}\n\nCurrent title:\n{draft_title}",
            source_text.chars().take(5000).collect::<String>(),
        );

        if let Ok(data) = self.llm.generate_json(&prompt).await {
            if let Some(items) = data.as_array() {
                let parsed: Vec<HeadlineSuggestion> = items
                    .iter()
                    .take(5)
                    .map(|item| HeadlineSuggestion {
                        label: item["label"].as_str().unwrap_or("").trim().to_string(),
                        headline: item["headline"].as_str().unwrap_or("").trim().to_string(),
                    })
                    .collect();
                if parsed.len() == 5 && parsed.iter().all(|s| !s.headline.is_empty()) {
                    return parsed;
                }
            }
        }

        fallback_headlines(draft_title)
    }

    /// SEO metadata with hard caps (60-char title, 155-char description,
    /// five keywords/tags). Keywords fall back to body token extraction.
    pub async fn seo_suggestions(
        &self,
        source_text: &str,
        draft_title: &str,
        draft_html: &str,
    ) -> SeoSuggestion {
        let prompt = format!(
            "Return strict JSON with keys: seo_title, meta_description, \
             keywords, tags. Arabic newsroom style; seo_title <= 60 chars; \
             meta_description <= 155 chars; exactly 5 keywords and 5 tags.\n\n\
             Title:\n{draft_title}\n\nBody:\n{}\n\nContext:\n{}",
            draft_html.chars().take(9000).collect::<String>(),
            source_text.chars().take(4000).collect::<String>(),
        );

        let data = self.llm.generate_json(&prompt).await.unwrap_or_else(|e| {
            warn!(error = %e, "SEO suggestion failed, using extraction fallback");
            serde_json::json!({})
        });

        let seo_title: String = data["seo_title"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(draft_title)
            .trim()
            .chars()
            .take(60)
            .collect();
        let meta_description: String = data["meta_description"]
            .as_str()
            .unwrap_or("")
            .trim()
            .chars()
            .take(155)
            .collect();

        let mut keywords = string_list(&data["keywords"], 5);
        let mut tags = string_list(&data["tags"], 5);
        if keywords.is_empty() {
            keywords = extract_keywords(&html_to_text(draft_html), 5);
        }
        if tags.is_empty() {
            tags = keywords.clone();
        }

        SeoSuggestion {
            seo_title,
            meta_description,
            keywords,
            tags,
        }
    }
}

fn string_list(value: &serde_json::Value, cap: usize) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .take(cap)
                .collect()
        })
        .unwrap_or_default()
}

/// First distinct content-bearing tokens of the text.
pub fn extract_keywords(text: &str, cap: usize) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[\u{0600}-\u{06FF}A-Za-z]{4,}").unwrap());
    let mut seen = std::collections::HashSet::new();
    re.find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|w| seen.insert(w.clone()))
        .take(cap)
        .collect()
}

fn fallback_headlines(draft_title: &str) -> Vec<HeadlineSuggestion> {
    let base = if draft_title.trim().is_empty() {
        "عنوان مقترح"
    } else {
        draft_title.trim()
    };
    HEADLINE_LABELS
        .iter()
        .map(|label| {
            let headline = match *label {
                "breaking" => format!("عاجل | {base}"),
                "mobile_short" => base.chars().take(55).collect(),
                _ => base.to_string(),
            };
            HeadlineSuggestion {
                label: label.to_string(),
                headline,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_headlines_cover_all_labels() {
        let suggestions = fallback_headlines("عنوان الخبر الأصلي");
        assert_eq!(suggestions.len(), 5);
        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, HEADLINE_LABELS);
        assert!(suggestions[1].headline.starts_with("عاجل | "));
    }

    #[test]
    fn mobile_variant_is_truncated() {
        let long_title = "كلمة ".repeat(30);
        let suggestions = fallback_headlines(&long_title);
        let mobile = suggestions
            .iter()
            .find(|s| s.label == "mobile_short")
            .unwrap();
        assert!(mobile.headline.chars().count() <= 55);
    }

    #[test]
    fn keyword_extraction_dedupes_and_caps() {
        let text = "الوزارة الوزارة التعليم برنامج برنامج التكوين المهني الجديد";
        let keywords = extract_keywords(text, 3);
        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords[0], "الوزارة");
        assert_eq!(keywords[1], "التعليم");
    }
}
